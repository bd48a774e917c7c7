pub mod config;
pub mod error;
pub mod github;
pub mod io;
pub mod labels;
pub mod paths;
pub mod planning;
pub mod render;
pub mod schedule;
pub mod select;
pub mod sync;
pub mod task;
pub mod types;

pub use error::{Result, RoadmapError};
