pub mod config;
pub mod init;
pub mod instructions;
pub mod labels;
pub mod next;
pub mod order;
pub mod sync;
pub mod tasks;

use anyhow::Context;
use clap::Args;
use roadmap_core::config::Config;
use roadmap_core::planning::{self, TaskFilter};
use roadmap_core::task::TaskSet;
use std::path::Path;

/// Task selection shared by every command that works on the planned tasks.
#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Only these task keys (e.g. T24 T25)
    #[arg(value_name = "KEY")]
    pub keys: Vec<String>,

    /// Only tasks whose milestone starts with this prefix (e.g. M0)
    #[arg(long)]
    pub milestone: Option<String>,

    /// Only tasks rated HIGH for AI effectiveness
    #[arg(long)]
    pub ai_high_only: bool,
}

impl FilterArgs {
    pub fn to_filter(&self) -> TaskFilter {
        TaskFilter {
            keys: self.keys.clone(),
            milestone: self.milestone.clone(),
            ai_high_only: self.ai_high_only,
        }
    }
}

/// Load the config (defaults when uninitialized) and the filtered task set.
pub fn load_tasks(root: &Path, filter: &FilterArgs) -> anyhow::Result<(Config, TaskSet)> {
    let config = Config::load_or_default(root).context("failed to load config")?;
    let tasks = planning::load_tasks(root, &config).context("failed to load planning data")?;
    Ok((config, filter.to_filter().apply(tasks)))
}
