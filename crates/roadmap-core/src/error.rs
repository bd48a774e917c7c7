use thiserror::Error;

#[derive(Debug, Error)]
pub enum RoadmapError {
    #[error("not initialized: run 'roadmap init'")]
    NotInitialized,

    #[error("task not found: {0}")]
    TaskNotFound(String),

    #[error("missing config value: {0}")]
    MissingConfig(String),

    #[error("planning file not found: {0}")]
    PlanningNotFound(String),

    #[error("gh CLI not found on PATH: install it from https://cli.github.com")]
    GhNotFound,

    #[error("gh {command} failed: {stderr}")]
    GhFailed { command: String, stderr: String },

    #[error("GraphQL error: {0}")]
    GraphQl(String),

    #[error("unexpected response from GitHub: {0}")]
    UnexpectedResponse(String),

    #[error("agent '{0}' cannot be assigned in this repository")]
    AgentUnavailable(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RoadmapError>;
