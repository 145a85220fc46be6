use thiserror::Error;

#[derive(Debug, Error)]
pub enum LaneError {
    #[error("not initialized: run 'lane init'")]
    NotInitialized,

    #[error("log not found: {0}")]
    LogNotFound(String),

    #[error("torn record at end of {0}: last line has no terminating newline")]
    TornRecord(String),

    #[error("could not lock {path}: {reason}")]
    LockFailed { path: String, reason: String },

    #[error("invalid registry: {0}")]
    InvalidRegistry(String),

    #[error("injected fault: {0}")]
    Injected(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, LaneError>;
