use std::time::Duration;

use thiserror::Error;

/// Errors raised while preparing or running a fit script.
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("Script execution timed out after {} seconds", .limit.as_secs())]
    ExecutionTimeout { limit: Duration },

    #[error("failed to launch `{program}`: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("parameter artifact error: {0}")]
    Artifact(String),

    #[error("{0}")]
    Internal(String),
}

impl From<serde_json::Error> for ExecutorError {
    fn from(err: serde_json::Error) -> Self {
        ExecutorError::Artifact(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ExecutorError>;
