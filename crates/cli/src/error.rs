use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("invalid argument '{0}': expected name=value")]
    Assignment(String),

    #[error("screenshot failed: {path}")]
    Screenshot {
        path: PathBuf,
        #[source]
        source: shellpilot::Error,
    },

    /// A post-write verification re-read came back with a different value.
    #[error("verification failed: {name} is {actual}, expected {expected}")]
    Verify {
        name: String,
        expected: String,
        actual: String,
    },

    #[error(transparent)]
    Shell(#[from] shellpilot::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}
