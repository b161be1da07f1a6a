use thiserror::Error;

use craftkeep_backend::ReleaseError;
use craftkeep_platform::AppPathsError;
use craftkeep_settings::SettingsError;

use crate::lock::LockError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Release(#[from] ReleaseError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Lock(#[from] LockError),
    #[error(transparent)]
    Paths(#[from] AppPathsError),
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid answers file: {0}")]
    Answers(#[source] serde_json::Error),
    #[error("{operation} timed out after {seconds}s")]
    Timeout {
        operation: &'static str,
        seconds: u64,
    },
}

impl AppError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}
