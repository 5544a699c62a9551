//! Error types for the tm-app service layer.

use std::path::PathBuf;

use tm_sampling::SamplingError;
use tm_sync::SyncError;

/// Application error type shared by every frontend.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Failed to read config file: {path}")]
    ConfigFileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write config file: {path}")]
    ConfigFileWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Config format error: {0}")]
    ConfigFormat(String),

    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Sampling(#[from] SamplingError),
}

/// Result type for tm-app operations.
pub type AppResult<T> = Result<T, AppError>;

impl From<SyncError> for AppError {
    fn from(err: SyncError) -> Self {
        AppError::Sampling(SamplingError::from(err))
    }
}

