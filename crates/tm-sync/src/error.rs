//! Error types for synchronization primitives.

use thiserror::Error;

/// Result type for synchronization operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur while building or running hand-off primitives.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Malformed signal, timer, or task configuration.
    #[error("Invalid configuration: {what}")]
    ConfigInvalid { what: &'static str },

    /// A timing source was started while already running.
    #[error("Timer '{name}' is already running")]
    AlreadyRunning { name: String },

    /// The host refused to create a thread.
    #[error("Failed to spawn task '{name}'")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },

    /// A task body panicked before it could be joined.
    #[error("Task '{name}' panicked")]
    TaskPanicked { name: String },
}
