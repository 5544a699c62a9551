//! Error types for the sampling subsystem.

use thiserror::Error;
use tm_core::CoreError;
use tm_sync::SyncError;

use crate::channel::ChannelFault;

/// Result type for sampling operations.
pub type SamplingResult<T> = Result<T, SamplingError>;

/// Errors raised while initializing or running the sampling subsystem.
///
/// `HardwareUnavailable` and `ConfigInvalid` are fatal and only ever produced
/// at initialization. `HardwareReadFailure` and `RawOutOfRange` are contained
/// within one worker cycle.
#[derive(Debug, Error)]
pub enum SamplingError {
    /// A device was not ready at initialization.
    #[error("Device not ready: {device}")]
    HardwareUnavailable { device: String },

    /// Malformed channel, conversion, timer, or task configuration.
    #[error("Invalid configuration: {what}")]
    ConfigInvalid { what: String },

    /// A single read attempt failed.
    #[error("Hardware read failed: {0}")]
    HardwareReadFailure(#[from] ChannelFault),

    /// The channel returned a value beyond its own resolution.
    #[error("Raw value {raw} outside channel range 0..={full_scale}")]
    RawOutOfRange { raw: u32, full_scale: u32 },

    /// A cycle was attempted before a successful initialization.
    #[error("Sampling worker is not initialized")]
    NotInitialized,

    /// Timer or task failure at run time.
    #[error(transparent)]
    Sync(SyncError),
}

impl SamplingError {
    /// `true` for errors that stop the subsystem from starting.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Self::HardwareReadFailure(_) | Self::RawOutOfRange { .. }
        )
    }
}

/// Configuration faults from the hand-off layer join the one
/// `ConfigInvalid` class; everything else stays wrapped.
impl From<SyncError> for SamplingError {
    fn from(e: SyncError) -> Self {
        match e {
            SyncError::ConfigInvalid { what } => SamplingError::ConfigInvalid {
                what: what.to_string(),
            },
            other => SamplingError::Sync(other),
        }
    }
}

impl From<CoreError> for SamplingError {
    fn from(e: CoreError) -> Self {
        SamplingError::ConfigInvalid {
            what: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_config_fault_is_config_invalid() {
        let err = SamplingError::from(SyncError::ConfigInvalid {
            what: "task name must not be empty",
        });
        assert!(matches!(
            err,
            SamplingError::ConfigInvalid { ref what } if what == "task name must not be empty"
        ));
        assert!(err.is_fatal());
    }

    #[test]
    fn other_sync_faults_stay_wrapped() {
        let err = SamplingError::from(SyncError::TaskPanicked {
            name: "sampling-worker".to_string(),
        });
        assert!(matches!(err, SamplingError::Sync(SyncError::TaskPanicked { .. })));
    }
}
