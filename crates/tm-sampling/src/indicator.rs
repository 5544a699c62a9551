//! Activity indicator (an LED on the board).

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Fire-and-forget output driven by the sampling worker.
pub trait IndicatorSink: Send {
    /// Whether the output device can be driven.
    fn is_ready(&self) -> bool {
        true
    }

    fn set(&mut self, active: bool);
}

/// Timing of the per-sample indicator pulse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PulseConfig {
    /// How long the indicator stays active.
    pub hold: Duration,
    /// Pause after the pulse before waiting for the next tick.
    pub settle: Duration,
}

impl Default for PulseConfig {
    fn default() -> Self {
        Self {
            hold: Duration::from_millis(100),
            settle: Duration::from_millis(10),
        }
    }
}

impl PulseConfig {
    /// Total time a pulse keeps the worker busy.
    pub fn total(&self) -> Duration {
        self.hold + self.settle
    }
}

/// Indicator that only traces level changes.
#[derive(Debug, Clone)]
pub struct LogIndicator {
    name: String,
    active: bool,
}

impl LogIndicator {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            active: false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}

impl IndicatorSink for LogIndicator {
    fn set(&mut self, active: bool) {
        if self.active != active {
            debug!(indicator = %self.name, active, "indicator changed");
        }
        self.active = active;
    }
}

/// Indicator that records every level it is driven to.
///
/// Clones share the same history, so a test can keep one clone while the
/// worker owns another.
#[derive(Debug, Clone)]
pub struct RecordingIndicator {
    levels: Arc<Mutex<Vec<bool>>>,
    ready: bool,
}

impl Default for RecordingIndicator {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingIndicator {
    pub fn new() -> Self {
        Self {
            levels: Arc::default(),
            ready: true,
        }
    }

    /// An indicator whose device reports not-ready.
    pub fn unavailable() -> Self {
        Self {
            levels: Arc::default(),
            ready: false,
        }
    }

    pub fn history(&self) -> Vec<bool> {
        self.lock().clone()
    }

    /// Number of completed on/off pulses.
    pub fn pulses(&self) -> usize {
        self.lock()
            .windows(2)
            .filter(|w| w[0] && !w[1])
            .count()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<bool>> {
        self.levels.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl IndicatorSink for RecordingIndicator {
    fn is_ready(&self) -> bool {
        self.ready
    }

    fn set(&mut self, active: bool) {
        self.lock().push(active);
    }
}
