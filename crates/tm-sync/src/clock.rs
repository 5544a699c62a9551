//! Expiry schedule for timing sources.
//!
//! Times are offsets from the moment the source was started, so the schedule
//! does not drift with however long each expiry takes to handle.

use std::time::Duration;

/// Tracks when a timing source should next expire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryClock {
    /// Re-arm period. Ignored after the first expiry of a one-shot source.
    pub period: Duration,
    /// Offset of the next scheduled expiry.
    pub next_expiry: Duration,
}

impl ExpiryClock {
    /// Create a clock whose first expiry is `start_delay` after start.
    pub fn new(start_delay: Duration, period: Duration) -> Self {
        Self {
            period,
            next_expiry: start_delay,
        }
    }

    /// Returns `true` if `elapsed >= next_expiry`.
    pub fn should_fire(&self, elapsed: Duration) -> bool {
        elapsed >= self.next_expiry
    }

    /// Advance to the next expiry.
    pub fn advance(&mut self) {
        self.next_expiry += self.period;
    }

    /// Advance until the next expiry lies after `elapsed`.
    ///
    /// Returns how many expiries were skipped beyond the normal one-period
    /// step. A zero period advances once and reports nothing skipped.
    pub fn advance_past(&mut self, elapsed: Duration) -> u64 {
        self.advance();
        if self.period.is_zero() || elapsed < self.next_expiry {
            return 0;
        }
        let behind = (elapsed - self.next_expiry).as_nanos() / self.period.as_nanos() + 1;
        let skipped = u64::try_from(behind).unwrap_or(u64::MAX);
        self.next_expiry += self
            .period
            .saturating_mul(u32::try_from(behind).unwrap_or(u32::MAX));
        skipped
    }

    /// Time remaining until the next expiry, zero if already due.
    pub fn time_until_expiry(&self, elapsed: Duration) -> Duration {
        self.next_expiry.saturating_sub(elapsed)
    }
}
