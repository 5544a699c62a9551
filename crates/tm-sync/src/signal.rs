//! Bounded counting semaphore used as a wake/hand-off primitive.
//!
//! A [`Signal`] carries no data. Producers [`post`](Signal::post) to say "there
//! is work", consumers [`wait`](Signal::wait) for it. The counter saturates at
//! `max_count`: with `max_count = 1` a post that arrives while a previous one
//! is still unconsumed is discarded, so an overloaded consumer always sees the
//! most recent tick instead of a backlog.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::error::{SyncError, SyncResult};

/// How long a [`Signal::wait`] may block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeout {
    /// Block until a post arrives.
    Forever,
    /// Block for at most the given duration. `Duration::ZERO` polls.
    After(Duration),
}

impl Timeout {
    /// Poll without blocking.
    pub const NO_WAIT: Timeout = Timeout::After(Duration::ZERO);

    /// Bounded timeout in milliseconds.
    pub fn from_millis(ms: u64) -> Self {
        Self::After(Duration::from_millis(ms))
    }
}

impl From<Duration> for Timeout {
    fn from(value: Duration) -> Self {
        Self::After(value)
    }
}

/// Result of a [`Signal::post`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostOutcome {
    /// The counter was incremented.
    Accepted,
    /// The counter was already at `max_count`; the post was dropped.
    Saturated,
}

/// Result of a [`Signal::wait`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// One unit was taken from the counter.
    Acquired,
    /// The timeout elapsed with the counter at zero. Not an error.
    TimedOut,
}

impl WaitOutcome {
    pub fn is_acquired(self) -> bool {
        matches!(self, Self::Acquired)
    }
}

/// Lifetime counters of a signal.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SignalStats {
    pub accepted: u64,
    pub saturated: u64,
    pub acquired: u64,
    pub timed_out: u64,
}

/// Bounded counting semaphore.
///
/// Invariant: `0 <= count <= max_count`. The counter is the only state shared
/// between producer and consumer contexts; it is guarded by a mutex that is
/// held only for the increment/decrement, so [`post`](Self::post) never blocks
/// for longer than a competing post or wait takes to update it.
#[derive(Debug)]
pub struct Signal {
    count: Mutex<u32>,
    available: Condvar,
    max_count: u32,
    accepted: AtomicU64,
    saturated: AtomicU64,
    acquired: AtomicU64,
    timed_out: AtomicU64,
}

impl Signal {
    /// Create a signal with an initial count.
    ///
    /// # Errors
    ///
    /// Returns `ConfigInvalid` if `max_count` is zero or `initial > max_count`.
    pub fn new(initial: u32, max_count: u32) -> SyncResult<Self> {
        if max_count == 0 {
            return Err(SyncError::ConfigInvalid {
                what: "signal max_count must be at least 1",
            });
        }
        if initial > max_count {
            return Err(SyncError::ConfigInvalid {
                what: "signal initial count exceeds max_count",
            });
        }
        Ok(Self::with_counts(initial, max_count))
    }

    /// Binary signal: starts empty, holds at most one pending post.
    pub fn binary() -> Self {
        Self::with_counts(0, 1)
    }

    fn with_counts(initial: u32, max_count: u32) -> Self {
        Self {
            count: Mutex::new(initial),
            available: Condvar::new(),
            max_count,
            accepted: AtomicU64::new(0),
            saturated: AtomicU64::new(0),
            acquired: AtomicU64::new(0),
            timed_out: AtomicU64::new(0),
        }
    }

    pub fn max_count(&self) -> u32 {
        self.max_count
    }

    /// Current count. Racy by nature; useful for diagnostics and tests.
    pub fn count(&self) -> u32 {
        *self.lock()
    }

    /// Increment the count unless it is already at `max_count`.
    ///
    /// Never blocks on the consumer. Wakes at most one waiter.
    pub fn post(&self) -> PostOutcome {
        let mut count = self.lock();
        if *count < self.max_count {
            *count += 1;
            drop(count);
            self.available.notify_one();
            self.accepted.fetch_add(1, Ordering::Relaxed);
            PostOutcome::Accepted
        } else {
            drop(count);
            self.saturated.fetch_add(1, Ordering::Relaxed);
            PostOutcome::Saturated
        }
    }

    /// Block until the count is positive or the timeout elapses.
    ///
    /// On success one unit is taken. On timeout the count is untouched.
    pub fn wait(&self, timeout: Timeout) -> WaitOutcome {
        // A bounded timeout too large to represent behaves like `Forever`.
        let deadline = match timeout {
            Timeout::Forever => None,
            Timeout::After(limit) => Instant::now().checked_add(limit),
        };

        let mut count = self.lock();
        while *count == 0 {
            match deadline {
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        drop(count);
                        self.timed_out.fetch_add(1, Ordering::Relaxed);
                        return WaitOutcome::TimedOut;
                    }
                    let (guard, _) = self
                        .available
                        .wait_timeout(count, remaining)
                        .unwrap_or_else(PoisonError::into_inner);
                    count = guard;
                }
                None => {
                    count = self
                        .available
                        .wait(count)
                        .unwrap_or_else(PoisonError::into_inner);
                }
            }
        }
        *count -= 1;
        drop(count);
        self.acquired.fetch_add(1, Ordering::Relaxed);
        WaitOutcome::Acquired
    }

    /// Take one unit if available, without blocking.
    pub fn try_take(&self) -> bool {
        self.wait(Timeout::NO_WAIT).is_acquired()
    }

    pub fn stats(&self) -> SignalStats {
        SignalStats {
            accepted: self.accepted.load(Ordering::Relaxed),
            saturated: self.saturated.load(Ordering::Relaxed),
            acquired: self.acquired.load(Ordering::Relaxed),
            timed_out: self.timed_out.load(Ordering::Relaxed),
        }
    }

    /// Post-only handle to this signal.
    pub fn poster(self: &Arc<Self>) -> Poster {
        Poster {
            signal: Arc::clone(self),
        }
    }

    // The guarded value is a plain counter that is never left half-updated,
    // so a poisoned lock still holds a valid count.
    fn lock(&self) -> MutexGuard<'_, u32> {
        self.count.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// The post-only half of a [`Signal`].
///
/// Handed to timing sources and producers so they cannot wait on, inspect, or
/// otherwise touch the state the consumer owns.
#[derive(Debug, Clone)]
pub struct Poster {
    signal: Arc<Signal>,
}

impl Poster {
    pub fn post(&self) -> PostOutcome {
        self.signal.post()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn rejects_invalid_counts() {
        assert!(matches!(
            Signal::new(0, 0),
            Err(SyncError::ConfigInvalid { .. })
        ));
        assert!(matches!(
            Signal::new(2, 1),
            Err(SyncError::ConfigInvalid { .. })
        ));
        assert_eq!(Signal::new(1, 3).unwrap().count(), 1);
    }

    #[test]
    fn second_post_saturates() {
        let signal = Signal::binary();
        assert_eq!(signal.post(), PostOutcome::Accepted);
        assert_eq!(signal.post(), PostOutcome::Saturated);
        assert_eq!(signal.count(), 1);

        let stats = signal.stats();
        assert_eq!(stats.accepted, 1);
        assert_eq!(stats.saturated, 1);
    }

    #[test]
    fn one_post_satisfies_exactly_one_wait() {
        let signal = Signal::binary();
        signal.post();
        signal.post();

        assert_eq!(signal.wait(Timeout::Forever), WaitOutcome::Acquired);
        assert_eq!(signal.count(), 0);
        assert_eq!(
            signal.wait(Timeout::from_millis(5)),
            WaitOutcome::TimedOut
        );
        assert_eq!(signal.count(), 0);
    }

    #[test]
    fn zero_timeout_polls() {
        let signal = Signal::binary();
        let start = Instant::now();
        assert_eq!(signal.wait(Timeout::NO_WAIT), WaitOutcome::TimedOut);
        assert!(start.elapsed() < Duration::from_millis(50));

        signal.post();
        assert!(signal.try_take());
        assert!(!signal.try_take());
    }

    #[test]
    fn bounded_wait_returns_near_timeout() {
        let signal = Signal::binary();
        let timeout = Duration::from_millis(30);
        let start = Instant::now();
        assert_eq!(signal.wait(timeout.into()), WaitOutcome::TimedOut);
        let elapsed = start.elapsed();
        assert!(elapsed >= timeout);
        assert!(elapsed < timeout + Duration::from_millis(500));
        assert_eq!(signal.stats().timed_out, 1);
    }

    #[test]
    fn forever_wait_released_by_post_from_other_thread() {
        let signal = Arc::new(Signal::binary());
        let poster = signal.poster();

        let waiter = {
            let signal = Arc::clone(&signal);
            thread::spawn(move || signal.wait(Timeout::Forever))
        };

        thread::sleep(Duration::from_millis(20));
        assert_eq!(poster.post(), PostOutcome::Accepted);
        assert_eq!(waiter.join().unwrap(), WaitOutcome::Acquired);
        assert_eq!(signal.count(), 0);
    }

    #[test]
    fn counting_signal_accumulates_up_to_max() {
        let signal = Signal::new(0, 3).unwrap();
        for _ in 0..5 {
            signal.post();
        }
        assert_eq!(signal.count(), 3);
        assert_eq!(signal.stats().saturated, 2);

        let taken = (0..5).filter(|_| signal.try_take()).count();
        assert_eq!(taken, 3);
    }
}
