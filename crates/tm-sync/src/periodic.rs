//! Periodic and one-shot timing sources.
//!
//! A [`PeriodicSource`] runs its schedule on a dedicated thread that stands in
//! for an interrupt context. On each expiry it does exactly one thing: post to
//! the [`Poster`] it was started with. It never blocks on, reads, or writes
//! anything the consumer owns.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::clock::ExpiryClock;
use crate::error::{SyncError, SyncResult};
use crate::signal::{PostOutcome, Poster};
use crate::task::{HOST_MIN_STACK_SIZE, StopToken};

/// Timing source configuration. Immutable while the source runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodicConfig {
    /// Re-arm period. Unused by one-shot sources.
    pub period: Duration,
    /// Delay from `start()` to the first expiry.
    pub start_delay: Duration,
    /// Fire once and stop.
    pub one_shot: bool,
}

impl PeriodicConfig {
    /// Periodic source whose first expiry is one period after start.
    pub fn periodic(period: Duration) -> Self {
        Self {
            period,
            start_delay: period,
            one_shot: false,
        }
    }

    /// One-shot source expiring `delay` after start.
    pub fn one_shot(delay: Duration) -> Self {
        Self {
            period: Duration::ZERO,
            start_delay: delay,
            one_shot: true,
        }
    }

    pub fn with_start_delay(mut self, start_delay: Duration) -> Self {
        self.start_delay = start_delay;
        self
    }

    /// # Errors
    ///
    /// `ConfigInvalid` if a re-arming source has a zero period.
    pub fn validate(&self) -> SyncResult<()> {
        if !self.one_shot && self.period.is_zero() {
            return Err(SyncError::ConfigInvalid {
                what: "periodic source period must be positive",
            });
        }
        Ok(())
    }
}

#[derive(Debug)]
struct Running {
    stop: StopToken,
    active: Arc<AtomicBool>,
    thread: JoinHandle<()>,
}

/// A named timing source that posts to a signal on a schedule.
#[derive(Debug)]
pub struct PeriodicSource {
    name: String,
    config: PeriodicConfig,
    expiries: Arc<AtomicU64>,
    running: Option<Running>,
}

impl PeriodicSource {
    /// Create a stopped source.
    pub fn new(name: impl Into<String>, config: PeriodicConfig) -> SyncResult<Self> {
        config.validate()?;
        Ok(Self {
            name: name.into(),
            config,
            expiries: Arc::new(AtomicU64::new(0)),
            running: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> PeriodicConfig {
        self.config
    }

    /// Replace the configuration of a stopped source.
    pub fn configure(&mut self, config: PeriodicConfig) -> SyncResult<()> {
        if self.is_running() {
            return Err(SyncError::AlreadyRunning {
                name: self.name.clone(),
            });
        }
        config.validate()?;
        self.config = config;
        Ok(())
    }

    /// `true` between `start()` and `stop()`, or until a one-shot has fired.
    pub fn is_running(&self) -> bool {
        self.running
            .as_ref()
            .is_some_and(|r| r.active.load(Ordering::Acquire))
    }

    /// Number of expiries since the last `start()`.
    pub fn expiry_count(&self) -> u64 {
        self.expiries.load(Ordering::Relaxed)
    }

    /// Arm the source. Each expiry posts once to `target`.
    ///
    /// # Errors
    ///
    /// `AlreadyRunning` if the source is armed, `Spawn` if the timer thread
    /// cannot be created.
    pub fn start(&mut self, target: Poster) -> SyncResult<()> {
        if self.is_running() {
            return Err(SyncError::AlreadyRunning {
                name: self.name.clone(),
            });
        }
        // A one-shot that already fired leaves a finished thread behind.
        if let Some(finished) = self.running.take() {
            self.reap(finished);
        }

        self.expiries.store(0, Ordering::Relaxed);
        let stop = StopToken::new();
        let active = Arc::new(AtomicBool::new(true));

        let timer = TimerLoop {
            name: self.name.clone(),
            config: self.config,
            target,
            stop: stop.clone(),
            expiries: Arc::clone(&self.expiries),
            active: Arc::clone(&active),
        };
        let thread = thread::Builder::new()
            .name(format!("timer-{}", self.name))
            .stack_size(HOST_MIN_STACK_SIZE)
            .spawn(move || timer.run())
            .map_err(|source| SyncError::Spawn {
                name: self.name.clone(),
                source,
            })?;

        debug!(
            timer = %self.name,
            period_ms = self.config.period.as_millis() as u64,
            start_delay_ms = self.config.start_delay.as_millis() as u64,
            one_shot = self.config.one_shot,
            "timer started"
        );
        self.running = Some(Running {
            stop,
            active,
            thread,
        });
        Ok(())
    }

    /// Disarm the source and wait for its thread. No-op when stopped.
    pub fn stop(&mut self) {
        if let Some(running) = self.running.take() {
            running.stop.request_stop();
            self.reap(running);
            debug!(timer = %self.name, expiries = self.expiry_count(), "timer stopped");
        }
    }

    fn reap(&self, running: Running) {
        if running.thread.join().is_err() {
            warn!(timer = %self.name, "timer thread panicked");
        }
    }
}

impl Drop for PeriodicSource {
    fn drop(&mut self) {
        self.stop();
    }
}

struct TimerLoop {
    name: String,
    config: PeriodicConfig,
    target: Poster,
    stop: StopToken,
    expiries: Arc<AtomicU64>,
    active: Arc<AtomicBool>,
}

impl TimerLoop {
    fn run(self) {
        let epoch = Instant::now();
        let mut clock = ExpiryClock::new(self.config.start_delay, self.config.period);

        loop {
            let wait = clock.time_until_expiry(epoch.elapsed());
            if !wait.is_zero() {
                if self.stop.sleep(wait) {
                    break;
                }
                continue;
            }
            if self.stop.is_stop_requested() {
                break;
            }

            // The only side effect of an expiry.
            let outcome = self.target.post();
            let n = self.expiries.fetch_add(1, Ordering::Relaxed) + 1;
            debug!(
                timer = %self.name,
                expiry = n,
                dropped = outcome == PostOutcome::Saturated,
                "timer expired"
            );

            if self.config.one_shot {
                break;
            }
            let skipped = clock.advance_past(epoch.elapsed());
            if skipped > 0 {
                debug!(timer = %self.name, skipped, "timer overran, expiries skipped");
            }
        }

        self.active.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::{Signal, Timeout, WaitOutcome};

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn zero_period_rejected_for_periodic() {
        let config = PeriodicConfig::periodic(Duration::ZERO);
        assert!(matches!(
            PeriodicSource::new("bad", config),
            Err(SyncError::ConfigInvalid { .. })
        ));
        assert!(PeriodicConfig::one_shot(Duration::ZERO).validate().is_ok());
    }

    #[test]
    fn periodic_source_fires_repeatedly() {
        let signal = Arc::new(Signal::new(0, 100).unwrap());
        let mut source = PeriodicSource::new("fast", PeriodicConfig::periodic(ms(5))).unwrap();

        source.start(signal.poster()).unwrap();
        assert!(source.is_running());
        thread::sleep(ms(80));
        source.stop();

        assert!(!source.is_running());
        let fired = source.expiry_count();
        assert!(fired >= 3, "expected several expiries, got {fired}");
        assert_eq!(u64::from(signal.count()), fired);
    }

    #[test]
    fn one_shot_fires_once_and_stops() {
        let signal = Arc::new(Signal::new(0, 10).unwrap());
        let mut source = PeriodicSource::new("once", PeriodicConfig::one_shot(ms(10))).unwrap();

        source.start(signal.poster()).unwrap();
        assert_eq!(signal.wait(Timeout::from_millis(2000)), WaitOutcome::Acquired);
        thread::sleep(ms(40));

        assert_eq!(source.expiry_count(), 1);
        assert!(!source.is_running());
        assert_eq!(signal.count(), 0);
    }

    #[test]
    fn starting_twice_is_an_error() {
        let signal = Arc::new(Signal::binary());
        let mut source = PeriodicSource::new("twice", PeriodicConfig::periodic(ms(50))).unwrap();

        source.start(signal.poster()).unwrap();
        let err = source.start(signal.poster()).unwrap_err();
        assert!(matches!(err, SyncError::AlreadyRunning { .. }));
        source.stop();

        // Stopped sources can be started again.
        source.start(signal.poster()).unwrap();
        source.stop();
    }

    #[test]
    fn configure_rejected_while_running() {
        let signal = Arc::new(Signal::binary());
        let mut source = PeriodicSource::new("cfg", PeriodicConfig::periodic(ms(50))).unwrap();
        source.start(signal.poster()).unwrap();

        assert!(source.configure(PeriodicConfig::periodic(ms(10))).is_err());
        source.stop();
        source.configure(PeriodicConfig::periodic(ms(10))).unwrap();
        assert_eq!(source.config().period, ms(10));
    }

    #[test]
    fn stop_before_first_expiry_posts_nothing() {
        let signal = Arc::new(Signal::binary());
        let config = PeriodicConfig::periodic(ms(10)).with_start_delay(Duration::from_secs(30));
        let mut source = PeriodicSource::new("late", config).unwrap();

        source.start(signal.poster()).unwrap();
        thread::sleep(ms(20));
        source.stop();
        source.stop();

        assert_eq!(source.expiry_count(), 0);
        assert_eq!(signal.count(), 0);
    }
}
