//! Sampling subsystem context object.
//!
//! [`SamplingSubsystem`] assembles the pieces that the board program kept as
//! top-level statics: one binary [`Signal`], one [`PeriodicSource`] holding
//! only a [`Poster`](tm_sync::Poster) to it, and one worker task owning the
//! channel and indicator. Their lifetime is bounded by
//! [`SamplingSubsystem::start`] and [`RunningSubsystem::stop`].

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tm_sync::{
    PeriodicConfig, PeriodicSource, Priority, Signal, SignalStats, TaskHandle, TaskSpawner,
    TaskSpec,
};
use tracing::{error, info, warn};

use crate::channel::HardwareChannel;
use crate::convert::ConversionConfig;
use crate::error::{SamplingError, SamplingResult};
use crate::indicator::{IndicatorSink, PulseConfig};
use crate::worker::{SamplingWorker, WorkerStats};

/// Everything needed to assemble a sampling subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubsystemConfig {
    pub timer: PeriodicConfig,
    pub conversion: ConversionConfig,
    pub pulse: PulseConfig,
    pub worker: TaskSpec,
}

impl Default for SubsystemConfig {
    fn default() -> Self {
        Self {
            timer: PeriodicConfig::periodic(Duration::from_millis(1000)),
            conversion: ConversionConfig::default(),
            pulse: PulseConfig::default(),
            worker: TaskSpec::new("sampling-worker", 1500, Priority::new(5)),
        }
    }
}

impl SubsystemConfig {
    /// # Errors
    ///
    /// `ConfigInvalid` for a malformed timer, conversion or task spec, or for
    /// a one-shot timer (the worker expects a recurring tick).
    pub fn validate(&self) -> SamplingResult<()> {
        self.timer.validate()?;
        if self.timer.one_shot {
            return Err(SamplingError::ConfigInvalid {
                what: "sampling timer must be periodic".to_string(),
            });
        }
        self.conversion.validate()?;
        self.worker.validate()?;
        Ok(())
    }
}

/// Summary of a finished sampling run.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct MonitorReport {
    /// Successful cycles.
    pub samples: u64,
    /// Cycles skipped because the read or conversion failed.
    pub read_failures: u64,
    /// Timer expiries.
    pub ticks_posted: u64,
    /// Expiries that found the signal already pending and were dropped.
    pub ticks_dropped: u64,
    /// Sequence number of the last successful sample.
    pub last_sequence: u64,
    pub mean_cycle_s: f64,
    pub max_cycle_s: f64,
}

/// Assembles and starts the sampling pipeline.
#[derive(Debug, Clone)]
pub struct SamplingSubsystem {
    config: SubsystemConfig,
}

impl SamplingSubsystem {
    pub fn new(config: SubsystemConfig) -> SamplingResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SubsystemConfig {
        &self.config
    }

    /// Initialize the devices, then start the worker task and the timer.
    ///
    /// Initialization runs on the caller's thread so that a fatal failure is
    /// returned here and no task or timer is ever created.
    ///
    /// # Errors
    ///
    /// - `HardwareUnavailable` / `ConfigInvalid` from worker initialization
    /// - `Sync` if the worker task or timer thread cannot be started
    pub fn start<C, I>(
        &self,
        channel: C,
        indicator: I,
        spawner: &TaskSpawner,
    ) -> SamplingResult<RunningSubsystem<C, I>>
    where
        C: HardwareChannel + 'static,
        I: IndicatorSink + 'static,
    {
        let mut worker =
            SamplingWorker::new(channel, indicator, self.config.conversion, self.config.pulse);
        if let Err(e) = worker.initialize() {
            error!(error = %e, "sampling subsystem failed to initialize");
            return Err(e);
        }
        let stats = worker.stats();

        let mut source = PeriodicSource::new("sampling", self.config.timer)?;
        let signal = Arc::new(Signal::binary());
        let task = {
            let signal = Arc::clone(&signal);
            spawner.spawn(self.config.worker.clone(), move |ctx| {
                let result = worker.run(&signal, ctx.stop_token());
                if let Err(e) = &result {
                    error!(error = %e, "sampling worker exited with error");
                }
                (worker, result)
            })?
        };

        if let Err(e) = source.start(signal.poster()) {
            task.request_stop();
            signal.post();
            if task.join().is_err() {
                warn!("sampling worker panicked during teardown");
            }
            return Err(e.into());
        }

        info!(
            period_ms = self.config.timer.period.as_millis() as u64,
            worker = %self.config.worker.name,
            "sampling subsystem started"
        );
        Ok(RunningSubsystem {
            signal,
            source,
            task: Some(task),
            stats,
        })
    }
}

type WorkerTask<C, I> = TaskHandle<(SamplingWorker<C, I>, SamplingResult<u64>)>;

/// A started sampling subsystem.
pub struct RunningSubsystem<C, I> {
    signal: Arc<Signal>,
    source: PeriodicSource,
    task: Option<WorkerTask<C, I>>,
    stats: Arc<WorkerStats>,
}

impl<C, I> RunningSubsystem<C, I> {
    /// Live worker counters.
    pub fn stats(&self) -> &WorkerStats {
        &self.stats
    }

    pub fn signal_stats(&self) -> SignalStats {
        self.signal.stats()
    }

    /// Timer expiries so far.
    pub fn ticks(&self) -> u64 {
        self.source.expiry_count()
    }

    /// Stop the timer, release and join the worker.
    ///
    /// Returns the run summary and the worker, which still owns the channel
    /// and indicator.
    pub fn stop(mut self) -> SamplingResult<(MonitorReport, SamplingWorker<C, I>)> {
        self.source.stop();
        // Snapshot before the release post below is counted.
        let signal_stats = self.signal.stats();

        let Some(task) = self.task.take() else {
            return Err(SamplingError::NotInitialized);
        };
        task.request_stop();
        self.signal.post();
        let (worker, result) = task.join()?;
        let last_sequence = result?;

        let cycle = self.stats.cycle_time();
        let report = MonitorReport {
            samples: self.stats.samples(),
            read_failures: self.stats.failures(),
            ticks_posted: self.source.expiry_count(),
            ticks_dropped: signal_stats.saturated,
            last_sequence,
            mean_cycle_s: cycle.average_seconds(),
            max_cycle_s: cycle.max_seconds(),
        };
        info!(
            samples = report.samples,
            read_failures = report.read_failures,
            ticks_posted = report.ticks_posted,
            ticks_dropped = report.ticks_dropped,
            "sampling subsystem stopped"
        );
        Ok((report, worker))
    }
}

impl<C, I> Drop for RunningSubsystem<C, I> {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            self.source.stop();
            task.request_stop();
            self.signal.post();
            if task.join().is_err() {
                warn!("sampling worker panicked during teardown");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicator::RecordingIndicator;
    use crate::sim::{ScriptedChannel, SimulatedChannel, SimulationConfig};
    use std::sync::atomic::Ordering;

    #[test]
    fn default_config_matches_board_program() {
        let config = SubsystemConfig::default();
        config.validate().unwrap();
        assert_eq!(config.timer.period, Duration::from_millis(1000));
        assert_eq!(config.timer.start_delay, Duration::from_millis(1000));
        assert_eq!(config.worker.stack_size, 1500);
        assert_eq!(config.worker.priority, Priority::new(5));
    }

    #[test]
    fn one_shot_timer_rejected() {
        let config = SubsystemConfig {
            timer: PeriodicConfig::one_shot(Duration::from_millis(10)),
            ..Default::default()
        };
        assert!(matches!(
            SamplingSubsystem::new(config),
            Err(SamplingError::ConfigInvalid { .. })
        ));
    }

    #[test]
    fn zero_period_timer_is_config_invalid() {
        let config = SubsystemConfig {
            timer: PeriodicConfig::periodic(Duration::ZERO),
            ..Default::default()
        };
        assert!(matches!(
            SamplingSubsystem::new(config),
            Err(SamplingError::ConfigInvalid { .. })
        ));
    }

    #[test]
    fn unnamed_worker_is_config_invalid() {
        let config = SubsystemConfig {
            worker: TaskSpec::new("", 1500, Priority::new(5)),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(SamplingError::ConfigInvalid { .. })
        ));
    }

    #[test]
    fn start_fails_closed_without_spawning() {
        let spawner = TaskSpawner::new();
        let channel = ScriptedChannel::new([Ok(1)]).not_ready();
        let reads = channel.read_counter();
        let subsystem = SamplingSubsystem::new(SubsystemConfig::default()).unwrap();

        let result = subsystem.start(channel, RecordingIndicator::new(), &spawner);
        assert!(matches!(
            result,
            Err(SamplingError::HardwareUnavailable { .. })
        ));
        assert_eq!(spawner.spawned(), 0);
        assert_eq!(reads.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn short_run_produces_samples() {
        let config = SubsystemConfig {
            timer: PeriodicConfig::periodic(Duration::from_millis(10)),
            pulse: PulseConfig {
                hold: Duration::from_millis(1),
                settle: Duration::ZERO,
            },
            ..Default::default()
        };
        let spawner = TaskSpawner::new();
        let channel = SimulatedChannel::new("adc0", SimulationConfig::default());
        let running = SamplingSubsystem::new(config)
            .unwrap()
            .start(channel, RecordingIndicator::new(), &spawner)
            .unwrap();

        std::thread::sleep(Duration::from_millis(150));
        let (report, worker) = running.stop().unwrap();

        assert!(report.samples > 0);
        assert_eq!(report.last_sequence, report.samples);
        assert!(report.samples <= report.ticks_posted);
        assert_eq!(worker.sequence(), report.samples);
        assert_eq!(worker.channel().reads(), report.samples);
    }
}
