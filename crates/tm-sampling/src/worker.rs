//! The sampling worker and its cycle.
//!
//! State machine: `Idle -> WaitingForSignal -> Sampling -> Reporting ->
//! WaitingForSignal -> ...`. There is no terminal state; the loop only ends
//! when the owning subsystem asks it to.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::Instant;

use tm_core::AccumulatingTimer;
use tm_sync::{Signal, StopToken, Timeout};
use tracing::{error, info, warn};

use crate::channel::HardwareChannel;
use crate::convert::ConversionConfig;
use crate::error::{SamplingError, SamplingResult};
use crate::indicator::{IndicatorSink, PulseConfig};

/// Where the worker is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    WaitingForSignal,
    Sampling,
    Reporting,
}

/// A converted reading. Only ever published through the report log line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineeringSample {
    /// Count of successful samples, starting at 1.
    pub sequence: u64,
    pub raw: u32,
    pub voltage_mv: f64,
    /// Temperature in degrees Celsius.
    pub derived_value: f64,
}

/// Result of one worker cycle.
#[derive(Debug)]
pub enum CycleOutcome {
    Sampled(EngineeringSample),
    /// The read or conversion failed; the sequence did not advance.
    Failed(SamplingError),
    /// Woken by a stop request; nothing was read.
    Stopped,
}

/// Counters shared between the worker and whoever observes it.
#[derive(Default)]
pub struct WorkerStats {
    samples: AtomicU64,
    failures: AtomicU64,
    cycle_time: AccumulatingTimer,
}

impl WorkerStats {
    pub fn samples(&self) -> u64 {
        self.samples.load(Ordering::Relaxed)
    }

    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    /// Duration of successful cycles, read through report.
    pub fn cycle_time(&self) -> &AccumulatingTimer {
        &self.cycle_time
    }
}

/// Reads a channel each time a signal is posted.
pub struct SamplingWorker<C, I> {
    channel: C,
    indicator: I,
    conversion: ConversionConfig,
    pulse: PulseConfig,
    state: WorkerState,
    sequence: u64,
    initialized: bool,
    stats: Arc<WorkerStats>,
}

impl<C: HardwareChannel, I: IndicatorSink> SamplingWorker<C, I> {
    pub fn new(channel: C, indicator: I, conversion: ConversionConfig, pulse: PulseConfig) -> Self {
        Self {
            channel,
            indicator,
            conversion,
            pulse,
            state: WorkerState::Idle,
            sequence: 0,
            initialized: false,
            stats: Arc::new(WorkerStats::default()),
        }
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    /// Sequence number of the last successful sample, 0 before the first.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn stats(&self) -> Arc<WorkerStats> {
        Arc::clone(&self.stats)
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn indicator(&self) -> &I {
        &self.indicator
    }

    /// Give back the devices the worker owned.
    pub fn into_parts(self) -> (C, I) {
        (self.channel, self.indicator)
    }

    /// Bring up indicator and channel. Must succeed before any cycle runs.
    ///
    /// # Errors
    ///
    /// - `HardwareUnavailable` if the indicator or channel is not ready
    /// - `ConfigInvalid` for bad conversion constants, a resolution mismatch,
    ///   or a channel that refuses its setup
    ///
    /// On error the worker stays `Idle` and will refuse to run.
    pub fn initialize(&mut self) -> SamplingResult<()> {
        self.initialized = false;
        self.conversion.validate()?;

        if !self.indicator.is_ready() {
            error!("indicator device not ready");
            return Err(SamplingError::HardwareUnavailable {
                device: "indicator".to_string(),
            });
        }
        self.indicator.set(false);

        let name = self.channel.name().to_string();
        if !self.channel.is_ready() {
            error!(channel = %name, "ADC controller device not ready");
            return Err(SamplingError::HardwareUnavailable { device: name });
        }
        if self.channel.resolution_bits() != self.conversion.resolution_bits {
            return Err(SamplingError::ConfigInvalid {
                what: format!(
                    "channel '{name}' resolves {} bits, conversion expects {}",
                    self.channel.resolution_bits(),
                    self.conversion.resolution_bits
                ),
            });
        }
        self.channel
            .configure()
            .map_err(|fault| SamplingError::ConfigInvalid {
                what: format!("channel '{name}' setup failed: {fault}"),
            })?;

        self.initialized = true;
        info!(channel = %name, "ADC configured");
        Ok(())
    }

    /// Block on `signal`, then run one cycle unless a stop was requested.
    ///
    /// # Errors
    ///
    /// `NotInitialized` if [`initialize`](Self::initialize) has not succeeded.
    pub fn wait_and_sample(
        &mut self,
        signal: &Signal,
        stop: &StopToken,
    ) -> SamplingResult<CycleOutcome> {
        self.ensure_initialized()?;
        self.state = WorkerState::WaitingForSignal;
        signal.wait(Timeout::Forever);
        if stop.is_stop_requested() {
            return Ok(CycleOutcome::Stopped);
        }
        self.sample_once()
    }

    /// Read, convert, report and pulse once.
    ///
    /// Read and conversion failures are logged and returned as
    /// [`CycleOutcome::Failed`]; the next tick is the retry.
    pub fn sample_once(&mut self) -> SamplingResult<CycleOutcome> {
        self.ensure_initialized()?;
        let started = Instant::now();
        self.state = WorkerState::Sampling;

        let converted = self.channel.read().map_err(SamplingError::from).and_then(|raw| {
            self.conversion
                .convert(raw)
                .map(|conversion| (raw, conversion))
        });
        let (raw, conversion) = match converted {
            Ok(ok) => ok,
            Err(e) => {
                warn!(last_sequence = self.sequence, error = %e, "Sample failed");
                self.stats.failures.fetch_add(1, Ordering::Relaxed);
                self.state = WorkerState::WaitingForSignal;
                return Ok(CycleOutcome::Failed(e));
            }
        };

        self.sequence += 1;
        let sample = EngineeringSample {
            sequence: self.sequence,
            raw,
            voltage_mv: conversion.voltage_mv,
            derived_value: conversion.temperature_c,
        };

        self.state = WorkerState::Reporting;
        info!(
            sequence = sample.sequence,
            raw = sample.raw,
            "Sample #{}: ADC={}, Voltage={:.1} mV, Temp={:.2} C",
            sample.sequence,
            sample.raw,
            sample.voltage_mv,
            sample.derived_value
        );
        self.pulse_indicator();

        self.stats.samples.fetch_add(1, Ordering::Relaxed);
        self.stats.cycle_time.record_since(started);
        self.state = WorkerState::WaitingForSignal;
        Ok(CycleOutcome::Sampled(sample))
    }

    /// Run cycles until `stop` is requested and a post wakes the worker.
    ///
    /// Returns the last sample sequence number.
    pub fn run(&mut self, signal: &Signal, stop: &StopToken) -> SamplingResult<u64> {
        self.ensure_initialized()?;
        loop {
            if let CycleOutcome::Stopped = self.wait_and_sample(signal, stop)? {
                break;
            }
        }
        self.state = WorkerState::Idle;
        info!(samples = self.sequence, "sampling worker stopped");
        Ok(self.sequence)
    }

    fn pulse_indicator(&mut self) {
        self.indicator.set(true);
        thread::sleep(self.pulse.hold);
        self.indicator.set(false);
        thread::sleep(self.pulse.settle);
    }

    fn ensure_initialized(&self) -> SamplingResult<()> {
        if self.initialized {
            Ok(())
        } else {
            Err(SamplingError::NotInitialized)
        }
    }
}
