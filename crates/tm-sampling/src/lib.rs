//! Periodic hardware sampling for tempmon.
//!
//! A timing source posts to a binary signal; a worker task wakes on it, reads
//! one raw value from a [`HardwareChannel`], converts it to engineering units,
//! reports it and pulses an indicator.
//!
//! # Architecture
//!
//! - [`SamplingWorker`] owns the channel, the indicator and the sample
//!   sequence. Nothing else touches them while it runs.
//! - [`SamplingSubsystem`] is the context object that assembles signal, timing
//!   source and worker task, and tears them down again.
//! - [`ProducerConsumerPair`] runs the same hand-off between two tasks, with the
//!   consumer polling through a bounded wait.
//! - [`sim`] provides stand-in channels and indicators for hosts without the
//!   board hardware.

pub mod channel;
pub mod convert;
pub mod error;
pub mod indicator;
pub mod pair;
pub mod sim;
pub mod subsystem;
pub mod worker;

pub use channel::{ChannelFault, HardwareChannel, RawSample};
pub use convert::{Conversion, ConversionConfig};
pub use error::{SamplingError, SamplingResult};
pub use indicator::{IndicatorSink, LogIndicator, PulseConfig, RecordingIndicator};
pub use pair::{PairConfig, PairReport, ProducerConsumerPair, RunningPair};
pub use sim::{ScriptedChannel, SimulatedChannel, SimulationConfig};
pub use subsystem::{MonitorReport, RunningSubsystem, SamplingSubsystem, SubsystemConfig};
pub use worker::{CycleOutcome, EngineeringSample, SamplingWorker, WorkerState, WorkerStats};
