//! Hand-off primitives for periodic sampling.
//!
//! This crate provides the coordination layer between timing sources and
//! worker tasks. A timing source never does work itself: on expiry it posts to
//! a [`Signal`] and a schedulable task picks the work up.
//!
//! # Architecture
//!
//! - [`Signal`] is a bounded counting semaphore. Posts saturate at
//!   `max_count` instead of queueing, so a slow consumer sees "at least one
//!   post happened" rather than a backlog.
//! - [`PeriodicSource`] fires on a fixed schedule from its own thread. It only
//!   ever holds a [`Poster`], the post-only half of a signal.
//! - [`TaskSpawner`] starts named tasks with an explicit stack size and
//!   priority and returns a [`TaskHandle`] for stop/join.
//!
//! # Design Principles
//!
//! - **Capability boundary**: expiry handlers can post and nothing else
//! - **No globals**: every primitive is owned by whoever assembles the subsystem
//! - **Cooperative stop**: tasks observe a [`StopToken`] at loop boundaries

pub mod clock;
pub mod error;
pub mod periodic;
pub mod signal;
pub mod task;

pub use clock::ExpiryClock;
pub use error::{SyncError, SyncResult};
pub use periodic::{PeriodicConfig, PeriodicSource};
pub use signal::{PostOutcome, Poster, Signal, SignalStats, Timeout, WaitOutcome};
pub use task::{
    HOST_MIN_STACK_SIZE, Priority, StopToken, TaskContext, TaskHandle, TaskSpawner, TaskSpec,
};
