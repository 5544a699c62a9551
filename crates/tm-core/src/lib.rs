//! tm-core: stable foundation for tempmon.
//!
//! Contains:
//! - units (uom SI types + constructors for millivolts and degrees Celsius)
//! - numeric (Real + tolerances + float helpers)
//! - ids (compact task identifiers)
//! - timing (lock-free accumulating timers)
//! - error (shared error types)

pub mod error;
pub mod ids;
pub mod numeric;
pub mod timing;
pub mod units;

// Re-exports: nice ergonomics for downstream crates
pub use error::{CoreError, CoreResult};
pub use ids::*;
pub use numeric::*;
pub use timing::AccumulatingTimer;
pub use units::*;
