//! Hardware channel abstraction.

use thiserror::Error;

/// Opaque failure code reported by a channel driver.
///
/// The code is only ever propagated to logs.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("channel fault (code {code})")]
pub struct ChannelFault {
    pub code: i32,
}

impl ChannelFault {
    /// Generic I/O failure.
    pub const IO: ChannelFault = ChannelFault { code: -5 };
    /// Channel used before it was configured.
    pub const NOT_CONFIGURED: ChannelFault = ChannelFault { code: -22 };
    /// No data available.
    pub const NO_DATA: ChannelFault = ChannelFault { code: -61 };

    pub fn new(code: i32) -> Self {
        Self { code }
    }
}

/// Outcome of one read: a raw value bounded by the channel resolution, or a
/// fault. Produced and consumed within a single worker cycle.
pub type RawSample = Result<u32, ChannelFault>;

/// A single analog input the sampling worker reads from.
///
/// Implementations are owned by one worker at a time and never shared.
pub trait HardwareChannel: Send {
    /// Human-readable device name for logs.
    fn name(&self) -> &str;

    /// Native resolution; raw values lie in `0..=2^bits - 1`.
    fn resolution_bits(&self) -> u8;

    /// Whether the underlying device is present and powered.
    fn is_ready(&self) -> bool;

    /// Set up the channel and its read sequence.
    fn configure(&mut self) -> Result<(), ChannelFault>;

    /// Perform one conversion.
    fn read(&mut self) -> RawSample;
}
