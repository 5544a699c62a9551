//! Stand-in channels for hosts without the board ADC.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::channel::{ChannelFault, HardwareChannel, RawSample};

/// Parameters of a [`SimulatedChannel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub resolution_bits: u8,
    /// Centre of the generated readings. 889 is roughly 25 °C with the
    /// default conversion constants.
    pub baseline_raw: u32,
    /// Peak-to-peak variation around the baseline.
    pub noise_span: u32,
    /// Every n-th read fails with an I/O fault.
    pub fail_every: Option<u64>,
    /// Whether the device reports ready at initialization.
    pub ready: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            resolution_bits: 12,
            baseline_raw: 889,
            noise_span: 8,
            fail_every: None,
            ready: true,
        }
    }
}

/// Deterministic channel producing a triangle wave around a baseline.
#[derive(Debug, Clone)]
pub struct SimulatedChannel {
    name: String,
    config: SimulationConfig,
    configured: bool,
    reads: u64,
}

impl SimulatedChannel {
    pub fn new(name: impl Into<String>, config: SimulationConfig) -> Self {
        Self {
            name: name.into(),
            config,
            configured: false,
            reads: 0,
        }
    }

    /// Reads attempted so far, including failed ones.
    pub fn reads(&self) -> u64 {
        self.reads
    }

    fn value_at(&self, n: u64) -> u32 {
        let span = u64::from(self.config.noise_span);
        let full_scale = (1_u32 << self.config.resolution_bits.min(31)) - 1;
        if span == 0 {
            return self.config.baseline_raw.min(full_scale);
        }
        let phase = n % (2 * span);
        let tri = if phase <= span { phase } else { 2 * span - phase };
        let low = self.config.baseline_raw.saturating_sub(self.config.noise_span / 2);
        let value = u64::from(low) + tri;
        u32::try_from(value).unwrap_or(u32::MAX).min(full_scale)
    }
}

impl HardwareChannel for SimulatedChannel {
    fn name(&self) -> &str {
        &self.name
    }

    fn resolution_bits(&self) -> u8 {
        self.config.resolution_bits
    }

    fn is_ready(&self) -> bool {
        self.config.ready
    }

    fn configure(&mut self) -> Result<(), ChannelFault> {
        self.configured = true;
        Ok(())
    }

    fn read(&mut self) -> RawSample {
        if !self.configured {
            return Err(ChannelFault::NOT_CONFIGURED);
        }
        let n = self.reads;
        self.reads += 1;
        if let Some(every) = self.config.fail_every {
            if every > 0 && self.reads % every == 0 {
                return Err(ChannelFault::IO);
            }
        }
        Ok(self.value_at(n))
    }
}

/// Channel that replays a fixed list of results.
///
/// Once the script runs out every read fails with [`ChannelFault::NO_DATA`].
#[derive(Debug, Clone)]
pub struct ScriptedChannel {
    script: VecDeque<RawSample>,
    resolution_bits: u8,
    ready: bool,
    setup: Result<(), ChannelFault>,
    reads: Arc<AtomicU64>,
}

impl ScriptedChannel {
    pub fn new(script: impl IntoIterator<Item = RawSample>) -> Self {
        Self {
            script: script.into_iter().collect(),
            resolution_bits: 12,
            ready: true,
            setup: Ok(()),
            reads: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn not_ready(mut self) -> Self {
        self.ready = false;
        self
    }

    pub fn with_setup_fault(mut self, fault: ChannelFault) -> Self {
        self.setup = Err(fault);
        self
    }

    pub fn with_resolution(mut self, bits: u8) -> Self {
        self.resolution_bits = bits;
        self
    }

    /// Shared read counter, readable after the channel moves into a worker.
    pub fn read_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.reads)
    }
}

impl HardwareChannel for ScriptedChannel {
    fn name(&self) -> &str {
        "scripted"
    }

    fn resolution_bits(&self) -> u8 {
        self.resolution_bits
    }

    fn is_ready(&self) -> bool {
        self.ready
    }

    fn configure(&mut self) -> Result<(), ChannelFault> {
        self.setup
    }

    fn read(&mut self) -> RawSample {
        self.reads.fetch_add(1, Ordering::Relaxed);
        self.script.pop_front().unwrap_or(Err(ChannelFault::NO_DATA))
    }
}
