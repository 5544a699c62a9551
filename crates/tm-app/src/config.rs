//! Application configuration: loading, saving, and validation.
//!
//! Every section has defaults matching the board programs, so an empty file
//! (or no file at all) is a valid configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tm_sampling::{
    ConversionConfig, PairConfig, PulseConfig, SimulationConfig, SubsystemConfig,
};
use tm_sync::{PeriodicConfig, Priority, TaskSpec};

use crate::error::{AppError, AppResult};

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub monitor: MonitorSection,
    pub semaphore: SemaphoreSection,
    pub timers: TimersSection,
    pub threads: ThreadsSection,
    pub simulation: SimulationConfig,
}

/// Sampling pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorSection {
    pub period_ms: u64,
    pub start_delay_ms: u64,
    pub pulse_hold_ms: u64,
    pub settle_ms: u64,
    pub stack_size: usize,
    pub priority: i8,
    pub conversion: ConversionConfig,
}

impl Default for MonitorSection {
    fn default() -> Self {
        Self {
            period_ms: 1000,
            start_delay_ms: 1000,
            pulse_hold_ms: 100,
            settle_ms: 10,
            stack_size: 1500,
            priority: 5,
            conversion: ConversionConfig::default(),
        }
    }
}

impl MonitorSection {
    pub fn subsystem_config(&self) -> SubsystemConfig {
        SubsystemConfig {
            timer: PeriodicConfig::periodic(ms(self.period_ms))
                .with_start_delay(ms(self.start_delay_ms)),
            conversion: self.conversion,
            pulse: PulseConfig {
                hold: ms(self.pulse_hold_ms),
                settle: ms(self.settle_ms),
            },
            worker: TaskSpec::new("sampling-worker", self.stack_size, Priority::new(self.priority)),
        }
    }
}

/// Producer/consumer demo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SemaphoreSection {
    pub produce_interval_ms: u64,
    pub poll_timeout_ms: u64,
    pub max_count: u32,
    pub producer_stack_size: usize,
    pub producer_priority: i8,
    pub consumer_stack_size: usize,
    pub consumer_priority: i8,
}

impl Default for SemaphoreSection {
    fn default() -> Self {
        Self {
            produce_interval_ms: 500,
            poll_timeout_ms: 10,
            max_count: 1,
            producer_stack_size: 1024,
            producer_priority: 2,
            consumer_stack_size: 1024,
            consumer_priority: 1,
        }
    }
}

impl SemaphoreSection {
    pub fn pair_config(&self) -> PairConfig {
        PairConfig {
            produce_interval: ms(self.produce_interval_ms),
            poll_timeout: ms(self.poll_timeout_ms),
            max_count: self.max_count,
            producer: TaskSpec::new(
                "producer",
                self.producer_stack_size,
                Priority::new(self.producer_priority),
            ),
            consumer: TaskSpec::new(
                "consumer",
                self.consumer_stack_size,
                Priority::new(self.consumer_priority),
            ),
        }
    }
}

/// Software timer demo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimersSection {
    pub periodic_ms: u64,
    pub one_shot_delay_ms: u64,
    pub blink_interval_ms: u64,
    pub stack_size: usize,
    pub priority: i8,
}

impl Default for TimersSection {
    fn default() -> Self {
        Self {
            periodic_ms: 1000,
            one_shot_delay_ms: 500,
            blink_interval_ms: 500,
            stack_size: 500,
            priority: 2,
        }
    }
}

impl TimersSection {
    pub fn periodic(&self) -> PeriodicConfig {
        PeriodicConfig::periodic(ms(self.periodic_ms))
    }

    pub fn one_shot(&self) -> PeriodicConfig {
        PeriodicConfig::one_shot(ms(self.one_shot_delay_ms))
    }

    pub fn blink_interval(&self) -> Duration {
        ms(self.blink_interval_ms)
    }

    pub fn task_spec(&self, name: &str) -> TaskSpec {
        TaskSpec::new(name, self.stack_size, Priority::new(self.priority))
    }
}

/// Static/dynamic task demo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThreadsSection {
    pub static_period_ms: u64,
    pub static_priority: i8,
    pub dynamic_period_ms: u64,
    pub dynamic_priority: i8,
    /// Delay before the dynamic task is spawned.
    pub dynamic_spawn_delay_ms: u64,
    pub stack_size: usize,
}

impl Default for ThreadsSection {
    fn default() -> Self {
        Self {
            static_period_ms: 1000,
            static_priority: 3,
            dynamic_period_ms: 500,
            dynamic_priority: 4,
            dynamic_spawn_delay_ms: 0,
            stack_size: 512,
        }
    }
}

impl ThreadsSection {
    pub fn static_spec(&self) -> TaskSpec {
        TaskSpec::new("static-task", self.stack_size, Priority::new(self.static_priority))
    }

    pub fn dynamic_spec(&self) -> TaskSpec {
        TaskSpec::new("dynamic-task", self.stack_size, Priority::new(self.dynamic_priority))
    }
}

fn ms(v: u64) -> Duration {
    Duration::from_millis(v)
}

/// Load configuration from a YAML file.
pub fn load_config(path: &Path) -> AppResult<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| AppError::ConfigFileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    let config: AppConfig = serde_yaml::from_str(&content)
        .map_err(|e| AppError::ConfigFormat(format!("Failed to parse config YAML: {}", e)))?;

    Ok(config)
}

/// Save configuration to a YAML file.
pub fn save_config(path: &Path, config: &AppConfig) -> AppResult<()> {
    let content = serde_yaml::to_string(config)
        .map_err(|e| AppError::ConfigFormat(format!("Failed to serialize config: {}", e)))?;

    std::fs::write(path, content).map_err(|e| AppError::ConfigFileWrite {
        path: path.to_path_buf(),
        source: e,
    })?;

    Ok(())
}

/// Render configuration as YAML text.
pub fn config_to_yaml(config: &AppConfig) -> AppResult<String> {
    serde_yaml::to_string(config)
        .map_err(|e| AppError::ConfigFormat(format!("Failed to serialize config: {}", e)))
}

/// Validate every section.
pub fn validate_config(config: &AppConfig) -> AppResult<()> {
    let invalid = |section: &str, e: &dyn std::fmt::Display| {
        AppError::ConfigInvalid(format!("{section}: {e}"))
    };

    config
        .monitor
        .subsystem_config()
        .validate()
        .map_err(|e| invalid("monitor", &e))?;
    if config.monitor.conversion.resolution_bits != config.simulation.resolution_bits {
        return Err(AppError::ConfigInvalid(format!(
            "simulation: resolution_bits {} does not match monitor conversion ({})",
            config.simulation.resolution_bits, config.monitor.conversion.resolution_bits
        )));
    }

    config
        .semaphore
        .pair_config()
        .validate()
        .map_err(|e| invalid("semaphore", &e))?;

    let timers = &config.timers;
    timers.periodic().validate().map_err(|e| invalid("timers", &e))?;
    if timers.blink_interval_ms == 0 {
        return Err(AppError::ConfigInvalid(
            "timers: blink_interval_ms must be positive".to_string(),
        ));
    }
    timers
        .task_spec("blink")
        .validate()
        .map_err(|e| invalid("timers", &e))?;

    let threads = &config.threads;
    if threads.static_period_ms == 0 || threads.dynamic_period_ms == 0 {
        return Err(AppError::ConfigInvalid(
            "threads: task periods must be positive".to_string(),
        ));
    }
    threads
        .static_spec()
        .validate()
        .map_err(|e| invalid("threads", &e))?;

    Ok(())
}
