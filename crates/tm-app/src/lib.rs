//! Shared application service layer for tempmon.
//!
//! Frontends go through this crate for configuration handling and for timed
//! runs of the sampling pipeline and the companion demos.

pub mod config;
pub mod error;
pub mod monitor_service;
pub mod semaphore_service;
mod task_group;
pub mod threads_service;
pub mod timer_service;

// Re-export key types for convenience
pub use config::{
    AppConfig, MonitorSection, SemaphoreSection, ThreadsSection, TimersSection, config_to_yaml,
    load_config, save_config, validate_config,
};
pub use error::{AppError, AppResult};
pub use monitor_service::{run_monitor, run_monitor_with};
pub use semaphore_service::run_semaphore_demo;
pub use threads_service::{ThreadsDemoReport, run_threads_demo};
pub use timer_service::{TimerDemoReport, run_timer_demo, run_timer_demo_with};
