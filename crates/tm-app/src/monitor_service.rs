//! Timed runs of the sampling subsystem.

use std::thread;
use std::time::Duration;

use tm_sampling::{
    HardwareChannel, IndicatorSink, LogIndicator, MonitorReport, SamplingSubsystem,
    SimulatedChannel,
};
use tm_sync::TaskSpawner;
use tracing::info;

use crate::config::{AppConfig, validate_config};
use crate::error::AppResult;

/// Run the sampling subsystem on the simulated channel for `duration`.
pub fn run_monitor(config: &AppConfig, duration: Duration) -> AppResult<MonitorReport> {
    let channel = SimulatedChannel::new("adc0", config.simulation);
    run_monitor_with(config, channel, LogIndicator::new("led0"), duration)
}

/// Run the sampling subsystem on caller-supplied devices for `duration`.
pub fn run_monitor_with<C, I>(
    config: &AppConfig,
    channel: C,
    indicator: I,
    duration: Duration,
) -> AppResult<MonitorReport>
where
    C: HardwareChannel + 'static,
    I: IndicatorSink + 'static,
{
    validate_config(config)?;
    let spawner = TaskSpawner::new();
    let subsystem = SamplingSubsystem::new(config.monitor.subsystem_config())?;

    info!(
        duration_s = duration.as_secs_f64(),
        period_ms = config.monitor.period_ms,
        "starting monitor"
    );
    let running = subsystem.start(channel, indicator, &spawner)?;
    thread::sleep(duration);
    let (report, _worker) = running.stop()?;
    Ok(report)
}
