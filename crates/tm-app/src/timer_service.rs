//! Software timer demo: a periodic and a one-shot timer next to a blinking
//! indicator task.
//!
//! Timer expiries only post to a signal. A small observer task per timer
//! waits on that signal and does the logging the expiry itself may not do.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use serde::Serialize;
use tm_sampling::{IndicatorSink, LogIndicator, SamplingError};
use tm_sync::{
    PeriodicSource, Signal, SyncResult, TaskHandle, TaskSpawner, TaskSpec, Timeout,
};
use tracing::{error, info};

use crate::config::AppConfig;
use crate::error::AppResult;
use crate::task_group::TaskGroup;

/// How long an observer blocks before re-checking for a stop request.
const OBSERVER_POLL: Duration = Duration::from_millis(50);

/// Outcome of a timer demo run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TimerDemoReport {
    pub periodic_expiries: u64,
    pub one_shot_expiries: u64,
    /// Expiries picked up by the observer tasks.
    pub observed: u64,
    /// Indicator level changes made by the blink task.
    pub toggles: u64,
}

/// Run the timer demo with a log-only indicator.
pub fn run_timer_demo(config: &AppConfig, duration: Duration) -> AppResult<TimerDemoReport> {
    run_timer_demo_with(config, LogIndicator::new("led0"), duration)
}

/// Run the timer demo, blinking `indicator`.
pub fn run_timer_demo_with<I>(
    config: &AppConfig,
    mut indicator: I,
    duration: Duration,
) -> AppResult<TimerDemoReport>
where
    I: IndicatorSink + 'static,
{
    let timers = &config.timers;
    let mut periodic = PeriodicSource::new("periodic", timers.periodic())?;
    let mut one_shot = PeriodicSource::new("one-shot", timers.one_shot())?;

    if !indicator.is_ready() {
        error!("indicator device not ready");
        return Err(SamplingError::HardwareUnavailable {
            device: "indicator".to_string(),
        }
        .into());
    }
    indicator.set(true);

    let spawner = TaskSpawner::new();
    let mut tasks = TaskGroup::new();
    let interval = timers.blink_interval();
    tasks.push(spawner.spawn(timers.task_spec("blink"), move |ctx| {
        let mut level = false;
        let mut toggles = 0_u64;
        loop {
            level = !level;
            indicator.set(level);
            toggles += 1;
            if ctx.sleep(interval) {
                break;
            }
        }
        toggles
    })?);

    let periodic_signal = Arc::new(Signal::binary());
    let one_shot_signal = Arc::new(Signal::binary());
    tasks.push(spawn_observer(
        &spawner,
        timers.task_spec("periodic-observer"),
        Arc::clone(&periodic_signal),
        "periodic",
    )?);
    tasks.push(spawn_observer(
        &spawner,
        timers.task_spec("one-shot-observer"),
        Arc::clone(&one_shot_signal),
        "one-shot",
    )?);

    periodic.start(periodic_signal.poster())?;
    one_shot.start(one_shot_signal.poster())?;
    info!(duration_s = duration.as_secs_f64(), "timer demo running");

    thread::sleep(duration);

    periodic.stop();
    one_shot.stop();
    let results = tasks.finish()?;
    let (toggles, observed): (u64, u64) = match results.split_first() {
        Some((toggles, observers)) => (*toggles, observers.iter().sum()),
        None => (0, 0),
    };

    Ok(TimerDemoReport {
        periodic_expiries: periodic.expiry_count(),
        one_shot_expiries: one_shot.expiry_count(),
        observed,
        toggles,
    })
}

fn spawn_observer(
    spawner: &TaskSpawner,
    spec: TaskSpec,
    signal: Arc<Signal>,
    timer: &'static str,
) -> SyncResult<TaskHandle<u64>> {
    spawner.spawn(spec, move |ctx| {
        let mut seen = 0_u64;
        while !ctx.should_stop() {
            if signal.wait(Timeout::After(OBSERVER_POLL)).is_acquired() {
                seen += 1;
                info!(timer, expiry = seen, "timer expired");
            }
        }
        seen
    })
}
