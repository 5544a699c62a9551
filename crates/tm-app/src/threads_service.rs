//! Static and dynamic task demo.
//!
//! The "static" task is spawned as soon as the demo starts, the "dynamic" one
//! after a configurable delay, each beating at its own period.

use std::thread;
use std::time::Duration;

use serde::Serialize;
use tm_sync::{SyncResult, TaskHandle, TaskSpawner, TaskSpec};
use tracing::info;

use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use crate::task_group::TaskGroup;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ThreadsDemoReport {
    pub static_beats: u64,
    pub dynamic_beats: u64,
}

pub fn run_threads_demo(config: &AppConfig, duration: Duration) -> AppResult<ThreadsDemoReport> {
    let threads = &config.threads;
    if threads.static_period_ms == 0 || threads.dynamic_period_ms == 0 {
        return Err(AppError::ConfigInvalid(
            "threads: task periods must be positive".to_string(),
        ));
    }
    let spawner = TaskSpawner::new();
    let mut tasks = TaskGroup::new();

    tasks.push(spawn_heartbeat(
        &spawner,
        threads.static_spec(),
        Duration::from_millis(threads.static_period_ms),
    )?);

    let spawn_delay = Duration::from_millis(threads.dynamic_spawn_delay_ms).min(duration);
    thread::sleep(spawn_delay);
    info!("creating dynamic task");
    tasks.push(spawn_heartbeat(
        &spawner,
        threads.dynamic_spec(),
        Duration::from_millis(threads.dynamic_period_ms),
    )?);

    thread::sleep(duration.saturating_sub(spawn_delay));

    match tasks.finish()?.as_slice() {
        &[static_beats, dynamic_beats] => Ok(ThreadsDemoReport {
            static_beats,
            dynamic_beats,
        }),
        _ => Ok(ThreadsDemoReport::default()),
    }
}

fn spawn_heartbeat(
    spawner: &TaskSpawner,
    spec: TaskSpec,
    period: Duration,
) -> SyncResult<TaskHandle<u64>> {
    spawner.spawn(spec, move |ctx| {
        let mut beats = 0_u64;
        loop {
            beats += 1;
            info!(task = %ctx.name, priority = %ctx.priority, beat = beats, "task running");
            if ctx.sleep(period) {
                break;
            }
        }
        beats
    })
}
