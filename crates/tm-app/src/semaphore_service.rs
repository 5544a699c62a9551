//! Timed runs of the producer/consumer pair.

use std::thread;
use std::time::Duration;

use tm_sampling::{PairReport, ProducerConsumerPair};
use tm_sync::TaskSpawner;
use tracing::info;

use crate::config::AppConfig;
use crate::error::AppResult;

/// Run the producer/consumer pair for `duration`.
pub fn run_semaphore_demo(config: &AppConfig, duration: Duration) -> AppResult<PairReport> {
    let pair = ProducerConsumerPair::new(config.semaphore.pair_config())?;
    let spawner = TaskSpawner::new();

    info!(duration_s = duration.as_secs_f64(), "starting semaphore demo");
    let running = pair.start(&spawner)?;
    thread::sleep(duration);
    Ok(running.stop()?)
}
