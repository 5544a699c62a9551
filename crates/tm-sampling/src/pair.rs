//! Producer/consumer hand-off through a bounded signal.
//!
//! A lower-urgency producer posts on a fixed interval; a higher-urgency
//! consumer polls with a bounded wait. The poll timeout is the consumer's
//! cooperative yield: with nothing pending it sleeps inside the wait for at
//! most `poll_timeout` and then re-checks whether it should keep running.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tm_sync::{PostOutcome, Priority, Signal, TaskHandle, TaskSpawner, TaskSpec, Timeout};
use tracing::{debug, info, warn};

use crate::error::{SamplingError, SamplingResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PairConfig {
    pub produce_interval: Duration,
    pub poll_timeout: Duration,
    /// Outstanding posts the producer may get ahead by.
    pub max_count: u32,
    pub producer: TaskSpec,
    pub consumer: TaskSpec,
}

impl Default for PairConfig {
    fn default() -> Self {
        Self {
            produce_interval: Duration::from_millis(500),
            poll_timeout: Duration::from_millis(10),
            max_count: 1,
            producer: TaskSpec::new("producer", 1024, Priority::new(2)),
            consumer: TaskSpec::new("consumer", 1024, Priority::new(1)),
        }
    }
}

impl PairConfig {
    /// # Errors
    ///
    /// `ConfigInvalid` for a zero interval or capacity, a malformed task spec,
    /// or a consumer that is not more urgent than the producer.
    pub fn validate(&self) -> SamplingResult<()> {
        if self.produce_interval.is_zero() {
            return Err(SamplingError::ConfigInvalid {
                what: "produce_interval must be positive".to_string(),
            });
        }
        if self.max_count == 0 {
            return Err(SamplingError::ConfigInvalid {
                what: "max_count must be at least 1".to_string(),
            });
        }
        self.producer.validate()?;
        self.consumer.validate()?;
        if !self
            .consumer
            .priority
            .is_more_urgent_than(self.producer.priority)
        {
            return Err(SamplingError::ConfigInvalid {
                what: format!(
                    "consumer priority {} must be more urgent than producer priority {}",
                    self.consumer.priority, self.producer.priority
                ),
            });
        }
        Ok(())
    }
}

/// Tallies from a finished pair run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PairReport {
    /// Posts that raised the count.
    pub produced: u64,
    /// Posts discarded because the signal was saturated.
    pub dropped: u64,
    pub consumed: u64,
    /// Bounded waits that ended without a post.
    pub timeouts: u64,
    /// Posts still unconsumed when the pair stopped.
    pub pending: u32,
}

#[derive(Debug, Default, Clone, Copy)]
struct ProducerTally {
    produced: u64,
    dropped: u64,
}

#[derive(Debug, Default, Clone, Copy)]
struct ConsumerTally {
    consumed: u64,
    timeouts: u64,
}

/// Two tasks sharing one signal.
#[derive(Debug, Clone)]
pub struct ProducerConsumerPair {
    config: PairConfig,
}

impl ProducerConsumerPair {
    pub fn new(config: PairConfig) -> SamplingResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PairConfig {
        &self.config
    }

    /// Create the signal and spawn the consumer, then the producer.
    pub fn start(&self, spawner: &TaskSpawner) -> SamplingResult<RunningPair> {
        let signal = Arc::new(Signal::new(0, self.config.max_count)?);
        info!(max_count = self.config.max_count, "semaphore created");

        let consumer = {
            let signal = Arc::clone(&signal);
            let poll = Timeout::After(self.config.poll_timeout);
            spawner.spawn(self.config.consumer.clone(), move |ctx| {
                let mut tally = ConsumerTally::default();
                while !ctx.should_stop() {
                    if signal.wait(poll).is_acquired() {
                        tally.consumed += 1;
                        info!(task = %ctx.name, consumed = tally.consumed, "take semaphore");
                    } else {
                        tally.timeouts += 1;
                    }
                }
                tally
            })?
        };

        let interval = self.config.produce_interval;
        let poster = signal.poster();
        let producer = match spawner.spawn(self.config.producer.clone(), move |ctx| {
            let mut tally = ProducerTally::default();
            loop {
                match poster.post() {
                    PostOutcome::Accepted => {
                        tally.produced += 1;
                        info!(task = %ctx.name, produced = tally.produced, "give semaphore");
                    }
                    PostOutcome::Saturated => {
                        tally.dropped += 1;
                        debug!(task = %ctx.name, "give semaphore dropped, already pending");
                    }
                }
                if ctx.sleep(interval) {
                    break;
                }
            }
            tally
        }) {
            Ok(handle) => handle,
            Err(e) => {
                if consumer.stop_and_join().is_err() {
                    warn!("consumer panicked during teardown");
                }
                return Err(e.into());
            }
        };

        Ok(RunningPair {
            signal,
            producer: Some(producer),
            consumer: Some(consumer),
        })
    }
}

/// A started producer/consumer pair.
pub struct RunningPair {
    signal: Arc<Signal>,
    producer: Option<TaskHandle<ProducerTally>>,
    consumer: Option<TaskHandle<ConsumerTally>>,
}

impl RunningPair {
    pub fn signal(&self) -> &Signal {
        &self.signal
    }

    /// Stop the producer first, then the consumer, and collect the tallies.
    pub fn stop(mut self) -> SamplingResult<PairReport> {
        let producer = match self.producer.take() {
            Some(task) => task.stop_and_join()?,
            None => ProducerTally::default(),
        };
        let consumer = match self.consumer.take() {
            Some(task) => task.stop_and_join()?,
            None => ConsumerTally::default(),
        };
        let report = PairReport {
            produced: producer.produced,
            dropped: producer.dropped,
            consumed: consumer.consumed,
            timeouts: consumer.timeouts,
            pending: self.signal.count(),
        };
        info!(
            produced = report.produced,
            dropped = report.dropped,
            consumed = report.consumed,
            timeouts = report.timeouts,
            "producer/consumer pair stopped"
        );
        Ok(report)
    }
}

impl Drop for RunningPair {
    fn drop(&mut self) {
        if let Some(producer) = self.producer.take() {
            if producer.stop_and_join().is_err() {
                warn!("producer panicked during teardown");
            }
        }
        if let Some(consumer) = self.consumer.take() {
            if consumer.stop_and_join().is_err() {
                warn!("consumer panicked during teardown");
            }
        }
    }
}
