//! Task factory with explicit stack size and priority.
//!
//! Tasks are ordinary host threads. Each one is described by a [`TaskSpec`]
//! and started through a [`TaskSpawner`], which hands back a [`TaskHandle`]
//! for stop and join. Stopping is cooperative: the body receives a
//! [`TaskContext`] and checks it at its loop boundary.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tm_core::TaskId;
use tracing::{debug, info};

use crate::error::{SyncError, SyncResult};

/// Smallest stack handed to a host thread.
///
/// Board stack budgets (hundreds of bytes to a few KiB) are far below what a
/// hosted thread with formatting and logging needs, so requested sizes are
/// raised to this floor.
pub const HOST_MIN_STACK_SIZE: usize = 64 * 1024;

/// Scheduling urgency. Lower values are more urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Priority(pub i8);

impl Priority {
    pub fn new(value: i8) -> Self {
        Self(value)
    }

    pub fn value(self) -> i8 {
        self.0
    }

    /// Returns `true` if `self` is preferred over `other` when both are runnable.
    pub fn is_more_urgent_than(self, other: Priority) -> bool {
        self.0 < other.0
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Static description of a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSpec {
    /// Thread name, also used in logs.
    pub name: String,
    /// Requested stack size in bytes.
    pub stack_size: usize,
    /// Scheduling urgency.
    pub priority: Priority,
}

impl TaskSpec {
    pub fn new(name: impl Into<String>, stack_size: usize, priority: Priority) -> Self {
        Self {
            name: name.into(),
            stack_size,
            priority,
        }
    }

    /// Check this description can be turned into a thread.
    pub fn validate(&self) -> SyncResult<()> {
        if self.name.trim().is_empty() {
            return Err(SyncError::ConfigInvalid {
                what: "task name must not be empty",
            });
        }
        if self.stack_size == 0 {
            return Err(SyncError::ConfigInvalid {
                what: "task stack_size must be positive",
            });
        }
        Ok(())
    }

    /// Stack size actually requested from the host.
    pub fn host_stack_size(&self) -> usize {
        self.stack_size.max(HOST_MIN_STACK_SIZE)
    }
}

#[derive(Debug, Default)]
struct StopState {
    requested: Mutex<bool>,
    changed: Condvar,
}

/// Shared flag asking a task to leave its loop.
#[derive(Debug, Clone, Default)]
pub struct StopToken {
    state: Arc<StopState>,
}

impl StopToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_stop(&self) {
        *self.lock() = true;
        self.state.changed.notify_all();
    }

    pub fn is_stop_requested(&self) -> bool {
        *self.lock()
    }

    /// Sleep for `duration`, waking early if a stop is requested.
    ///
    /// Returns `true` if a stop was requested.
    pub fn sleep(&self, duration: Duration) -> bool {
        let Some(deadline) = Instant::now().checked_add(duration) else {
            let mut requested = self.lock();
            while !*requested {
                requested = self
                    .state
                    .changed
                    .wait(requested)
                    .unwrap_or_else(PoisonError::into_inner);
            }
            return true;
        };

        let mut requested = self.lock();
        while !*requested {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            let (guard, _) = self
                .state
                .changed
                .wait_timeout(requested, remaining)
                .unwrap_or_else(PoisonError::into_inner);
            requested = guard;
        }
        true
    }

    fn lock(&self) -> MutexGuard<'_, bool> {
        self.state
            .requested
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// What a task body knows about itself.
#[derive(Debug, Clone)]
pub struct TaskContext {
    pub id: TaskId,
    pub name: String,
    pub priority: Priority,
    stop: StopToken,
}

impl TaskContext {
    pub fn should_stop(&self) -> bool {
        self.stop.is_stop_requested()
    }

    /// Cooperative sleep. Returns `true` if the task was asked to stop.
    pub fn sleep(&self, duration: Duration) -> bool {
        self.stop.sleep(duration)
    }

    pub fn stop_token(&self) -> &StopToken {
        &self.stop
    }
}

/// Handle to a running task.
#[derive(Debug)]
pub struct TaskHandle<T> {
    id: TaskId,
    spec: TaskSpec,
    stop: StopToken,
    thread: JoinHandle<T>,
}

impl<T> TaskHandle<T> {
    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn priority(&self) -> Priority {
        self.spec.priority
    }

    pub fn spec(&self) -> &TaskSpec {
        &self.spec
    }

    pub fn stop_token(&self) -> &StopToken {
        &self.stop
    }

    /// Ask the task to leave its loop at the next boundary.
    pub fn request_stop(&self) {
        debug!(task = %self.spec.name, "stop requested");
        self.stop.request_stop();
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Wait for the task body to return.
    pub fn join(self) -> SyncResult<T> {
        let name = self.spec.name;
        self.thread
            .join()
            .map_err(|_| SyncError::TaskPanicked { name })
    }

    /// Request a stop and wait for the body to return.
    pub fn stop_and_join(self) -> SyncResult<T> {
        self.request_stop();
        self.join()
    }
}

/// Starts tasks from [`TaskSpec`]s and assigns them ids.
#[derive(Debug, Default)]
pub struct TaskSpawner {
    next_index: AtomicU32,
}

impl TaskSpawner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `body` as a new task.
    ///
    /// # Errors
    ///
    /// `ConfigInvalid` for a malformed spec, `Spawn` if the host refuses the
    /// thread.
    pub fn spawn<T, F>(&self, spec: TaskSpec, body: F) -> SyncResult<TaskHandle<T>>
    where
        F: FnOnce(TaskContext) -> T + Send + 'static,
        T: Send + 'static,
    {
        spec.validate()?;

        let id = TaskId::from_index(self.next_index.fetch_add(1, Ordering::Relaxed));
        let stop = StopToken::new();
        let ctx = TaskContext {
            id,
            name: spec.name.clone(),
            priority: spec.priority,
            stop: stop.clone(),
        };

        let thread = thread::Builder::new()
            .name(spec.name.clone())
            .stack_size(spec.host_stack_size())
            .spawn(move || body(ctx))
            .map_err(|source| SyncError::Spawn {
                name: spec.name.clone(),
                source,
            })?;

        info!(
            task = %spec.name,
            id = %id,
            priority = %spec.priority,
            stack_size = spec.stack_size,
            "task spawned"
        );

        Ok(TaskHandle {
            id,
            spec,
            stop,
            thread,
        })
    }

    /// Number of tasks spawned so far.
    pub fn spawned(&self) -> u32 {
        self.next_index.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_ordering() {
        let consumer = Priority::new(1);
        let producer = Priority::new(2);
        assert!(consumer.is_more_urgent_than(producer));
        assert!(!producer.is_more_urgent_than(consumer));
        assert!(!producer.is_more_urgent_than(producer));
    }

    #[test]
    fn spec_validation() {
        assert!(TaskSpec::new("worker", 1500, Priority::new(5)).validate().is_ok());
        assert!(TaskSpec::new("  ", 1500, Priority::new(5)).validate().is_err());
        assert!(TaskSpec::new("worker", 0, Priority::new(5)).validate().is_err());
    }

    #[test]
    fn host_stack_has_floor() {
        let small = TaskSpec::new("small", 512, Priority::new(3));
        assert_eq!(small.host_stack_size(), HOST_MIN_STACK_SIZE);

        let large = TaskSpec::new("large", 1 << 20, Priority::new(3));
        assert_eq!(large.host_stack_size(), 1 << 20);
    }

    #[test]
    fn spawn_runs_body_and_returns_value() {
        let spawner = TaskSpawner::new();
        let handle = spawner
            .spawn(TaskSpec::new("adder", 1024, Priority::new(4)), |ctx| {
                assert_eq!(ctx.name, "adder");
                assert_eq!(thread::current().name(), Some("adder"));
                2 + 2
            })
            .unwrap();

        assert_eq!(handle.priority(), Priority::new(4));
        assert_eq!(handle.join().unwrap(), 4);
        assert_eq!(spawner.spawned(), 1);
    }

    #[test]
    fn ids_are_sequential() {
        let spawner = TaskSpawner::new();
        let a = spawner
            .spawn(TaskSpec::new("a", 1024, Priority::new(1)), |ctx| ctx.id)
            .unwrap();
        let b = spawner
            .spawn(TaskSpec::new("b", 1024, Priority::new(1)), |ctx| ctx.id)
            .unwrap();

        assert_eq!(a.join().unwrap().index(), 0);
        assert_eq!(b.join().unwrap().index(), 1);
    }

    #[test]
    fn stop_interrupts_sleep() {
        let spawner = TaskSpawner::new();
        let handle = spawner
            .spawn(TaskSpec::new("sleeper", 1024, Priority::new(3)), |ctx| {
                let start = Instant::now();
                let stopped = ctx.sleep(Duration::from_secs(30));
                (stopped, start.elapsed())
            })
            .unwrap();

        thread::sleep(Duration::from_millis(20));
        let (stopped, elapsed) = handle.stop_and_join().unwrap();
        assert!(stopped);
        assert!(elapsed < Duration::from_secs(5));
    }

    #[test]
    fn sleep_without_stop_runs_to_deadline() {
        let token = StopToken::new();
        let start = Instant::now();
        assert!(!token.sleep(Duration::from_millis(15)));
        assert!(start.elapsed() >= Duration::from_millis(15));
    }

    #[test]
    fn panicking_task_reports_error() {
        let spawner = TaskSpawner::new();
        let handle = spawner
            .spawn(TaskSpec::new("boom", 1024, Priority::new(3)), |_ctx| -> u32 {
                panic!("intentional");
            })
            .unwrap();

        let err = handle.join().unwrap_err();
        assert!(matches!(err, SyncError::TaskPanicked { ref name } if name == "boom"));
    }
}
