//! Owner for the demo tasks of one service run.
//!
//! Every task pushed into a [`TaskGroup`] is stopped and joined either by
//! [`TaskGroup::finish`] or, on an early return, when the group is dropped.

use tm_sync::{SyncResult, TaskHandle};
use tracing::warn;

#[derive(Debug, Default)]
pub(crate) struct TaskGroup {
    tasks: Vec<TaskHandle<u64>>,
}

impl TaskGroup {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, task: TaskHandle<u64>) {
        self.tasks.push(task);
    }

    /// Stop every task, join them all and return their results in push order.
    ///
    /// All tasks are joined even when one of them panicked; the first failure
    /// is returned.
    pub(crate) fn finish(mut self) -> SyncResult<Vec<u64>> {
        let tasks = std::mem::take(&mut self.tasks);
        for task in &tasks {
            task.request_stop();
        }
        let mut results = Vec::with_capacity(tasks.len());
        let mut failure = None;
        for task in tasks {
            match task.join() {
                Ok(value) => results.push(value),
                Err(e) => {
                    failure.get_or_insert(e);
                }
            }
        }
        match failure {
            Some(e) => Err(e),
            None => Ok(results),
        }
    }
}

impl Drop for TaskGroup {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.request_stop();
        }
        for task in self.tasks.drain(..) {
            let name = task.name().to_string();
            if task.join().is_err() {
                warn!(task = %name, "task panicked during teardown");
            }
        }
    }
}
