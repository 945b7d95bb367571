//! Bounded execution pool

use coderun_core::protocol::DaemonStatus;
use coderun_core::{ExecutionOutcome, ExecutionRequest, Executor};
use parking_lot::Mutex;
use tokio::sync::Semaphore;

#[derive(Debug, Default)]
struct Counters {
    active: usize,
    completed: u64,
}

/// Marks one execution in flight until dropped, even if the caller goes away
struct Active<'a>(&'a Mutex<Counters>);

impl<'a> Active<'a> {
    fn enter(counters: &'a Mutex<Counters>) -> Self {
        counters.lock().active += 1;
        Self(counters)
    }
}

impl Drop for Active<'_> {
    fn drop(&mut self) {
        let mut counters = self.0.lock();
        counters.active -= 1;
        counters.completed += 1;
    }
}

/// Runs executions with at most `capacity` in flight
pub struct ExecutionPool {
    executor: Executor,
    permits: Semaphore,
    capacity: usize,
    counters: Mutex<Counters>,
}

impl ExecutionPool {
    pub fn new(executor: Executor, capacity: usize) -> Self {
        Self {
            executor,
            permits: Semaphore::new(capacity),
            capacity,
            counters: Mutex::new(Counters::default()),
        }
    }

    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    /// Wait for a free slot, then run `request`
    pub async fn execute(&self, request: ExecutionRequest) -> ExecutionOutcome {
        let Ok(_permit) = self.permits.acquire().await else {
            return ExecutionOutcome::internal_error("Execution failed: daemon is shutting down");
        };

        let _active = Active::enter(&self.counters);
        self.executor.execute(request).await
    }

    /// Get pool status
    pub fn status(&self) -> DaemonStatus {
        let counters = self.counters.lock();
        DaemonStatus {
            capacity: self.capacity,
            active: counters.active,
            completed: counters.completed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coderun_core::{ExecutionConfig, Status};

    fn pool(capacity: usize, root: &std::path::Path) -> ExecutionPool {
        let config = ExecutionConfig::builder().temp_root(root).build();
        ExecutionPool::new(Executor::new(config), capacity)
    }

    #[tokio::test]
    async fn counts_completed_executions() {
        let dir = tempfile::tempdir().unwrap();
        let pool = pool(2, dir.path());

        let outcome = pool.execute(ExecutionRequest::new("cobol", "")).await;
        assert_eq!(outcome.status, Status::InternalError);

        let status = pool.status();
        assert_eq!(status.capacity, 2);
        assert_eq!(status.active, 0);
        assert_eq!(status.completed, 1);
    }

    #[tokio::test]
    async fn closed_pool_refuses_work() {
        let dir = tempfile::tempdir().unwrap();
        let pool = pool(1, dir.path());
        pool.permits.close();

        let outcome = pool.execute(ExecutionRequest::new("bash", "echo hi")).await;
        assert_eq!(outcome.status, Status::InternalError);
        assert_eq!(pool.status().completed, 0);
    }
}
