//! Bounded Task Group
//!
//! Structured fan-out: spawn N futures, run at most `limit` at once, then
//! join all of them and collect one result per task in spawn order.
//!
//! There is no cancellation. A caller that ends up not needing a branch
//! simply ignores its result; dropping the group detaches running tasks.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use crate::error::{AgentError, Result};

/// A group of spawned tasks sharing a concurrency limit
pub struct TaskGroup<T> {
    permits: Arc<Semaphore>,
    handles: Vec<JoinHandle<T>>,
}

impl<T: Send + 'static> TaskGroup<T> {
    /// Create a group running at most `limit` tasks concurrently (minimum 1)
    pub fn new(limit: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(limit.max(1))),
            handles: Vec::new(),
        }
    }

    /// Spawn a task; it starts once a permit is free
    pub fn spawn<F>(&mut self, task: F)
    where
        F: Future<Output = T> + Send + 'static,
    {
        let permits = Arc::clone(&self.permits);
        self.handles.push(tokio::spawn(async move {
            // The semaphore is never closed, so acquisition only waits.
            let _permit = permits.acquire_owned().await.ok();
            task.await
        }));
    }

    /// Number of spawned tasks
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Await every task. Results are in spawn order; a panicked task
    /// yields [`AgentError::Task`] without affecting its siblings.
    pub async fn join_all(self) -> Vec<Result<T>> {
        let mut results = Vec::with_capacity(self.handles.len());
        for handle in self.handles {
            results.push(handle.await.map_err(|e| AgentError::Task(e.to_string())));
        }
        results
    }
}
