//! Process-wide bound on concurrent storage I/O.
//!
//! One pool is created at startup and cloned into every service that fans
//! out downloads, so the bound holds across concurrent requests rather than
//! per request.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::error;

use super::TraceId;

#[derive(Debug, Clone)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    size: usize,
}

impl WorkerPool {
    /// Create a pool running at most `size` tasks at once (minimum one).
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            permits: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Run `task` for every item and collect outputs in completion order.
    ///
    /// Tasks that panic are logged and omitted from the output.
    pub async fn run_all<I, F, Fut, T>(&self, items: I, task: F) -> Vec<T>
    where
        I: IntoIterator,
        F: Fn(I::Item) -> Fut,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let mut set = JoinSet::new();
        for item in items {
            let permits = Arc::clone(&self.permits);
            let work = task(item);
            set.spawn(TraceId::propagate(async move {
                // The semaphore is never closed, so acquisition only fails
                // if it is; run unbounded in that case.
                let _permit = permits.acquire_owned().await.ok();
                work.await
            }));
        }

        let mut outputs = Vec::with_capacity(set.len());
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(output) => outputs.push(output),
                Err(err) => error!(error = %err, "worker task failed"),
            }
        }
        outputs
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new(16)
    }
}
