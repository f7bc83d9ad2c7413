use std::future::Future;
use std::sync::Arc;

use anyhow::Context as _;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

/// Runs spawned tasks with at most `size` of them in flight.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    semaphore: Arc<Semaphore>,
}

impl WorkerPool {
    pub fn new(size: usize) -> Self {
        let permits = size.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(permits)),
        }
    }

    pub fn spawn<F, T>(&self, fut: F) -> JoinHandle<anyhow::Result<T>>
    where
        F: Future<Output = anyhow::Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        let semaphore = Arc::clone(&self.semaphore);
        tokio::spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .context("worker pool is closed")?;
            fut.await
        })
    }
}
