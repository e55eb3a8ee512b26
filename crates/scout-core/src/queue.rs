//! Concurrency gate for research pipelines

use crate::error::{Result, ScoutError};
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Bounds how many research pipelines run at once.
///
/// Construct one at application start and pass it to whatever launches
/// pipelines. Clones share the same gate.
#[derive(Clone)]
pub struct ResearchQueue {
    inner: Arc<QueueInner>,
}

struct QueueInner {
    semaphore: Arc<Semaphore>,
    max_concurrent: usize,
    active: AtomicUsize,
}

/// Slot in the queue, released on drop
pub struct QueuePermit {
    inner: Arc<QueueInner>,
    _permit: OwnedSemaphorePermit,
}

impl ResearchQueue {
    pub fn new(max_concurrent: usize) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            inner: Arc::new(QueueInner {
                semaphore: Arc::new(Semaphore::new(max_concurrent)),
                max_concurrent,
                active: AtomicUsize::new(0),
            }),
        }
    }

    pub fn max_concurrent(&self) -> usize {
        self.inner.max_concurrent
    }

    /// Pipelines currently holding a slot
    pub fn active(&self) -> usize {
        self.inner.active.load(Ordering::SeqCst)
    }

    /// Wait for a free slot
    pub async fn acquire(&self) -> Result<QueuePermit> {
        let permit = self
            .inner
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| ScoutError::Other(anyhow::anyhow!("research queue closed")))?;

        let active = self.inner.active.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::info!(
            "Starting research request ({}/{} active)",
            active,
            self.inner.max_concurrent
        );

        Ok(QueuePermit {
            inner: Arc::clone(&self.inner),
            _permit: permit,
        })
    }

    /// Run a future while holding a slot. The slot is released however the
    /// future finishes.
    pub async fn run<F, T>(&self, pipeline: F) -> Result<T>
    where
        F: Future<Output = T>,
    {
        let _permit = self.acquire().await?;
        Ok(pipeline.await)
    }
}

impl Drop for QueuePermit {
    fn drop(&mut self) {
        let active = self.inner.active.fetch_sub(1, Ordering::SeqCst) - 1;
        tracing::info!(
            "Completed research request ({}/{} active)",
            active,
            self.inner.max_concurrent
        );
    }
}
