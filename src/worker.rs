//! Bounded worker pool for blocking conversion, upload, and analysis work.
//!
//! A fixed number of permits caps concurrency; blocking work runs under
//! `spawn_blocking` so it never stalls the async request path. Detached
//! submissions keep their join handles so shutdown can drain in-flight
//! work instead of abandoning half-written artifacts.

use std::{future::Future, sync::Arc};

use log::debug;
use tokio::{
    sync::{Mutex, Semaphore},
    task::JoinHandle,
};

use crate::error::{IngestError, Result};

pub const DEFAULT_WORKERS: usize = 4;

pub struct WorkerPool {
    semaphore: Arc<Semaphore>,
    detached: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    pub fn new(workers: usize) -> Arc<Self> {
        Arc::new(Self {
            semaphore: Arc::new(Semaphore::new(workers.max(1))),
            detached: Mutex::new(Vec::new()),
        })
    }

    /// Runs blocking work under a pool permit and awaits its output.
    pub async fn run_blocking<T, F>(&self, work: F) -> Result<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| IngestError::PoolClosed)?;
        let handle = tokio::task::spawn_blocking(move || {
            let out = work();
            drop(permit);
            out
        });
        handle
            .await
            .map_err(|err| IngestError::Task(err.to_string()))
    }

    /// Submits a detached task and retains its handle so
    /// [`WorkerPool::shutdown`] can drain it. Permits bound blocking work
    /// only: a detached task that needs the pool calls
    /// [`WorkerPool::run_blocking`] itself.
    pub async fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(fut);
        let mut detached = self.detached.lock().await;
        detached.retain(|h| !h.is_finished());
        detached.push(handle);
    }

    /// Drains every submitted task, then stops admitting new work.
    pub async fn shutdown(&self) {
        let handles: Vec<JoinHandle<()>> = {
            let mut detached = self.detached.lock().await;
            detached.drain(..).collect()
        };
        debug!("Draining {} background task(s)", handles.len());
        for handle in handles {
            let _ = handle.await;
        }
        self.semaphore.close();
    }
}
