//! Single-writer worker.
//!
//! redb admits one write transaction at a time and blocks while it waits, so
//! every write runs on one dedicated OS thread that owns a [`RegistryStore`]
//! and drains a bounded job queue. Async callers enqueue a closure and await
//! its result over a oneshot channel; the async scheduler is never blocked.

use std::thread::JoinHandle;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error};

use crate::error::{RegistryResult, StorageError};
use crate::store::RegistryStore;

type Job = Box<dyn FnOnce(&RegistryStore) + Send + 'static>;

pub(crate) struct Writer {
    tx: Option<mpsc::Sender<Job>>,
    thread: Option<JoinHandle<()>>,
}

impl Writer {
    /// Start the writer thread. `queue_depth` bounds the number of pending writes.
    pub(crate) fn spawn(store: RegistryStore, queue_depth: usize) -> RegistryResult<Self> {
        let (tx, mut rx) = mpsc::channel::<Job>(queue_depth.max(1));
        let thread = std::thread::Builder::new()
            .name("drone-registry-writer".to_string())
            .spawn(move || {
                debug!("registry writer started");
                while let Some(job) = rx.blocking_recv() {
                    job(&store);
                }
                debug!("registry writer stopped");
            })
            .map_err(|e| StorageError::Worker(e.to_string()))?;

        Ok(Self {
            tx: Some(tx),
            thread: Some(thread),
        })
    }

    /// Queue `f` behind all earlier writes and wait for its result.
    pub(crate) async fn submit<T, F>(&self, f: F) -> RegistryResult<T>
    where
        F: FnOnce(&RegistryStore) -> RegistryResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let tx = self
            .tx
            .as_ref()
            .ok_or_else(|| StorageError::Worker("registry writer is shut down".to_string()))?;

        let (reply_tx, reply_rx) = oneshot::channel();
        let job: Job = Box::new(move |store| {
            // The caller may have gone away; the write itself still happened.
            let _ = reply_tx.send(f(store));
        });
        tx.send(job)
            .await
            .map_err(|_| StorageError::Worker("registry writer is not running".to_string()))?;

        reply_rx
            .await
            .map_err(|_| StorageError::Worker("registry writer dropped the reply".to_string()))?
    }
}

impl Drop for Writer {
    /// Close the queue and wait for pending writes to drain.
    fn drop(&mut self) {
        self.tx.take();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("registry writer thread panicked");
            }
        }
    }
}
