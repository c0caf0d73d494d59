//! Fixed-size background worker pool.
//!
//! # Responsibilities
//! - Accept invocations from any thread without blocking
//! - Run the record processor off the calling thread
//! - Keep running when a single job panics
//! - Drain queued invocations on shutdown
//!
//! # Design Decisions
//! - Unbounded task channel; the dispatcher queue is the only back-pressure
//! - Workers share one receiver; jobs run on tokio's blocking pool since
//!   the writer does blocking file I/O
//! - Shutdown is broadcast; the first worker to see it closes the channel

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::audit::record::Invocation;
use crate::worker::processor::RecordProcessor;

/// Errors returned when handing work to the pool.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("audit pipeline is shut down")]
    Closed,
}

/// Cloneable submission side of the pool.
#[derive(Clone, Debug)]
pub struct PoolHandle {
    tx: mpsc::UnboundedSender<Invocation>,
}

impl PoolHandle {
    /// A handle with no workers behind it; the caller owns the receiving end.
    pub fn detached() -> (Self, mpsc::UnboundedReceiver<Invocation>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Queue an invocation. Never blocks.
    pub fn submit(&self, invocation: Invocation) -> Result<(), PipelineError> {
        self.tx.send(invocation).map_err(|_| PipelineError::Closed)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Owns the worker tasks.
pub struct WorkerPool {
    handle: PoolHandle,
    shutdown: broadcast::Sender<()>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `size` workers on the current tokio runtime.
    pub fn spawn(size: usize, processor: Arc<RecordProcessor>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let rx = Arc::new(Mutex::new(rx));
        let (shutdown, _) = broadcast::channel(1);

        let workers = (0..size.max(1))
            .map(|worker| {
                let span = tracing::info_span!("audit_worker", worker);
                let worker = run_worker(rx.clone(), processor.clone(), shutdown.subscribe());
                tokio::spawn(worker.instrument(span))
            })
            .collect::<Vec<_>>();

        tracing::info!(workers = workers.len(), "Audit worker pool started");

        Self {
            handle: PoolHandle { tx },
            shutdown,
            workers,
        }
    }

    pub fn handle(&self) -> PoolHandle {
        self.handle.clone()
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Stop accepting work, finish everything already queued, and wait.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(());
        for worker in self.workers {
            if let Err(e) = worker.await {
                tracing::error!(error = %e, "Audit worker terminated abnormally");
            }
        }
        tracing::info!("Audit worker pool stopped");
    }
}

async fn run_worker(
    rx: Arc<Mutex<mpsc::UnboundedReceiver<Invocation>>>,
    processor: Arc<RecordProcessor>,
    mut shutdown: broadcast::Receiver<()>,
) {
    loop {
        let next = {
            let mut rx = rx.lock().await;
            tokio::select! {
                biased;
                job = rx.recv() => job,
                _ = shutdown.recv() => {
                    // Closed channels still yield what was queued before close.
                    rx.close();
                    rx.recv().await
                }
            }
        };

        let Some(invocation) = next else {
            break;
        };

        let id = invocation.id;
        let processor = processor.clone();
        if let Err(e) = tokio::task::spawn_blocking(move || processor.process(invocation)).await {
            tracing::error!(id = %id, error = %e, "Audit job panicked, worker continues");
        }
    }
    tracing::debug!("Audit worker exiting");
}
