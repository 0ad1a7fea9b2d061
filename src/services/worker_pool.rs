//! Batching worker pool.
//!
//! A fixed number of worker tasks read identifiers from one shared bounded
//! queue. Each worker owns a [`BatchAssembler`] and hands full or idle batches
//! to a [`BatchSink`]:
//! - Flush when the batch reaches capacity
//! - Flush a non-empty batch when no identifier arrives within the idle window
//! - Flush the remainder and stop when every producer is gone
//!
//! The first sink error stops the pool.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::domain::errors::{PipelineError, PipelineResult};
use crate::domain::models::Identifier;
use crate::services::batch_assembler::{BatchAssembler, FlushTrigger};

/// Default idle window before a partial batch is flushed.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(5);

/// Destination of flushed batches.
#[async_trait]
pub trait BatchSink: Send + Sync {
    /// Process one batch. An error is fatal to the calling worker.
    async fn flush(&self, batch: &[Identifier], trigger: FlushTrigger) -> PipelineResult<()>;
}

/// Producer side of the worker input queue.
pub type IdentifierSender = mpsc::Sender<Identifier>;

/// Consumer side of the worker input queue, shared by every worker.
#[derive(Clone)]
pub struct IdentifierQueue {
    rx: Arc<Mutex<mpsc::Receiver<Identifier>>>,
}

impl IdentifierQueue {
    /// Wait for the next identifier; `None` once every sender is dropped
    /// and the queue is drained.
    pub async fn recv(&self) -> Option<Identifier> {
        self.rx.lock().await.recv().await
    }
}

/// Create the bounded queue between a producer and the workers.
pub fn identifier_queue(capacity: usize) -> (IdentifierSender, IdentifierQueue) {
    let (tx, rx) = mpsc::channel(capacity);
    (
        tx,
        IdentifierQueue {
            rx: Arc::new(Mutex::new(rx)),
        },
    )
}

/// Counters kept by one worker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerStats {
    /// Identifiers received
    pub records: u64,
    /// Batches flushed
    pub flushes: u64,
}

/// Worker pool settings.
#[derive(Debug, Clone)]
pub struct WorkerPoolConfig {
    /// Number of workers
    pub workers: usize,
    /// Batch capacity per worker
    pub batch_capacity: usize,
    /// Idle window before a partial batch is flushed
    pub idle_timeout: Duration,
    /// Log progress every this many records (0 disables)
    pub progress_interval: u64,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            batch_capacity: 10,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            progress_interval: 1000,
        }
    }
}

/// Pool of batching workers.
pub struct WorkerPool {
    config: WorkerPoolConfig,
    sink: Arc<dyn BatchSink>,
}

impl WorkerPool {
    /// Create a pool flushing into `sink`.
    pub fn new(config: WorkerPoolConfig, sink: Arc<dyn BatchSink>) -> Self {
        Self { config, sink }
    }

    /// Run the workers until the input closes or one of them fails.
    ///
    /// On the first failure the remaining workers are aborted and the
    /// error is returned.
    pub async fn run(self, input: IdentifierQueue) -> PipelineResult<WorkerStats> {
        let mut workers = JoinSet::new();

        for worker_id in 1..=self.config.workers {
            let worker = Worker {
                id: worker_id,
                input: input.clone(),
                assembler: BatchAssembler::new(self.config.batch_capacity),
                sink: self.sink.clone(),
                idle_timeout: self.config.idle_timeout,
                progress_interval: self.config.progress_interval,
                stats: WorkerStats::default(),
                since_idle: 0,
            };
            workers.spawn(async move { (worker_id, worker.run().await) });
        }
        drop(input);

        info!(workers = self.config.workers, capacity = self.config.batch_capacity, "worker pool started");

        let mut total = WorkerStats::default();
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok((_, Ok(stats))) => {
                    total.records += stats.records;
                    total.flushes += stats.flushes;
                }
                Ok((worker, Err(err))) => {
                    error!(worker, error = %err, "worker failed, stopping pool");
                    workers.abort_all();
                    return Err(err);
                }
                Err(join_err) => {
                    error!(error = %join_err, "worker task aborted");
                    workers.abort_all();
                    return Err(PipelineError::WorkerAborted(join_err.to_string()));
                }
            }
        }

        info!(records = total.records, flushes = total.flushes, "worker pool finished");
        Ok(total)
    }
}

/// What woke a worker up.
enum Wakeup {
    Item(Identifier),
    Closed,
    Idle,
}

struct Worker {
    id: usize,
    input: IdentifierQueue,
    assembler: BatchAssembler,
    sink: Arc<dyn BatchSink>,
    idle_timeout: Duration,
    progress_interval: u64,
    stats: WorkerStats,
    since_idle: u64,
}

impl Worker {
    async fn run(mut self) -> PipelineResult<WorkerStats> {
        debug!(worker = self.id, "worker started");

        loop {
            // The sleep is recreated every iteration, so the idle window
            // restarts after every append and every flush.
            let wakeup = tokio::select! {
                item = self.input.recv() => match item {
                    Some(id) => Wakeup::Item(id),
                    None => Wakeup::Closed,
                },
                () = sleep(self.idle_timeout) => Wakeup::Idle,
            };

            match wakeup {
                Wakeup::Item(id) => {
                    self.stats.records += 1;
                    self.since_idle += 1;

                    if self.assembler.push(id) {
                        self.flush(FlushTrigger::Capacity).await?;
                    }

                    if self.progress_interval != 0 && self.since_idle % self.progress_interval == 0 {
                        info!(worker = self.id, processed = self.since_idle, "worker progress");
                    }
                }
                Wakeup::Idle => {
                    if !self.assembler.is_empty() {
                        self.flush(FlushTrigger::IdleTimeout).await?;
                        info!(worker = self.id, processed = self.since_idle, "worker processed records (flushing)");
                    }
                    self.since_idle = 0;
                }
                Wakeup::Closed => {
                    if !self.assembler.is_empty() {
                        self.flush(FlushTrigger::InputClosed).await?;
                    }
                    debug!(worker = self.id, records = self.stats.records, "input closed, worker exiting");
                    return Ok(self.stats);
                }
            }
        }
    }

    /// Hand the pending batch to the sink and clear it, whatever the outcome.
    async fn flush(&mut self, trigger: FlushTrigger) -> PipelineResult<()> {
        debug!(worker = self.id, size = self.assembler.len(), %trigger, "flushing batch");

        let result = self.sink.flush(self.assembler.pending(), trigger).await;
        self.assembler.clear();
        self.stats.flushes += 1;
        result
    }
}
