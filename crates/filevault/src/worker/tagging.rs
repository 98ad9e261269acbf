//! Long-running consumer of the tagging queue.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::watch;

use crate::error::{ProcessError, WorkerError};
use crate::queue::{JobDescriptor, QueueStore, TAGGING_QUEUE_KEY};
use crate::store::ResultStore;
use crate::worker::processor::{ProcessOutcome, TaggingProcessor, DEFAULT_SIMULATED_LATENCY};

/// Lifecycle of a [`JobWorker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Connecting,
    Ready,
    BlockedOnPop,
    Processing,
    Stopped,
}

/// Configuration for the worker loop.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Identifier used in log lines.
    pub worker_id: String,
    /// List key to consume.
    pub queue_key: String,
    /// Longest single wait on the queue before the shutdown flag is
    /// checked again.
    pub poll_interval: Duration,
    /// Upper bound for one job's processing step.
    pub processing_timeout: Duration,
    /// Placeholder analysis time per job.
    pub simulated_latency: Duration,
    /// Stop after this many queue entries (for testing and one-shot runs).
    pub max_jobs: Option<u64>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        let id = uuid::Uuid::new_v4().to_string();
        Self {
            worker_id: format!("worker-{}", &id[..8]),
            queue_key: TAGGING_QUEUE_KEY.to_string(),
            poll_interval: Duration::from_secs(5),
            processing_timeout: Duration::from_secs(30),
            simulated_latency: DEFAULT_SIMULATED_LATENCY,
            max_jobs: None,
        }
    }
}

/// Final statistics from a worker run.
#[derive(Debug, Clone, Default)]
pub struct WorkerStats {
    /// Entries popped from the queue.
    pub received: u64,
    /// Jobs whose record was found and tagged.
    pub tagged: u64,
    /// Jobs whose record no longer existed.
    pub orphaned: u64,
    /// Entries that were not valid job descriptors.
    pub malformed: u64,
    /// Jobs whose processing step failed or timed out.
    pub failed: u64,
    pub duration: Duration,
}

/// Single-consumer worker: pops one job at a time and tags it.
///
/// Several workers, in one process or many, may consume the same queue;
/// the queue's atomic pop is what keeps them from sharing a job.
pub struct JobWorker {
    config: WorkerConfig,
    store: Arc<dyn ResultStore>,
    queue: Arc<dyn QueueStore>,
    processor: TaggingProcessor,
    shutdown: Arc<AtomicBool>,
    state: watch::Sender<WorkerState>,
}

impl JobWorker {
    pub fn new(
        config: WorkerConfig,
        store: Arc<dyn ResultStore>,
        queue: Arc<dyn QueueStore>,
    ) -> Self {
        let processor = TaggingProcessor::new(Arc::clone(&store), Arc::clone(&queue))
            .with_simulated_latency(config.simulated_latency);
        let (state, _) = watch::channel(WorkerState::Connecting);
        Self {
            config,
            store,
            queue,
            processor,
            shutdown: Arc::new(AtomicBool::new(false)),
            state,
        }
    }

    /// Signal shutdown. Takes effect before the next pop.
    pub fn shutdown(&self) {
        log::info!("Worker {} shutting down", self.config.worker_id);
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Shared flag for wiring shutdown to signal handlers.
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }

    pub fn state(&self) -> WorkerState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<WorkerState> {
        self.state.subscribe()
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Runs the worker until shutdown, `max_jobs`, or a queue failure.
    ///
    /// Per-job failures are logged and counted, never returned. Only an
    /// unreachable store at startup or a failed receive ends the run with
    /// an error; the caller is expected to restart the process.
    pub async fn run(&self) -> Result<WorkerStats, WorkerError> {
        let start = Instant::now();
        let mut stats = WorkerStats::default();

        self.set_state(WorkerState::Connecting);
        if let Err(e) = self.connect().await {
            log::error!("Worker {} failed to start: {}", self.config.worker_id, e);
            self.set_state(WorkerState::Stopped);
            return Err(e);
        }
        self.set_state(WorkerState::Ready);
        log::info!(
            "Worker {} consuming '{}'",
            self.config.worker_id,
            self.config.queue_key
        );

        loop {
            if self.is_shutdown() {
                break;
            }

            if let Some(max) = self.config.max_jobs {
                if stats.received >= max {
                    log::info!("Worker {} reached max jobs ({})", self.config.worker_id, max);
                    break;
                }
            }

            self.set_state(WorkerState::BlockedOnPop);
            let popped = self
                .queue
                .blocking_pop_left(&self.config.queue_key, Some(self.config.poll_interval))
                .await;

            match popped {
                Ok(Some(raw)) => {
                    self.set_state(WorkerState::Processing);
                    stats.received += 1;
                    self.handle_entry(&raw, &mut stats).await;
                }
                Ok(None) => continue,
                Err(source) => {
                    log::error!(
                        "Worker {} lost queue connection: {}",
                        self.config.worker_id,
                        source
                    );
                    self.set_state(WorkerState::Stopped);
                    return Err(WorkerError::Receive {
                        queue_key: self.config.queue_key.clone(),
                        source,
                    });
                }
            }
        }

        self.set_state(WorkerState::Stopped);
        stats.duration = start.elapsed();
        log::info!(
            "Worker {} stopped: {} received, {} tagged, {} orphaned, {} malformed, {} failed",
            self.config.worker_id,
            stats.received,
            stats.tagged,
            stats.orphaned,
            stats.malformed,
            stats.failed
        );
        Ok(stats)
    }

    async fn connect(&self) -> Result<(), WorkerError> {
        self.store
            .ping()
            .await
            .map_err(|e| WorkerError::StartupFailed(format!("result store unreachable: {}", e)))?;
        self.queue
            .ping()
            .await
            .map_err(|e| WorkerError::StartupFailed(format!("queue unreachable: {}", e)))?;
        Ok(())
    }

    async fn handle_entry(&self, raw: &str, stats: &mut WorkerStats) {
        let job = match JobDescriptor::from_json(raw) {
            Ok(job) => job,
            Err(e) => {
                log::error!("Dropping malformed job entry {:?}: {}", raw, e);
                stats.malformed += 1;
                return;
            }
        };

        log::info!("Processing tagging job for file {}", job.file_id);

        let result = tokio::time::timeout(
            self.config.processing_timeout,
            self.processor.process(&job),
        )
        .await
        .unwrap_or_else(|_| {
            Err(ProcessError::Timeout {
                file_path: job.file_path.clone(),
                after: self.config.processing_timeout,
            })
        });

        match result {
            Ok(ProcessOutcome::Tagged { .. }) => stats.tagged += 1,
            Ok(ProcessOutcome::Orphaned { .. }) => stats.orphaned += 1,
            Err(e) => {
                log::error!("Error processing {}: {}", job.file_path, e);
                stats.failed += 1;
            }
        }
    }

    fn set_state(&self, state: WorkerState) {
        self.state.send_replace(state);
    }
}
