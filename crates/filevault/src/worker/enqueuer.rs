use std::sync::Arc;

use crate::error::QueueError;
use crate::queue::{JobDescriptor, QueueStore, TAGGING_QUEUE_KEY};
use crate::record::FileRecord;

/// What happened to the tagging job of a freshly stored upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// The job is on the queue.
    Queued(JobDescriptor),
    /// The upload is stored but its job could not be queued; tags will not
    /// appear until the file is re-enqueued.
    Degraded { reason: String },
}

impl EnqueueOutcome {
    pub fn is_queued(&self) -> bool {
        matches!(self, EnqueueOutcome::Queued(_))
    }
}

/// Pushes tagging jobs for persisted file records.
#[derive(Clone)]
pub struct JobEnqueuer {
    queue: Arc<dyn QueueStore>,
    queue_key: String,
}

impl JobEnqueuer {
    pub fn new(queue: Arc<dyn QueueStore>) -> Self {
        Self::with_queue_key(queue, TAGGING_QUEUE_KEY)
    }

    pub fn with_queue_key(queue: Arc<dyn QueueStore>, queue_key: impl Into<String>) -> Self {
        Self {
            queue,
            queue_key: queue_key.into(),
        }
    }

    pub fn queue_key(&self) -> &str {
        &self.queue_key
    }

    /// Appends one job for `record` to the tail of the queue.
    ///
    /// The record must already be persisted with a non-empty id and path.
    /// Every call pushes; duplicates are not collapsed.
    pub async fn enqueue(&self, record: &FileRecord) -> Result<JobDescriptor, QueueError> {
        let job = JobDescriptor::for_record(record)?;
        self.queue.push_right(&self.queue_key, &job.to_json()?).await?;
        log::debug!("Queued tagging job for file {} ({})", job.file_id, job.file_path);
        Ok(job)
    }

    /// Enqueues after a successful upload without ever failing the upload.
    pub async fn enqueue_after_upload(&self, record: &FileRecord) -> EnqueueOutcome {
        match self.enqueue(record).await {
            Ok(job) => EnqueueOutcome::Queued(job),
            Err(e) => {
                log::error!(
                    "Failed to queue tagging job for file {} ({}): {}",
                    record.id,
                    record.file_path,
                    e
                );
                EnqueueOutcome::Degraded {
                    reason: e.to_string(),
                }
            }
        }
    }
}
