//! The tagging step run for each job, and its write-back to both stores.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::Instrument;

use crate::error::ProcessError;
use crate::queue::{tagging_cache_key, JobDescriptor, QueueStore, TAGS_FIELD};
use crate::store::ResultStore;

/// Labels every processed file receives ahead of its extension.
pub const BASE_TAGS: [&str; 2] = ["AI", "Processed"];

/// Stand-in for real analysis time.
pub const DEFAULT_SIMULATED_LATENCY: Duration = Duration::from_secs(2);

/// Derives the tag list for a file from its path alone.
///
/// Returns `["AI", "Processed", <extension>]`; the extension is taken
/// from the last path component without its dot and left as written.
/// Files without an extension get only the base labels.
pub fn derive_tags(file_path: &str) -> Vec<String> {
    let mut tags: Vec<String> = BASE_TAGS.iter().map(|t| t.to_string()).collect();
    if let Some(ext) = Path::new(file_path)
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .filter(|e| !e.is_empty())
    {
        tags.push(ext);
    }
    tags
}

/// Result of a job that ran to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// The record was found and its tags were saved.
    Tagged { tags: Vec<String> },
    /// No record exists for the job; only the cache entry was written.
    Orphaned { tags: Vec<String> },
}

impl ProcessOutcome {
    pub fn tags(&self) -> &[String] {
        match self {
            ProcessOutcome::Tagged { tags } | ProcessOutcome::Orphaned { tags } => tags,
        }
    }
}

/// Runs the tagging step and writes results to the store and the cache.
#[derive(Clone)]
pub struct TaggingProcessor {
    store: Arc<dyn ResultStore>,
    cache: Arc<dyn QueueStore>,
    simulated_latency: Duration,
}

impl TaggingProcessor {
    pub fn new(store: Arc<dyn ResultStore>, cache: Arc<dyn QueueStore>) -> Self {
        Self {
            store,
            cache,
            simulated_latency: DEFAULT_SIMULATED_LATENCY,
        }
    }

    pub fn with_simulated_latency(mut self, latency: Duration) -> Self {
        self.simulated_latency = latency;
        self
    }

    /// Tags one file.
    ///
    /// The record update and the cache write are independent: a missing
    /// record still gets a cache entry, and a crash between the two leaves
    /// them out of step. The result store is the one to trust.
    pub async fn process(&self, job: &JobDescriptor) -> Result<ProcessOutcome, ProcessError> {
        let span = tracing::info_span!("tagging.process", file_id = %job.file_id);
        self.process_inner(job).instrument(span).await
    }

    async fn process_inner(&self, job: &JobDescriptor) -> Result<ProcessOutcome, ProcessError> {
        log::info!("Starting tagging for {}", job.file_path);
        if !self.simulated_latency.is_zero() {
            tokio::time::sleep(self.simulated_latency).await;
        }

        let tags = derive_tags(&job.file_path);

        let found = self
            .store
            .find_by_id(&job.file_id)
            .await
            .map_err(|source| ProcessError::Store {
                file_path: job.file_path.clone(),
                source,
            })?;

        let outcome = match found {
            Some(mut record) => {
                record.ai_tags = tags.clone();
                self.store
                    .save(&record)
                    .await
                    .map_err(|source| ProcessError::Store {
                        file_path: job.file_path.clone(),
                        source,
                    })?;
                log::info!("Updated tags for file {} ({})", record.file_name, record.id);
                ProcessOutcome::Tagged { tags }
            }
            None => {
                log::warn!("File {} not found in result store", job.file_id);
                ProcessOutcome::Orphaned { tags }
            }
        };

        let tags_json = serde_json::to_string(outcome.tags()).map_err(|e| ProcessError::Cache {
            file_path: job.file_path.clone(),
            source: e.into(),
        })?;
        self.cache
            .hash_set(&tagging_cache_key(&job.file_id), &[(TAGS_FIELD, tags_json.as_str())])
            .await
            .map_err(|source| ProcessError::Cache {
                file_path: job.file_path.clone(),
                source,
            })?;

        log::info!("Finished tagging {}: {:?}", job.file_path, outcome.tags());
        Ok(outcome)
    }
}
