use serde::{Deserialize, Serialize};

use crate::error::QueueError;
use crate::record::FileRecord;

/// A tagging job as it sits on the queue.
///
/// Only the record id and a path hint travel through the queue; the
/// worker re-resolves everything else from the result store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDescriptor {
    pub file_id: String,
    pub file_path: String,
}

impl JobDescriptor {
    pub fn new(file_id: impl Into<String>, file_path: impl Into<String>) -> Self {
        Self {
            file_id: file_id.into(),
            file_path: file_path.into(),
        }
    }

    /// Builds the descriptor for a persisted record.
    ///
    /// Fails when the record has no id or no path, since such a job could
    /// never be matched back to its record.
    pub fn for_record(record: &FileRecord) -> Result<Self, QueueError> {
        let job = Self::new(record.id.clone(), record.file_path.clone());
        job.validate()?;
        Ok(job)
    }

    pub fn to_json(&self) -> Result<String, QueueError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parses a raw queue entry.
    pub fn from_json(raw: &str) -> Result<Self, QueueError> {
        let job: Self = serde_json::from_str(raw)?;
        if job.file_id.trim().is_empty() {
            return Err(QueueError::InvalidJob("fileId is empty".to_string()));
        }
        Ok(job)
    }

    fn validate(&self) -> Result<(), QueueError> {
        if self.file_id.trim().is_empty() {
            return Err(QueueError::InvalidJob("fileId is empty".to_string()));
        }
        if self.file_path.trim().is_empty() {
            return Err(QueueError::InvalidJob(format!(
                "filePath is empty for file {}",
                self.file_id
            )));
        }
        Ok(())
    }
}
