use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::ResultStore;
use crate::db::DatabaseError;
use crate::record::FileRecord;

/// In-process [`ResultStore`], used by tests and embedded setups.
#[derive(Default)]
pub struct MemoryResultStore {
    records: Mutex<HashMap<String, FileRecord>>,
}

impl MemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: impl IntoIterator<Item = FileRecord>) -> Self {
        let records = records.into_iter().map(|r| (r.id.clone(), r)).collect();
        Self {
            records: Mutex::new(records),
        }
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Synchronous snapshot of one record.
    pub fn get(&self, id: &str) -> Option<FileRecord> {
        self.records.lock().ok()?.get(id).cloned()
    }
}

#[async_trait]
impl ResultStore for MemoryResultStore {
    async fn ping(&self) -> Result<(), DatabaseError> {
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<FileRecord>, DatabaseError> {
        let records = self.records.lock().map_err(|_| DatabaseError::LockPoisoned)?;
        Ok(records.get(id).cloned())
    }

    async fn save(&self, record: &FileRecord) -> Result<FileRecord, DatabaseError> {
        let mut records = self.records.lock().map_err(|_| DatabaseError::LockPoisoned)?;
        records.insert(record.id.clone(), record.clone());
        Ok(record.clone())
    }
}
