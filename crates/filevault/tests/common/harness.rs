//! Test harness for isolated worker runs.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tempfile::TempDir;

use filevault::db::{file_repo, Database, DatabaseError};
use filevault::queue::{tagging_cache_key, TAGGING_QUEUE_KEY, TAGS_FIELD};
use filevault::{
    FileLibrary, FileRecord, JobWorker, MemoryQueueStore, QueueStore, ResultStore,
    SqliteResultStore, WorkerConfig, WorkerStats,
};

/// Result store that remembers the order in which ids were looked up.
pub struct RecordingStore {
    inner: SqliteResultStore,
    lookups: Mutex<Vec<String>>,
}

impl RecordingStore {
    pub fn new(inner: SqliteResultStore) -> Self {
        Self {
            inner,
            lookups: Mutex::new(Vec::new()),
        }
    }

    pub fn lookups(&self) -> Vec<String> {
        self.lookups.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl ResultStore for RecordingStore {
    async fn ping(&self) -> Result<(), DatabaseError> {
        self.inner.ping().await
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<FileRecord>, DatabaseError> {
        self.lookups.lock().unwrap().push(id.to_string());
        self.inner.find_by_id(id).await
    }

    async fn save(&self, record: &FileRecord) -> Result<FileRecord, DatabaseError> {
        self.inner.save(record).await
    }
}

/// Isolated environment: temp database, in-memory queue, file library.
pub struct TestHarness {
    temp_dir: TempDir,
    pub db: Database,
    pub queue: Arc<MemoryQueueStore>,
    pub store: Arc<RecordingStore>,
    pub library: FileLibrary,
}

impl TestHarness {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db = Database::open(&temp_dir.path().join("data").join("filevault.db"))
            .expect("Failed to open database");
        let queue = Arc::new(MemoryQueueStore::new());
        let store = Arc::new(RecordingStore::new(SqliteResultStore::new(db.clone())));
        let library = FileLibrary::new(db.clone(), queue.clone());

        Self {
            temp_dir,
            db,
            queue,
            store,
            library,
        }
    }

    /// Worker config with no simulated latency and a short poll interval.
    pub fn worker_config(&self, max_jobs: Option<u64>) -> WorkerConfig {
        WorkerConfig {
            poll_interval: Duration::from_millis(20),
            simulated_latency: Duration::ZERO,
            max_jobs,
            ..Default::default()
        }
    }

    pub fn worker(&self, max_jobs: Option<u64>) -> JobWorker {
        JobWorker::new(
            self.worker_config(max_jobs),
            self.store.clone(),
            self.queue.clone(),
        )
    }

    /// Runs a worker until it has taken `jobs` entries off the queue.
    pub async fn run_worker(&self, jobs: u64) -> WorkerStats {
        tokio::time::timeout(Duration::from_secs(10), self.worker(Some(jobs)).run())
            .await
            .expect("worker did not finish")
            .expect("worker failed")
    }

    /// Stores an untagged record with a fixed id.
    pub fn insert_record(&self, id: &str, file_path: &str, owner_id: &str) -> FileRecord {
        let file_name = file_path.rsplit('/').next().unwrap_or(file_path);
        let mut record = FileRecord::new(file_name, file_path, None, 1, owner_id);
        record.id = id.to_string();
        let row = file_repo::FileRow::from_record(&record).unwrap();
        file_repo::insert(&self.db, &row).unwrap();
        record
    }

    pub fn record(&self, id: &str) -> Option<FileRecord> {
        file_repo::find_by_id(&self.db, id)
            .unwrap()
            .map(|row| row.into_record().unwrap())
    }

    pub async fn push_raw(&self, raw: &str) {
        self.queue.push_right(TAGGING_QUEUE_KEY, raw).await.unwrap();
    }

    pub async fn push_job(&self, file_id: &str, file_path: &str) {
        let raw = serde_json::json!({ "fileId": file_id, "filePath": file_path }).to_string();
        self.push_raw(&raw).await;
    }

    /// Raw `tags` field of the cache hash for `file_id`.
    pub fn cached_tags_raw(&self, file_id: &str) -> Option<String> {
        self.queue
            .hash_snapshot(&tagging_cache_key(file_id))
            .and_then(|h| h.get(TAGS_FIELD).cloned())
    }

    pub fn queue_len(&self) -> usize {
        self.queue.list_snapshot(TAGGING_QUEUE_KEY).len()
    }
}
