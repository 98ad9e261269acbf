//! Record-level file operations for one owner at a time.
//!
//! The library never touches file bytes; it manages the metadata records
//! and hands new uploads to the tagging queue.

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;

use crate::db::{file_repo, Database, DatabaseError};
use crate::error::LibraryError;
use crate::queue::{tagging_cache_key, JobDescriptor, QueueStore, TAGS_FIELD};
use crate::record::{FileRecord, TaggingStatus};
use crate::worker::{EnqueueOutcome, JobEnqueuer};

/// Metadata for an upload whose bytes are already stored.
#[derive(Debug, Clone)]
pub struct NewUpload {
    pub file_name: String,
    pub file_path: String,
    pub mime_type: Option<String>,
    pub size: u64,
    pub owner_id: String,
}

/// Result of registering an upload.
#[derive(Debug, Clone)]
pub struct UploadReceipt {
    pub record: FileRecord,
    /// The upload succeeds even when this is degraded.
    pub enqueue: EnqueueOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagStatus {
    pub status: TaggingStatus,
    pub tags: Vec<String>,
}

pub struct FileLibrary {
    db: Database,
    enqueuer: JobEnqueuer,
    cache: Arc<dyn QueueStore>,
    share_base_url: String,
}

impl FileLibrary {
    pub fn new(db: Database, queue: Arc<dyn QueueStore>) -> Self {
        Self {
            db,
            enqueuer: JobEnqueuer::new(Arc::clone(&queue)),
            cache: queue,
            share_base_url: "http://localhost:5000".to_string(),
        }
    }

    pub fn with_queue_key(mut self, queue_key: impl Into<String>) -> Self {
        self.enqueuer = JobEnqueuer::with_queue_key(Arc::clone(&self.cache), queue_key);
        self
    }

    pub fn with_share_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.share_base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn enqueuer(&self) -> &JobEnqueuer {
        &self.enqueuer
    }

    /// Persists a new, untagged record and queues its tagging job.
    ///
    /// Fails only if the record cannot be stored. A queue failure is
    /// reported through [`UploadReceipt::enqueue`].
    pub async fn register_upload(&self, upload: NewUpload) -> Result<UploadReceipt, LibraryError> {
        let file_name = upload.file_name.trim();
        if file_name.is_empty() {
            return Err(LibraryError::InvalidUpload("file name is empty".to_string()));
        }
        if upload.file_path.trim().is_empty() {
            return Err(LibraryError::InvalidUpload("file path is empty".to_string()));
        }
        if upload.owner_id.trim().is_empty() {
            return Err(LibraryError::InvalidUpload("owner is empty".to_string()));
        }

        let record = FileRecord::new(
            file_name,
            upload.file_path,
            upload.mime_type,
            upload.size,
            upload.owner_id,
        );

        let row = file_repo::FileRow::from_record(&record)?;
        self.db.call(move |db| file_repo::insert(db, &row)).await?;
        log::info!("Registered upload {} ({})", record.file_name, record.id);

        let enqueue = self.enqueuer.enqueue_after_upload(&record).await;
        Ok(UploadReceipt { record, enqueue })
    }

    /// All of an owner's files, newest first.
    pub async fn list_files(&self, owner_id: &str) -> Result<Vec<FileRecord>, LibraryError> {
        let owner_id = owner_id.to_string();
        let rows = self
            .db
            .call(move |db| file_repo::list_by_owner(db, &owner_id))
            .await?;
        Ok(into_records(rows)?)
    }

    /// An owner's files that are still waiting for tags.
    pub async fn pending_files(&self, owner_id: &str) -> Result<Vec<FileRecord>, LibraryError> {
        let owner_id = owner_id.to_string();
        let rows = self
            .db
            .call(move |db| file_repo::list_pending_by_owner(db, &owner_id))
            .await?;
        Ok(into_records(rows)?)
    }

    pub async fn get_file(&self, owner_id: &str, id: &str) -> Result<FileRecord, LibraryError> {
        let id_owned = id.to_string();
        let row = self
            .db
            .call(move |db| file_repo::find_by_id(db, &id_owned))
            .await?;

        match row {
            Some(row) if row.owner_id == owner_id => Ok(row.into_record()?),
            _ => Err(LibraryError::NotFound(id.to_string())),
        }
    }

    pub async fn find_by_path(
        &self,
        owner_id: &str,
        file_path: &str,
    ) -> Result<Option<FileRecord>, LibraryError> {
        let owner_id = owner_id.to_string();
        let file_path = file_path.to_string();
        let row = self
            .db
            .call(move |db| file_repo::find_by_owner_and_path(db, &owner_id, &file_path))
            .await?;
        Ok(row.map(|r| r.into_record()).transpose()?)
    }

    /// Changes the display name. The stored path and tags are untouched.
    pub async fn rename_file(
        &self,
        owner_id: &str,
        id: &str,
        new_name: &str,
    ) -> Result<FileRecord, LibraryError> {
        let new_name = new_name.trim();
        if new_name.is_empty() {
            return Err(LibraryError::EmptyName);
        }

        let owner = owner_id.to_string();
        let id_owned = id.to_string();
        let name = new_name.to_string();
        let updated = self
            .db
            .call(move |db| file_repo::rename_for_owner(db, &owner, &id_owned, &name))
            .await?;

        if !updated {
            return Err(LibraryError::NotFound(id.to_string()));
        }
        self.get_file(owner_id, id).await
    }

    /// Removes the record. Any cached tags for it are left behind.
    pub async fn delete_file(&self, owner_id: &str, id: &str) -> Result<(), LibraryError> {
        let owner = owner_id.to_string();
        let id_owned = id.to_string();
        let removed = self
            .db
            .call(move |db| file_repo::delete_for_owner(db, &owner, &id_owned))
            .await?;

        if !removed {
            return Err(LibraryError::NotFound(id.to_string()));
        }
        log::info!("Deleted file {}", id);
        Ok(())
    }

    /// Public link for a file: `{share_base_url}/uploads/{basename}`.
    pub async fn share_url(&self, owner_id: &str, id: &str) -> Result<String, LibraryError> {
        let record = self.get_file(owner_id, id).await?;
        let basename = Path::new(&record.file_path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| LibraryError::NotFound(id.to_string()))?;
        Ok(format!("{}/uploads/{}", self.share_base_url, basename))
    }

    /// Tagging state as recorded in the result store.
    pub async fn tag_status(&self, owner_id: &str, id: &str) -> Result<TagStatus, LibraryError> {
        let record = self.get_file(owner_id, id).await?;
        Ok(TagStatus {
            status: record.tagging_status(),
            tags: record.ai_tags,
        })
    }

    /// Reads the cached tags for a file, if any.
    ///
    /// Cache failures and unreadable entries are logged and reported as
    /// absent; the result store stays the source of truth.
    pub async fn cached_tags(&self, id: &str) -> Option<Vec<String>> {
        let raw = match self.cache.hash_get(&tagging_cache_key(id), TAGS_FIELD).await {
            Ok(raw) => raw?,
            Err(e) => {
                log::warn!("Failed to read cached tags for {}: {}", id, e);
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(tags) => Some(tags),
            Err(e) => {
                log::warn!("Ignoring unreadable cached tags for {}: {}", id, e);
                None
            }
        }
    }

    /// Pushes a fresh tagging job for an existing record, whoever owns it.
    pub async fn requeue(&self, id: &str) -> Result<JobDescriptor, LibraryError> {
        let id_owned = id.to_string();
        let row = self
            .db
            .call(move |db| file_repo::find_by_id(db, &id_owned))
            .await?
            .ok_or_else(|| LibraryError::NotFound(id.to_string()))?;

        let record = row.into_record()?;
        Ok(self.enqueuer.enqueue(&record).await?)
    }
}

fn into_records(rows: Vec<file_repo::FileRow>) -> Result<Vec<FileRecord>, DatabaseError> {
    rows.into_iter().map(file_repo::FileRow::into_record).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::{MemoryQueueStore, TAGGING_QUEUE_KEY};
    use crate::store::{ResultStore, SqliteResultStore};
    use crate::worker::TaggingProcessor;

    fn setup() -> (FileLibrary, Arc<MemoryQueueStore>) {
        let queue = Arc::new(MemoryQueueStore::new());
        let db = Database::open_in_memory().unwrap();
        let library = FileLibrary::new(db, queue.clone())
            .with_share_base_url("https://files.example.com/");
        (library, queue)
    }

    fn upload(name: &str, owner: &str) -> NewUpload {
        NewUpload {
            file_name: name.to_string(),
            file_path: format!("/srv/uploads/1700000000000-{}", name),
            mime_type: None,
            size: 42,
            owner_id: owner.to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_upload_persists_and_enqueues() {
        let (library, queue) = setup();
        let receipt = library.register_upload(upload("report.pdf", "u1")).await.unwrap();

        assert!(receipt.enqueue.is_queued());
        assert!(receipt.record.ai_tags.is_empty());
        assert_eq!(receipt.record.mime_type.as_deref(), Some("application/pdf"));

        let entries = queue.list_snapshot(TAGGING_QUEUE_KEY);
        assert_eq!(entries.len(), 1);
        let job = JobDescriptor::from_json(&entries[0]).unwrap();
        assert_eq!(job.file_id, receipt.record.id);
        assert_eq!(job.file_path, receipt.record.file_path);

        let stored = library.get_file("u1", &receipt.record.id).await.unwrap();
        assert_eq!(stored.tagging_status(), TaggingStatus::Pending);
    }

    #[tokio::test]
    async fn test_register_upload_survives_queue_outage() {
        let (library, queue) = setup();
        queue.close();

        let receipt = library.register_upload(upload("a.txt", "u1")).await.unwrap();
        assert!(!receipt.enqueue.is_queued());
        assert!(library.get_file("u1", &receipt.record.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_register_upload_validates_input() {
        let (library, queue) = setup();
        let mut bad = upload("a.txt", "u1");
        bad.file_name = "  ".to_string();
        assert!(matches!(
            library.register_upload(bad).await,
            Err(LibraryError::InvalidUpload(_))
        ));

        let mut bad = upload("a.txt", "u1");
        bad.file_path = String::new();
        assert!(library.register_upload(bad).await.is_err());
        assert!(queue.list_snapshot(TAGGING_QUEUE_KEY).is_empty());
    }

    #[tokio::test]
    async fn test_list_and_pending_are_owner_scoped() {
        let (library, _queue) = setup();
        let a = library.register_upload(upload("a.txt", "u1")).await.unwrap();
        library.register_upload(upload("b.txt", "u2")).await.unwrap();

        let files = library.list_files("u1").await.unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].id, a.record.id);

        let mut tagged = a.record.clone();
        tagged.ai_tags = vec!["AI".to_string()];
        let row = file_repo::FileRow::from_record(&tagged).unwrap();
        file_repo::save(library.database(), &row).unwrap();

        assert!(library.pending_files("u1").await.unwrap().is_empty());
        assert_eq!(library.pending_files("u2").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_rename_changes_display_name_only() {
        let (library, _queue) = setup();
        let receipt = library.register_upload(upload("a.txt", "u1")).await.unwrap();

        let renamed = library
            .rename_file("u1", &receipt.record.id, "  notes.txt ")
            .await
            .unwrap();
        assert_eq!(renamed.file_name, "notes.txt");
        assert_eq!(renamed.file_path, receipt.record.file_path);

        assert!(matches!(
            library.rename_file("u1", &receipt.record.id, "   ").await,
            Err(LibraryError::EmptyName)
        ));
        assert!(matches!(
            library.rename_file("u2", &receipt.record.id, "x.txt").await,
            Err(LibraryError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_rename_keeps_tags_written_by_worker() {
        let (library, _queue) = setup();
        let receipt = library.register_upload(upload("a.pdf", "u1")).await.unwrap();
        let id = receipt.record.id.clone();

        let store = SqliteResultStore::new(library.database().clone());
        let mut tagged = store.find_by_id(&id).await.unwrap().unwrap();
        tagged.ai_tags = vec!["AI".into(), "Processed".into(), "pdf".into()];
        store.save(&tagged).await.unwrap();

        let renamed = library.rename_file("u1", &id, "renamed.pdf").await.unwrap();
        assert_eq!(renamed.file_name, "renamed.pdf");
        assert_eq!(renamed.ai_tags, vec!["AI", "Processed", "pdf"]);

        let status = library.tag_status("u1", &id).await.unwrap();
        assert_eq!(status.status, TaggingStatus::Tagged);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_rename_racing_processor_never_drops_tags() {
        let (library, queue) = setup();
        let store = Arc::new(SqliteResultStore::new(library.database().clone()));
        let processor = TaggingProcessor::new(store, queue.clone())
            .with_simulated_latency(std::time::Duration::ZERO);

        for _ in 0..100 {
            let receipt = library.register_upload(upload("a.pdf", "u1")).await.unwrap();
            let id = receipt.record.id.clone();
            let job = JobDescriptor::for_record(&receipt.record).unwrap();

            let (processed, renamed) = tokio::join!(
                processor.process(&job),
                library.rename_file("u1", &id, "renamed.pdf")
            );
            processed.unwrap();
            renamed.unwrap();

            let status = library.tag_status("u1", &id).await.unwrap();
            assert_eq!(status.tags, vec!["AI", "Processed", "pdf"]);
        }
        assert!(library.pending_files("u1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_leaves_cache_entry() {
        let (library, queue) = setup();
        let receipt = library.register_upload(upload("a.txt", "u1")).await.unwrap();
        let id = receipt.record.id.clone();
        queue
            .hash_set(&tagging_cache_key(&id), &[(TAGS_FIELD, r#"["AI","Processed","txt"]"#)])
            .await
            .unwrap();

        assert!(matches!(
            library.delete_file("u2", &id).await,
            Err(LibraryError::NotFound(_))
        ));
        library.delete_file("u1", &id).await.unwrap();

        assert!(matches!(
            library.get_file("u1", &id).await,
            Err(LibraryError::NotFound(_))
        ));
        assert_eq!(
            library.cached_tags(&id).await,
            Some(vec!["AI".to_string(), "Processed".to_string(), "txt".to_string()])
        );
    }

    #[tokio::test]
    async fn test_share_url_uses_basename() {
        let (library, _queue) = setup();
        let receipt = library.register_upload(upload("a b.pdf", "u1")).await.unwrap();

        let url = library.share_url("u1", &receipt.record.id).await.unwrap();
        assert_eq!(
            url,
            "https://files.example.com/uploads/1700000000000-a b.pdf"
        );
    }

    #[tokio::test]
    async fn test_tag_status_reads_result_store() {
        let (library, _queue) = setup();
        let receipt = library.register_upload(upload("a.png", "u1")).await.unwrap();

        let status = library.tag_status("u1", &receipt.record.id).await.unwrap();
        assert_eq!(status.status, TaggingStatus::Pending);
        assert!(status.tags.is_empty());
    }

    #[tokio::test]
    async fn test_cached_tags_missing_or_unreadable() {
        let (library, queue) = setup();
        assert!(library.cached_tags("nope").await.is_none());

        queue
            .hash_set(&tagging_cache_key("bad"), &[(TAGS_FIELD, "not json")])
            .await
            .unwrap();
        assert!(library.cached_tags("bad").await.is_none());

        queue.close();
        assert!(library.cached_tags("nope").await.is_none());
    }

    #[tokio::test]
    async fn test_requeue_pushes_another_job() {
        let (library, queue) = setup();
        let receipt = library.register_upload(upload("a.txt", "u1")).await.unwrap();

        let job = library.requeue(&receipt.record.id).await.unwrap();
        assert_eq!(job.file_id, receipt.record.id);
        assert_eq!(queue.list_snapshot(TAGGING_QUEUE_KEY).len(), 2);

        assert!(matches!(
            library.requeue("missing").await,
            Err(LibraryError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_find_by_path() {
        let (library, _queue) = setup();
        let receipt = library.register_upload(upload("a.txt", "u1")).await.unwrap();

        let found = library
            .find_by_path("u1", &receipt.record.file_path)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, receipt.record.id);
        assert!(library
            .find_by_path("u2", &receipt.record.file_path)
            .await
            .unwrap()
            .is_none());
    }
}
