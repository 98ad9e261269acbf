//! Result store: the authoritative home of file records.
//!
//! The tagging worker only needs keyed reads and full-record upserts, so
//! that is all the trait exposes. Listing and deletion live on the
//! SQLite-specific [`crate::library::FileLibrary`].

mod memory;

pub use memory::MemoryResultStore;

use async_trait::async_trait;

use crate::db::{file_repo, Database, DatabaseError};
use crate::record::FileRecord;

/// Keyed read/upsert access to file records.
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Checks that the store is reachable.
    async fn ping(&self) -> Result<(), DatabaseError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<FileRecord>, DatabaseError>;

    /// Writes the whole record, inserting it if the id is unknown.
    async fn save(&self, record: &FileRecord) -> Result<FileRecord, DatabaseError>;
}

/// [`ResultStore`] backed by the SQLite [`Database`].
#[derive(Clone)]
pub struct SqliteResultStore {
    db: Database,
}

impl SqliteResultStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

#[async_trait]
impl ResultStore for SqliteResultStore {
    async fn ping(&self) -> Result<(), DatabaseError> {
        self.db
            .call(|db| {
                db.with_conn(|conn| {
                    conn.query_row("SELECT 1", [], |r| r.get::<_, i64>(0))?;
                    Ok(())
                })
            })
            .await
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<FileRecord>, DatabaseError> {
        let id = id.to_string();
        self.db
            .call(move |db| {
                file_repo::find_by_id(db, &id)?
                    .map(|row| row.into_record())
                    .transpose()
            })
            .await
    }

    async fn save(&self, record: &FileRecord) -> Result<FileRecord, DatabaseError> {
        let row = file_repo::FileRow::from_record(record)?;
        self.db.call(move |db| file_repo::save(db, &row)).await?;
        Ok(record.clone())
    }
}
