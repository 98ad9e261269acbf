//! File repository: CRUD operations for the `files` table.

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Row};

use super::{Database, DatabaseError};
use crate::record::FileRecord;

/// A raw file row from the database.
#[derive(Debug, Clone)]
pub struct FileRow {
    pub id: String,
    pub file_name: String,
    pub file_path: String,
    pub mime_type: Option<String>,
    pub size: i64,
    pub upload_date: String,
    pub owner_id: String,
    /// JSON array of tag strings.
    pub ai_tags: String,
}

impl FileRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            file_name: row.get("file_name")?,
            file_path: row.get("file_path")?,
            mime_type: row.get("mime_type")?,
            size: row.get("size")?,
            upload_date: row.get("upload_date")?,
            owner_id: row.get("owner_id")?,
            ai_tags: row.get("ai_tags")?,
        })
    }

    pub fn from_record(record: &FileRecord) -> Result<Self, DatabaseError> {
        let ai_tags = serde_json::to_string(&record.ai_tags).map_err(|e| DatabaseError::Corrupt {
            id: record.id.clone(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            id: record.id.clone(),
            file_name: record.file_name.clone(),
            file_path: record.file_path.clone(),
            mime_type: record.mime_type.clone(),
            size: i64::try_from(record.size).unwrap_or(i64::MAX),
            // Fixed-width RFC 3339 so lexical order matches chronological order.
            upload_date: record
                .upload_date
                .to_rfc3339_opts(SecondsFormat::Micros, true),
            owner_id: record.owner_id.clone(),
            ai_tags,
        })
    }

    pub fn into_record(self) -> Result<FileRecord, DatabaseError> {
        let ai_tags: Vec<String> =
            serde_json::from_str(&self.ai_tags).map_err(|e| DatabaseError::Corrupt {
                id: self.id.clone(),
                reason: format!("ai_tags: {}", e),
            })?;
        let upload_date = DateTime::parse_from_rfc3339(&self.upload_date)
            .map_err(|e| DatabaseError::Corrupt {
                id: self.id.clone(),
                reason: format!("upload_date: {}", e),
            })?
            .with_timezone(&Utc);
        Ok(FileRecord {
            id: self.id,
            file_name: self.file_name,
            file_path: self.file_path,
            mime_type: self.mime_type,
            size: u64::try_from(self.size).unwrap_or(0),
            upload_date,
            owner_id: self.owner_id,
            ai_tags,
        })
    }
}

/// Inserts a new file row.
pub fn insert(db: &Database, file: &FileRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO files (id, file_name, file_path, mime_type, size, upload_date,
             owner_id, ai_tags)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                file.id,
                file.file_name,
                file.file_path,
                file.mime_type,
                file.size,
                file.upload_date,
                file.owner_id,
                file.ai_tags,
            ],
        )?;
        Ok(())
    })
}

/// Writes the full row, inserting it if the id is unknown.
pub fn save(db: &Database, file: &FileRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO files (id, file_name, file_path, mime_type, size, upload_date,
             owner_id, ai_tags)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(id) DO UPDATE SET
               file_name = excluded.file_name,
               file_path = excluded.file_path,
               mime_type = excluded.mime_type,
               size = excluded.size,
               upload_date = excluded.upload_date,
               owner_id = excluded.owner_id,
               ai_tags = excluded.ai_tags",
            params![
                file.id,
                file.file_name,
                file.file_path,
                file.mime_type,
                file.size,
                file.upload_date,
                file.owner_id,
                file.ai_tags,
            ],
        )?;
        Ok(())
    })
}

/// Finds a file by its ID.
pub fn find_by_id(db: &Database, id: &str) -> Result<Option<FileRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM files WHERE id = ?1")?;
        let mut rows = stmt.query_map(params![id], FileRow::from_row)?;
        match rows.next() {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })
}

/// Lists an owner's files, newest upload first.
pub fn list_by_owner(db: &Database, owner_id: &str) -> Result<Vec<FileRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT * FROM files WHERE owner_id = ?1 ORDER BY upload_date DESC, id ASC",
        )?;
        let rows = stmt
            .query_map(params![owner_id], FileRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Lists an owner's files that have not been tagged yet, newest first.
pub fn list_pending_by_owner(
    db: &Database,
    owner_id: &str,
) -> Result<Vec<FileRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT * FROM files WHERE owner_id = ?1 AND ai_tags = '[]'
             ORDER BY upload_date DESC, id ASC",
        )?;
        let rows = stmt
            .query_map(params![owner_id], FileRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Finds an owner's file by its stored path.
pub fn find_by_owner_and_path(
    db: &Database,
    owner_id: &str,
    file_path: &str,
) -> Result<Option<FileRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT * FROM files WHERE owner_id = ?1 AND file_path = ?2
             ORDER BY upload_date DESC LIMIT 1",
        )?;
        let mut rows = stmt.query_map(params![owner_id, file_path], FileRow::from_row)?;
        match rows.next() {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })
}

/// Sets the display name of a file owned by `owner_id`, leaving every other
/// column as stored. Returns whether a row was updated.
pub fn rename_for_owner(
    db: &Database,
    owner_id: &str,
    id: &str,
    new_name: &str,
) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let updated = conn.execute(
            "UPDATE files SET file_name = ?1 WHERE id = ?2 AND owner_id = ?3",
            params![new_name, id, owner_id],
        )?;
        Ok(updated > 0)
    })
}

/// Deletes a file owned by `owner_id`. Returns whether a row was removed.
pub fn delete_for_owner(db: &Database, owner_id: &str, id: &str) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let removed = conn.execute(
            "DELETE FROM files WHERE id = ?1 AND owner_id = ?2",
            params![id, owner_id],
        )?;
        Ok(removed > 0)
    })
}
