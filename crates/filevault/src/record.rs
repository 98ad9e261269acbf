//! File metadata records as held by the result store.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata for one uploaded file.
///
/// Field names on the wire follow the public file API (`_id`, `fileName`,
/// `ai_tags`, ...), so serialized records can be handed to clients as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    #[serde(rename = "_id")]
    pub id: String,
    pub file_name: String,
    pub file_path: String,
    pub mime_type: Option<String>,
    pub size: u64,
    pub upload_date: DateTime<Utc>,
    pub owner_id: String,
    /// Empty until the tagging worker has processed the file.
    #[serde(rename = "ai_tags", default)]
    pub ai_tags: Vec<String>,
}

impl FileRecord {
    /// Creates a fresh, untagged record with a generated identifier.
    ///
    /// The MIME type is guessed from `file_name` when not supplied.
    pub fn new(
        file_name: impl Into<String>,
        file_path: impl Into<String>,
        mime_type: Option<String>,
        size: u64,
        owner_id: impl Into<String>,
    ) -> Self {
        let file_name = file_name.into();
        let mime_type = mime_type.or_else(|| Self::detect_mime_type(Path::new(&file_name)));
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            file_name,
            file_path: file_path.into(),
            mime_type,
            size,
            upload_date: Utc::now(),
            owner_id: owner_id.into(),
            ai_tags: Vec::new(),
        }
    }

    pub fn tagging_status(&self) -> TaggingStatus {
        if self.ai_tags.is_empty() {
            TaggingStatus::Pending
        } else {
            TaggingStatus::Tagged
        }
    }

    fn detect_mime_type(path: &Path) -> Option<String> {
        mime_guess::from_path(path).first().map(|m| m.to_string())
    }
}

/// Whether a record has been through the tagging worker yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaggingStatus {
    Pending,
    Tagged,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_is_pending() {
        let record = FileRecord::new("report.pdf", "/u/1/report.pdf", None, 42, "user-1");
        assert!(!record.id.is_empty());
        assert!(record.ai_tags.is_empty());
        assert_eq!(record.tagging_status(), TaggingStatus::Pending);
        assert_eq!(record.mime_type.as_deref(), Some("application/pdf"));
    }

    #[test]
    fn test_explicit_mime_type_wins() {
        let record = FileRecord::new(
            "blob.pdf",
            "/u/1/blob.pdf",
            Some("application/octet-stream".to_string()),
            1,
            "user-1",
        );
        assert_eq!(record.mime_type.as_deref(), Some("application/octet-stream"));
    }

    #[test]
    fn test_unknown_extension_has_no_mime_type() {
        let record = FileRecord::new("notes.xyz123", "/u/1/notes.xyz123", None, 1, "user-1");
        assert!(record.mime_type.is_none());
    }

    #[test]
    fn test_tagged_status() {
        let mut record = FileRecord::new("a.txt", "/u/1/a.txt", None, 1, "user-1");
        record.ai_tags = vec!["AI".to_string()];
        assert_eq!(record.tagging_status(), TaggingStatus::Tagged);
    }

    #[test]
    fn test_serializes_with_api_field_names() {
        let mut record = FileRecord::new("a.pdf", "/u/1/a.pdf", None, 7, "owner");
        record.id = "abc".to_string();
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["_id"], "abc");
        assert_eq!(json["fileName"], "a.pdf");
        assert_eq!(json["filePath"], "/u/1/a.pdf");
        assert_eq!(json["ownerId"], "owner");
        assert_eq!(json["ai_tags"], serde_json::json!([]));
        assert!(json.get("uploadDate").is_some());
    }
}
