use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Media types the backend accepts for ingestion.
pub const ALLOWED_MEDIA_TYPES: [&str; 3] = [
    "application/pdf",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "text/plain",
];

/// Upload ceiling enforced client-side (50 MiB).
pub const MAX_UPLOAD_BYTES: u64 = 50 * 1024 * 1024;

/// Lifecycle of a document on the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Uploading,
    Processing,
    Completed,
    Failed,
}

impl DocumentStatus {
    /// `completed` and `failed` never transition again.
    pub fn is_terminal(self) -> bool {
        matches!(self, DocumentStatus::Completed | DocumentStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DocumentStatus::Uploading => "uploading",
            DocumentStatus::Processing => "processing",
            DocumentStatus::Completed => "completed",
            DocumentStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Contiguous slice of a document's text, the unit of retrieval and citation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub chunk_id: String,
    pub text: String,
    pub start_index: u64,
    pub end_index: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding_index: Option<u64>,
}

/// Cached, possibly stale copy of a backend document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub document_id: String,
    pub filename: String,
    pub file_size: u64,
    pub file_type: String,
    pub upload_time: String,
    pub status: DocumentStatus,
    #[serde(default)]
    pub total_chunks: u64,
    #[serde(default)]
    pub total_tokens: u64,
    #[serde(default)]
    pub chunks: Vec<DocumentChunk>,
}

impl DocumentMetadata {
    pub fn is_completed(&self) -> bool {
        self.status == DocumentStatus::Completed
    }

    pub fn uploaded_at(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.upload_time)
    }
}

/// Citation attached to an answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceInfo {
    pub document_id: String,
    pub filename: String,
    pub chunk_id: String,
    pub text: String,
    pub similarity_score: f64,
    pub start_index: u64,
    pub end_index: u64,
}

/// Backend timestamps arrive either as RFC 3339 or as naive ISO-8601 (UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .map(|naive| naive.and_utc())
}
