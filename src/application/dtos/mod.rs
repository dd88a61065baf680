use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::{DocumentMetadata, DocumentStatus, DomainError, SourceInfo};

/// File handed to the upload flow. Only metadata is inspected until the
/// transport actually sends it.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub filename: String,
    /// Declared media type (derived from the extension for local files).
    pub media_type: String,
    pub size: u64,
    pub source: UploadSource,
}

#[derive(Debug, Clone)]
pub enum UploadSource {
    Bytes(Vec<u8>),
    Path(PathBuf),
}

impl UploadFile {
    pub fn from_bytes(
        filename: impl Into<String>,
        media_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            filename: filename.into(),
            media_type: media_type.into(),
            size: bytes.len() as u64,
            source: UploadSource::Bytes(bytes),
        }
    }

    /// Stat a local file without reading it.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, DomainError> {
        let path = path.as_ref();
        let metadata = tokio::fs::metadata(path).await.map_err(|err| {
            DomainError::validation(format!("cannot read {}: {}", path.display(), err))
        })?;
        if !metadata.is_file() {
            return Err(DomainError::validation(format!(
                "{} is not a regular file",
                path.display()
            )));
        }

        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.bin".to_string());
        let media_type = mime_guess::from_path(path)
            .first_raw()
            .unwrap_or("application/octet-stream")
            .to_string();

        Ok(Self {
            filename,
            media_type,
            size: metadata.len(),
            source: UploadSource::Path(path.to_path_buf()),
        })
    }

    /// Load the payload for sending.
    pub async fn read_bytes(&self) -> Result<Vec<u8>, DomainError> {
        match &self.source {
            UploadSource::Bytes(bytes) => Ok(bytes.clone()),
            UploadSource::Path(path) => tokio::fs::read(path).await.map_err(|err| {
                DomainError::other(format!("failed to read {}: {}", path.display(), err))
            }),
        }
    }
}

/// `POST /api/v1/documents/upload` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub document_id: String,
    pub filename: String,
    pub status: DocumentStatus,
    pub message: String,
    pub upload_time: String,
}

/// `GET /api/v1/documents` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentListResponse {
    pub documents: Vec<DocumentMetadata>,
    pub total_count: usize,
}

/// `DELETE /api/v1/documents/{id}` acknowledgement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub message: String,
    pub document_id: String,
}

/// Question scoped to an optional set of documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_ids: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_sources: Option<bool>,
}

/// Answer with citations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub answer: String,
    pub confidence: f64,
    #[serde(default)]
    pub sources: Vec<SourceInfo>,
    pub processing_time: f64,
    pub total_sources_found: usize,
}

/// `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

/// `GET /health/detailed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailedHealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub system_stats: SystemStats,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemStats {
    pub total_documents: u64,
    pub total_chunks: u64,
    pub total_vectors: u64,
    pub embedding_model: String,
    pub vector_dimension: u64,
    pub index_type: String,
    /// Seconds since the backend started.
    pub uptime: f64,
}

/// `GET /api/v1/query/stats`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryStats {
    pub total_queries: u64,
    pub average_processing_time: f64,
    #[serde(default)]
    pub total_documents_queried: u64,
    #[serde(default)]
    pub most_common_questions: Vec<String>,
}

/// Error body returned by the backend on 4xx/5xx.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
    #[serde(default)]
    pub status_code: Option<u16>,
}
