use async_trait::async_trait;

use crate::{
    application::dtos::{
        DeleteResponse, DetailedHealthResponse, DocumentListResponse, HealthCheckResponse,
        QueryRequest, QueryResponse, QueryStats, UploadFile, UploadResponse,
    },
    domain::{DocumentMetadata, DomainError},
};

/// Contract for the remote document/query service.
///
/// Implementations map each call onto one REST request and perform no
/// retries or caching; callers decide how failures are handled.
#[async_trait]
pub trait DocumentBackend: Send + Sync {
    async fn upload_document(&self, file: &UploadFile) -> Result<UploadResponse, DomainError>;

    async fn list_documents(&self) -> Result<DocumentListResponse, DomainError>;

    /// Fails with [`DomainError::NotFound`] when the backend answers 404.
    async fn get_document(&self, document_id: &str) -> Result<DocumentMetadata, DomainError>;

    async fn delete_document(&self, document_id: &str) -> Result<DeleteResponse, DomainError>;

    async fn submit_query(&self, request: &QueryRequest) -> Result<QueryResponse, DomainError>;

    async fn query_stats(&self) -> Result<QueryStats, DomainError>;

    async fn health(&self) -> Result<HealthCheckResponse, DomainError>;

    async fn detailed_health(&self) -> Result<DetailedHealthResponse, DomainError>;
}
