//! Scripted in-memory backend shared by the service tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::DocumentBackend;
use crate::{
    application::dtos::{
        DeleteResponse, DetailedHealthResponse, DocumentListResponse, HealthCheckResponse,
        QueryRequest, QueryResponse, QueryStats, SystemStats, UploadFile, UploadResponse,
    },
    domain::{DocumentMetadata, DocumentStatus, DomainError},
};

pub(crate) fn doc(id: &str, status: DocumentStatus) -> DocumentMetadata {
    DocumentMetadata {
        document_id: id.to_string(),
        filename: format!("{id}.pdf"),
        file_size: 2 * 1024 * 1024,
        file_type: "pdf".into(),
        upload_time: "2024-03-05T14:07:00".into(),
        status,
        total_chunks: 12,
        total_tokens: 3_400,
        chunks: Vec::new(),
    }
}

pub(crate) fn answer(confidence: f64) -> QueryResponse {
    QueryResponse {
        answer: "Refunds are issued within 30 days.".into(),
        confidence,
        sources: Vec::new(),
        processing_time: 1.234,
        total_sources_found: 0,
    }
}

pub(crate) struct ScriptedBackend {
    upload: Mutex<Result<UploadResponse, DomainError>>,
    upload_delay: Option<Duration>,
    statuses: Mutex<VecDeque<Result<DocumentStatus, DomainError>>>,
    fallback_status: DocumentStatus,
    documents: Mutex<Vec<DocumentMetadata>>,
    list_error: Mutex<Option<DomainError>>,
    delete_error: Mutex<Option<DomainError>>,
    query_result: Mutex<Result<QueryResponse, DomainError>>,
    pub queries: Mutex<Vec<QueryRequest>>,
    pub upload_calls: AtomicUsize,
    pub get_calls: AtomicUsize,
    pub list_calls: AtomicUsize,
    pub delete_calls: AtomicUsize,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self {
            upload: Mutex::new(Ok(UploadResponse {
                document_id: "d1".into(),
                filename: "report.pdf".into(),
                status: DocumentStatus::Uploading,
                message: "Document uploaded successfully".into(),
                upload_time: "2024-03-05T14:07:00".into(),
            })),
            upload_delay: None,
            statuses: Mutex::new(VecDeque::new()),
            fallback_status: DocumentStatus::Processing,
            documents: Mutex::new(Vec::new()),
            list_error: Mutex::new(None),
            delete_error: Mutex::new(None),
            query_result: Mutex::new(Ok(answer(0.92))),
            queries: Mutex::new(Vec::new()),
            upload_calls: AtomicUsize::new(0),
            get_calls: AtomicUsize::new(0),
            list_calls: AtomicUsize::new(0),
            delete_calls: AtomicUsize::new(0),
        }
    }

    /// Statuses returned by successive `get_document` calls; once drained
    /// every call answers `processing`.
    pub fn with_statuses(
        self,
        statuses: impl IntoIterator<Item = Result<DocumentStatus, DomainError>>,
    ) -> Self {
        *self.statuses.lock() = statuses.into_iter().collect();
        self
    }

    pub fn with_upload_delay(mut self, delay: Duration) -> Self {
        self.upload_delay = Some(delay);
        self
    }

    pub fn with_documents(self, documents: Vec<DocumentMetadata>) -> Self {
        *self.documents.lock() = documents;
        self
    }

    pub fn fail_upload(&self, err: DomainError) {
        *self.upload.lock() = Err(err);
    }

    pub fn fail_list(&self, err: Option<DomainError>) {
        *self.list_error.lock() = err;
    }

    pub fn fail_delete(&self, err: Option<DomainError>) {
        *self.delete_error.lock() = err;
    }

    pub fn set_query_result(&self, result: Result<QueryResponse, DomainError>) {
        *self.query_result.lock() = result;
    }

    pub fn set_documents(&self, documents: Vec<DocumentMetadata>) {
        *self.documents.lock() = documents;
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentBackend for ScriptedBackend {
    async fn upload_document(&self, _file: &UploadFile) -> Result<UploadResponse, DomainError> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.upload_delay {
            tokio::time::sleep(delay).await;
        }
        self.upload.lock().clone()
    }

    async fn list_documents(&self) -> Result<DocumentListResponse, DomainError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.list_error.lock().clone() {
            return Err(err);
        }
        let documents = self.documents.lock().clone();
        Ok(DocumentListResponse {
            total_count: documents.len(),
            documents,
        })
    }

    async fn get_document(&self, document_id: &str) -> Result<DocumentMetadata, DomainError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        let next = self
            .statuses
            .lock()
            .pop_front()
            .unwrap_or(Ok(self.fallback_status));
        next.map(|status| doc(document_id, status))
    }

    async fn delete_document(&self, document_id: &str) -> Result<DeleteResponse, DomainError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.delete_error.lock().clone() {
            return Err(err);
        }
        self.documents
            .lock()
            .retain(|doc| doc.document_id != document_id);
        Ok(DeleteResponse {
            message: "Document deleted successfully".into(),
            document_id: document_id.to_string(),
        })
    }

    async fn submit_query(&self, request: &QueryRequest) -> Result<QueryResponse, DomainError> {
        self.queries.lock().push(request.clone());
        self.query_result.lock().clone()
    }

    async fn query_stats(&self) -> Result<QueryStats, DomainError> {
        Ok(QueryStats {
            total_queries: self.queries.lock().len() as u64,
            average_processing_time: 1.2,
            total_documents_queried: 0,
            most_common_questions: Vec::new(),
        })
    }

    async fn health(&self) -> Result<HealthCheckResponse, DomainError> {
        Ok(HealthCheckResponse {
            status: "healthy".into(),
            service: "scripted".into(),
            version: "0.0.0".into(),
        })
    }

    async fn detailed_health(&self) -> Result<DetailedHealthResponse, DomainError> {
        Ok(DetailedHealthResponse {
            status: "healthy".into(),
            service: "scripted".into(),
            version: "0.0.0".into(),
            system_stats: SystemStats {
                total_documents: self.documents.lock().len() as u64,
                total_chunks: 0,
                total_vectors: 0,
                embedding_model: "test-embedder".into(),
                vector_dimension: 384,
                index_type: "flat".into(),
                uptime: 12.0,
            },
        })
    }
}
