use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Multipart, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{json, Value};

use documind_lib::application::dtos::{QueryRequest, UploadFile};
use documind_lib::application::services::{
    DocumentBackend, DocumentLibrary, PollOutcome, QueryService, UploadObserver, UploadPhase,
    UploadSnapshot, LOAD_FAILED_MESSAGE,
};
use documind_lib::domain::{DocumentStatus, DomainError};
use documind_lib::infrastructure::{ApiClient, ClientConfig};
use documind_lib::settings::AppConfig;
use documind_lib::Workspace;

#[derive(Debug, Clone)]
struct ReceivedUpload {
    field: String,
    filename: String,
    content_type: String,
    len: usize,
}

#[derive(Default)]
struct FakeBackend {
    documents: Mutex<HashMap<String, Value>>,
    /// Statuses served by `GET /documents/{id}` before the stored one.
    pending_statuses: Mutex<Vec<&'static str>>,
    uploads: Mutex<Vec<ReceivedUpload>>,
    queries: Mutex<Vec<Value>>,
    authorization: Mutex<Option<String>>,
    list_calls: AtomicUsize,
    /// Answer the list endpoint with a bare proxy error page.
    list_outage: AtomicBool,
}

type Shared = Arc<FakeBackend>;

fn detail(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "detail": message }))).into_response()
}

fn document_json(id: &str, filename: &str, status: &str) -> Value {
    json!({
        "document_id": id,
        "filename": filename,
        "file_size": 2_097_152,
        "file_type": "pdf",
        "upload_time": "2024-03-05T14:07:00.123456",
        "status": status,
        "total_chunks": 4,
        "total_tokens": 900
    })
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy", "service": "documind", "version": "1.0.0" }))
}

async fn detailed_health(State(state): State<Shared>) -> Json<Value> {
    let total = state.documents.lock().len();
    Json(json!({
        "status": "healthy",
        "service": "documind",
        "version": "1.0.0",
        "system_stats": {
            "total_documents": total,
            "total_chunks": 40,
            "total_vectors": 40,
            "embedding_model": "sentence-transformers/all-MiniLM-L6-v2",
            "vector_dimension": 384,
            "index_type": "IndexFlatIP",
            "uptime": 3725.5
        }
    }))
}

async fn upload(
    State(state): State<Shared>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    *state.authorization.lock() = headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    let Ok(Some(field)) = multipart.next_field().await else {
        return detail(StatusCode::BAD_REQUEST, "No file provided");
    };
    let name = field.name().unwrap_or_default().to_string();
    let filename = field.file_name().unwrap_or_default().to_string();
    let content_type = field.content_type().unwrap_or_default().to_string();
    let Ok(bytes) = field.bytes().await else {
        return detail(StatusCode::BAD_REQUEST, "Unreadable upload");
    };

    state.uploads.lock().push(ReceivedUpload {
        field: name,
        filename: filename.clone(),
        content_type,
        len: bytes.len(),
    });

    if bytes.is_empty() {
        return detail(StatusCode::BAD_REQUEST, "File is empty");
    }

    let id = uuid::Uuid::new_v4().to_string();
    state
        .documents
        .lock()
        .insert(id.clone(), document_json(&id, &filename, "completed"));

    Json(json!({
        "document_id": id,
        "filename": filename,
        "status": "uploading",
        "message": "Document uploaded successfully",
        "upload_time": "2024-03-05T14:07:00"
    }))
    .into_response()
}

async fn list_documents(State(state): State<Shared>) -> Response {
    state.list_calls.fetch_add(1, Ordering::SeqCst);
    if state.list_outage.load(Ordering::SeqCst) {
        return (StatusCode::BAD_GATEWAY, "<html>upstream down</html>").into_response();
    }
    let documents: Vec<Value> = state.documents.lock().values().cloned().collect();
    Json(json!({ "total_count": documents.len(), "documents": documents })).into_response()
}

async fn get_document(State(state): State<Shared>, Path(id): Path<String>) -> Response {
    let Some(mut document) = state.documents.lock().get(&id).cloned() else {
        return detail(StatusCode::NOT_FOUND, "Document not found");
    };
    let mut pending = state.pending_statuses.lock();
    if !pending.is_empty() {
        document["status"] = json!(pending.remove(0));
    }
    Json(document).into_response()
}

async fn delete_document(State(state): State<Shared>, Path(id): Path<String>) -> Response {
    match state.documents.lock().remove(&id) {
        Some(_) => Json(json!({ "message": "Document deleted successfully", "document_id": id }))
            .into_response(),
        None => detail(StatusCode::NOT_FOUND, "Document not found"),
    }
}

async fn query(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    state.queries.lock().push(body);
    Json(json!({
        "answer": "Refunds are issued within 30 days of purchase.",
        "confidence": 0.92,
        "sources": [{
            "document_id": "d1",
            "filename": "policy.pdf",
            "chunk_id": "d1_0",
            "text": "Refunds are issued within 30 days.",
            "similarity_score": 0.88,
            "start_index": 0,
            "end_index": 34
        }],
        "processing_time": 0.42,
        "total_sources_found": 1
    }))
    .into_response()
}

async fn query_stats(State(state): State<Shared>) -> Json<Value> {
    let total = state.queries.lock().len();
    Json(json!({ "total_queries": total, "average_processing_time": 0.42 }))
}

async fn spawn_backend() -> (String, Shared) {
    let state: Shared = Arc::new(FakeBackend::default());
    let app = Router::new()
        .route("/health", get(health))
        .route("/health/detailed", get(detailed_health))
        .route("/api/v1/documents/upload", post(upload))
        .route("/api/v1/documents", get(list_documents))
        .route(
            "/api/v1/documents/:id",
            get(get_document).delete(delete_document),
        )
        .route("/api/v1/query", post(query))
        .route("/api/v1/query/stats", get(query_stats))
        .with_state(Arc::clone(&state));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}"), state)
}

fn client(base_url: &str) -> ApiClient {
    ApiClient::new(&ClientConfig::new(base_url).with_timeout(Duration::from_secs(5))).unwrap()
}

#[tokio::test]
async fn upload_sends_multipart_file_field() {
    let (base_url, state) = spawn_backend().await;
    let client = client(&base_url);

    let file = UploadFile::from_bytes("notes.txt", "text/plain", b"hello world".to_vec());
    let response = client.upload_document(&file).await.unwrap();

    assert_eq!(response.filename, "notes.txt");
    assert_eq!(response.status, DocumentStatus::Uploading);
    let uploads = state.uploads.lock().clone();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].field, "file");
    assert_eq!(uploads[0].filename, "notes.txt");
    assert_eq!(uploads[0].content_type, "text/plain");
    assert_eq!(uploads[0].len, 11);
}

#[tokio::test]
async fn upload_rejection_carries_backend_detail() {
    let (base_url, _state) = spawn_backend().await;
    let client = client(&base_url);

    let file = UploadFile::from_bytes("empty.pdf", "application/pdf", Vec::new());
    let err = client.upload_document(&file).await.unwrap_err();

    assert_eq!(err.status_code(), Some(400));
    assert_eq!(err.banner("Upload failed. Please try again."), "File is empty");
}

#[tokio::test]
async fn missing_document_is_not_found() {
    let (base_url, _state) = spawn_backend().await;
    let client = client(&base_url);

    let err = client.get_document("nope").await.unwrap_err();
    assert!(matches!(err, DomainError::NotFound(ref msg) if msg == "Document not found"));

    let err = client.delete_document("nope").await.unwrap_err();
    assert!(matches!(err, DomainError::NotFound(_)));
}

#[tokio::test]
async fn document_ids_survive_path_encoding() {
    let (base_url, state) = spawn_backend().await;
    state
        .documents
        .lock()
        .insert("doc 1".into(), document_json("doc 1", "a.pdf", "processing"));
    let client = client(&base_url);

    let document = client.get_document("doc 1").await.unwrap();
    assert_eq!(document.document_id, "doc 1");
    assert_eq!(document.status, DocumentStatus::Processing);

    let ack = client.delete_document("doc 1").await.unwrap();
    assert_eq!(ack.document_id, "doc 1");
    assert!(client.list_documents().await.unwrap().documents.is_empty());
}

#[tokio::test]
async fn query_body_carries_selection_and_defaults() {
    let (base_url, state) = spawn_backend().await;
    let backend: Arc<dyn DocumentBackend> = Arc::new(client(&base_url));
    let queries = QueryService::new(backend);

    let response = queries
        .ask("What is the policy on refunds?", &["d1".to_string(), "d2".to_string()])
        .await
        .unwrap();

    assert_eq!(response.confidence, 0.92);
    assert_eq!(response.sources.len(), 1);
    assert_eq!(
        state.queries.lock()[0],
        json!({
            "question": "What is the policy on refunds?",
            "document_ids": ["d1", "d2"],
            "top_k": 5,
            "include_sources": true
        })
    );
}

#[tokio::test]
async fn unscoped_query_omits_document_ids() {
    let (base_url, state) = spawn_backend().await;
    let client = client(&base_url);

    client
        .submit_query(&QueryRequest {
            question: "Summarize".into(),
            document_ids: None,
            top_k: Some(5),
            include_sources: Some(true),
        })
        .await
        .unwrap();

    assert!(state.queries.lock()[0].get("document_ids").is_none());
    assert_eq!(client.query_stats().await.unwrap().total_queries, 1);
}

#[tokio::test]
async fn api_key_is_sent_as_bearer_token() {
    let (base_url, state) = spawn_backend().await;
    let client = ApiClient::new(
        &ClientConfig::new(&base_url).with_api_key(Some("secret-token".into())),
    )
    .unwrap();

    let file = UploadFile::from_bytes("a.txt", "text/plain", b"x".to_vec());
    client.upload_document(&file).await.unwrap();

    assert_eq!(
        state.authorization.lock().as_deref(),
        Some("Bearer secret-token")
    );
}

#[tokio::test]
async fn health_endpoints_decode() {
    let (base_url, _state) = spawn_backend().await;
    let client = client(&base_url);

    assert_eq!(client.health().await.unwrap().status, "healthy");
    let detailed = client.detailed_health().await.unwrap();
    assert_eq!(detailed.system_stats.vector_dimension, 384);
    assert_eq!(detailed.system_stats.uptime, 3725.5);
}

#[tokio::test]
async fn unreachable_backend_has_no_status_or_detail() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = client(&format!("http://{addr}"));
    let err = client.list_documents().await.unwrap_err();

    assert!(matches!(err, DomainError::Transport { status_code: None, .. }));
    assert_eq!(err.banner("Failed to load documents"), "Failed to load documents");
}

#[tokio::test]
async fn error_page_without_detail_shows_generic_banner() {
    let (base_url, state) = spawn_backend().await;
    state.list_outage.store(true, Ordering::SeqCst);
    let backend: Arc<dyn DocumentBackend> = Arc::new(client(&base_url));

    let err = backend.list_documents().await.unwrap_err();
    assert_eq!(err.status_code(), Some(502));
    assert_eq!(err.detail(), None);

    let library = DocumentLibrary::new(backend);
    assert!(library.refresh().await.is_err());
    assert_eq!(library.view().error.as_deref(), Some(LOAD_FAILED_MESSAGE));
}

#[derive(Default)]
struct PhaseLog {
    phases: Mutex<Vec<UploadPhase>>,
    completed: Mutex<Vec<String>>,
}

impl UploadObserver for PhaseLog {
    fn on_change(&self, snapshot: &UploadSnapshot) {
        let mut phases = self.phases.lock();
        if phases.last() != Some(&snapshot.phase) {
            phases.push(snapshot.phase);
        }
    }

    fn on_complete(&self, document_id: &str) {
        self.completed.lock().push(document_id.to_string());
    }

    fn on_error(&self, _error: &DomainError, _message: &str) {}
}

#[tokio::test]
async fn upload_is_tracked_to_completion_and_refreshes_once() {
    let (base_url, state) = spawn_backend().await;
    *state.pending_statuses.lock() = vec!["processing", "processing"];

    let backend: Arc<dyn DocumentBackend> = Arc::new(client(&base_url));
    let settings = AppConfig {
        poll_interval_ms: 20,
        completion_display_ms: 100,
        ..AppConfig::default()
    };
    let workspace = Workspace::new(backend, settings);
    let log = Arc::new(PhaseLog::default());
    let orchestrator = workspace.upload_orchestrator(log.clone());

    let file = UploadFile::from_bytes("report.pdf", "application/pdf", vec![b'%'; 2048]);
    let receipt = orchestrator.submit(file).await.unwrap();
    let document_id = receipt.document_id.clone();
    assert_eq!(receipt.poll.outcome().await, PollOutcome::Completed);

    tokio::time::sleep(Duration::from_millis(400)).await;

    assert_eq!(
        *log.phases.lock(),
        vec![
            UploadPhase::Uploading,
            UploadPhase::Processing,
            UploadPhase::Completed,
            UploadPhase::Idle
        ]
    );
    assert_eq!(*log.completed.lock(), vec![document_id.clone()]);
    assert_eq!(state.list_calls.load(Ordering::SeqCst), 1);
    assert!(workspace
        .library
        .view()
        .documents
        .iter()
        .any(|doc| doc.document_id == document_id));
}
