//! `reqwest` implementation of [`DocumentBackend`].

use async_trait::async_trait;
use reqwest::{multipart, Client, Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::{not_found_on_404, status_error, transport_error, ClientConfig};
use crate::application::dtos::{
    DeleteResponse, DetailedHealthResponse, DocumentListResponse, HealthCheckResponse,
    QueryRequest, QueryResponse, QueryStats, UploadFile, UploadResponse,
};
use crate::application::services::DocumentBackend;
use crate::domain::{DocumentMetadata, DomainError};

/// Typed client for the backend REST surface. No retries, no caching.
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    api_key: Option<String>,
    client: Client,
}

impl ApiClient {
    pub fn new(config: &ClientConfig) -> Result<Self, DomainError> {
        let base_url = config.base_url.trim().trim_end_matches('/').to_string();
        let parsed = Url::parse(&base_url)
            .map_err(|err| DomainError::config(format!("invalid base URL '{base_url}': {err}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(DomainError::config(format!(
                "base URL must use http or https, got '{}'",
                parsed.scheme()
            )));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| DomainError::config(format!("failed to build HTTP client: {err}")))?;

        Ok(Self {
            base_url,
            api_key: config.api_key.clone(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn document_url(&self, document_id: &str) -> String {
        self.url(&format!(
            "/api/v1/documents/{}",
            urlencoding::encode(document_id)
        ))
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    /// Send, check the status, decode the JSON body.
    async fn execute<T: DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        builder: RequestBuilder,
    ) -> Result<T, DomainError> {
        debug!(target: "documind::http", %method, url, "request");

        let response = builder.send().await.map_err(transport_error)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body, url));
        }

        response.json::<T>().await.map_err(|err| {
            DomainError::transport(format!("invalid response from {url}: {err}"), None)
        })
    }

    async fn get<T: DeserializeOwned>(&self, url: &str) -> Result<T, DomainError> {
        self.execute(Method::GET, url, self.request(Method::GET, url))
            .await
    }
}

#[async_trait]
impl DocumentBackend for ApiClient {
    async fn upload_document(&self, file: &UploadFile) -> Result<UploadResponse, DomainError> {
        let url = self.url("/api/v1/documents/upload");
        let bytes = file.read_bytes().await?;
        let part = multipart::Part::bytes(bytes)
            .file_name(file.filename.clone())
            .mime_str(&file.media_type)
            .map_err(|err| {
                DomainError::validation(format!("invalid media type '{}': {err}", file.media_type))
            })?;
        let form = multipart::Form::new().part("file", part);

        let builder = self.request(Method::POST, &url).multipart(form);
        self.execute(Method::POST, &url, builder).await
    }

    async fn list_documents(&self) -> Result<DocumentListResponse, DomainError> {
        self.get(&self.url("/api/v1/documents")).await
    }

    async fn get_document(&self, document_id: &str) -> Result<DocumentMetadata, DomainError> {
        self.get(&self.document_url(document_id))
            .await
            .map_err(not_found_on_404)
    }

    async fn delete_document(&self, document_id: &str) -> Result<DeleteResponse, DomainError> {
        let url = self.document_url(document_id);
        let builder = self.request(Method::DELETE, &url);
        self.execute(Method::DELETE, &url, builder)
            .await
            .map_err(not_found_on_404)
    }

    async fn submit_query(&self, request: &QueryRequest) -> Result<QueryResponse, DomainError> {
        let url = self.url("/api/v1/query");
        let builder = self.request(Method::POST, &url).json(request);
        self.execute(Method::POST, &url, builder).await
    }

    async fn query_stats(&self) -> Result<QueryStats, DomainError> {
        self.get(&self.url("/api/v1/query/stats")).await
    }

    async fn health(&self) -> Result<HealthCheckResponse, DomainError> {
        self.get(&self.url("/health")).await
    }

    async fn detailed_health(&self) -> Result<DetailedHealthResponse, DomainError> {
        self.get(&self.url("/health/detailed")).await
    }
}
