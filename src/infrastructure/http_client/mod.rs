//! HTTP client for the DocuMind backend REST API.
//!
//! Every backend call goes through [`ApiClient`], built from an explicit
//! [`ClientConfig`]; there is no process-global client.

mod api_client;

pub use api_client::ApiClient;

use std::time::Duration;

use reqwest::StatusCode;
use serde_json::Value;
use tracing::warn;

use crate::application::dtos::ErrorResponse;
use crate::domain::DomainError;

/// Backend address used when nothing is configured.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";

/// Per-request timeout used when nothing is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for one [`ApiClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
    /// Sent as a bearer `Authorization` header when set.
    pub api_key: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            api_key: None,
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|key| !key.trim().is_empty());
        self
    }
}

/// Map a request that never produced a response.
pub(crate) fn transport_error(err: reqwest::Error) -> DomainError {
    let status = err.status().map(|status| status.as_u16());
    let message = if err.is_timeout() {
        "request timed out".to_string()
    } else if err.is_connect() {
        format!("backend unreachable: {err}")
    } else {
        err.to_string()
    };
    DomainError::transport(message, status)
}

/// Map a non-2xx response body to an error, preferring the backend `detail`.
pub(crate) fn status_error(status: StatusCode, body: &str, url: &str) -> DomainError {
    let detail = extract_detail(body);
    let reason = status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));

    warn!(
        target: "documind::http",
        status = status.as_u16(),
        url,
        "request failed: {}",
        detail.as_deref().unwrap_or(&reason)
    );

    DomainError::rejected(status.as_u16(), detail, reason)
}

/// `detail` is a string for handled errors and a list of objects for request
/// validation failures.
fn extract_detail(body: &str) -> Option<String> {
    if let Ok(parsed) = serde_json::from_str::<ErrorResponse>(body) {
        return Some(parsed.detail);
    }

    match serde_json::from_str::<Value>(body).ok()?.get("detail")? {
        Value::String(detail) => Some(detail.clone()),
        Value::Array(items) => {
            let messages: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(Value::as_str))
                .collect();
            (!messages.is_empty()).then(|| messages.join("; "))
        }
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// 404 on a single-document endpoint means the document is gone.
pub(crate) fn not_found_on_404(err: DomainError) -> DomainError {
    match err {
        DomainError::Transport {
            status_code: Some(404),
            detail,
            ..
        } => DomainError::NotFound(detail.unwrap_or_else(|| "Document not found".to_string())),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_string_is_used_verbatim() {
        let err = status_error(
            StatusCode::BAD_REQUEST,
            r#"{"detail":"Unsupported file format"}"#,
            "http://x/api/v1/documents/upload",
        );
        assert_eq!(err.detail(), Some("Unsupported file format"));
        assert_eq!(err.status_code(), Some(400));
    }

    #[test]
    fn validation_detail_lists_are_joined() {
        let err = status_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            r#"{"detail":[{"loc":["body","question"],"msg":"field required"}]}"#,
            "http://x/api/v1/query",
        );
        assert_eq!(err.detail(), Some("field required"));
    }

    #[test]
    fn body_without_detail_uses_fallback_banner() {
        let err = status_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "<html>boom</html>",
            "http://x/api/v1/documents/upload",
        );
        assert_eq!(err.detail(), None);
        assert_eq!(err.status_code(), Some(500));
        assert_eq!(
            err.banner("Upload failed. Please try again."),
            "Upload failed. Please try again."
        );
        assert_eq!(err.to_string(), "transport error: Internal Server Error");

        let empty = status_error(StatusCode::BAD_GATEWAY, r#"{"detail":null}"#, "http://x/health");
        assert_eq!(empty.detail(), None);
    }

    #[test]
    fn only_404_becomes_not_found() {
        let gone = not_found_on_404(DomainError::rejected(
            404,
            Some("Document not found".into()),
            "Not Found",
        ));
        assert!(matches!(gone, DomainError::NotFound(ref msg) if msg == "Document not found"));

        let bare = not_found_on_404(DomainError::rejected(404, None, "Not Found"));
        assert!(matches!(bare, DomainError::NotFound(ref msg) if msg == "Document not found"));

        let other = not_found_on_404(DomainError::rejected(500, None, "Internal Server Error"));
        assert!(matches!(other, DomainError::Transport { .. }));
    }

    #[test]
    fn blank_api_key_is_ignored() {
        let config = ClientConfig::default().with_api_key(Some("  ".into()));
        assert!(config.api_key.is_none());
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.timeout, Duration::from_secs(30));
    }
}
