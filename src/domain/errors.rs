use thiserror::Error;

/// Domain-level errors shared across application components.
#[derive(Debug, Clone, Error)]
pub enum DomainError {
    /// The file or question was rejected before any network call was made.
    #[error("validation error: {0}")]
    Validation(String),

    /// The backend answered 404 for the requested document.
    #[error("not found: {0}")]
    NotFound(String),

    /// Network failure or non-2xx response. `detail` is only set when the
    /// backend body supplied one.
    #[error("transport error: {message}")]
    Transport {
        message: String,
        status_code: Option<u16>,
        detail: Option<String>,
    },

    /// The backend reported the document as `failed` while it was polled.
    #[error("processing failed for document {document_id}")]
    ProcessingFailure { document_id: String },

    /// The poll budget ran out before the document reached a terminal state.
    #[error("document {document_id} still not processed after {attempts} status checks")]
    PollTimeout { document_id: String, attempts: u32 },

    /// Client configuration could not be used (bad base URL, TLS setup, ...).
    #[error("configuration error: {0}")]
    Config(String),

    /// Any other unexpected failure.
    #[error("unexpected error: {0}")]
    Other(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn transport(msg: impl Into<String>, status_code: Option<u16>) -> Self {
        Self::Transport {
            message: msg.into(),
            status_code,
            detail: None,
        }
    }

    /// Non-2xx response. `reason` stands in for the message when the body
    /// had no `detail`.
    pub fn rejected(status_code: u16, detail: Option<String>, reason: impl Into<String>) -> Self {
        Self::Transport {
            message: detail.clone().unwrap_or_else(|| reason.into()),
            status_code: Some(status_code),
            detail,
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// HTTP status attached to the failure, if the backend answered at all.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Transport { status_code, .. } => *status_code,
            Self::NotFound(_) => Some(404),
            _ => None,
        }
    }

    /// Backend-supplied detail, suitable for an inline error banner. Plain
    /// network failures carry none.
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Transport { detail, .. } => detail.as_deref(),
            Self::NotFound(message) | Self::Validation(message) => Some(message),
            _ => None,
        }
    }

    /// Banner text: the detail when there is one, `fallback` otherwise.
    pub fn banner(&self, fallback: &str) -> String {
        self.detail()
            .filter(|detail| !detail.trim().is_empty())
            .unwrap_or(fallback)
            .to_string()
    }
}
