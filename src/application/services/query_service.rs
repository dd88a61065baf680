use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use super::DocumentBackend;
use crate::application::dtos::{QueryRequest, QueryResponse, QueryStats};
use crate::domain::DomainError;

pub const DEFAULT_TOP_K: usize = 5;
pub const QUERY_FAILED_MESSAGE: &str = "Failed to process query. Please try again.";
pub const RECENT_QUERIES: usize = 3;

/// One answered question.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryExchange {
    pub question: String,
    pub response: QueryResponse,
}

#[derive(Default)]
struct QueryState {
    history: Vec<QueryExchange>,
    error: Option<String>,
}

/// Submits questions scoped to a document selection and keeps the answers
/// for the session.
pub struct QueryService {
    backend: Arc<dyn DocumentBackend>,
    top_k: usize,
    state: Mutex<QueryState>,
}

impl QueryService {
    pub fn new(backend: Arc<dyn DocumentBackend>) -> Self {
        Self {
            backend,
            top_k: DEFAULT_TOP_K,
            state: Mutex::new(QueryState::default()),
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    /// Build the request body for `question` over `selection`. An empty
    /// selection leaves `document_ids` out so the backend searches everything.
    pub fn build_request(
        &self,
        question: &str,
        selection: &[String],
    ) -> Result<QueryRequest, DomainError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(DomainError::validation("question must not be empty"));
        }

        Ok(QueryRequest {
            question: question.to_string(),
            document_ids: (!selection.is_empty()).then(|| selection.to_vec()),
            top_k: Some(self.top_k),
            include_sources: Some(true),
        })
    }

    /// Ask one question. Success is appended to the history; failure only
    /// sets the error banner.
    pub async fn ask(
        &self,
        question: &str,
        selection: &[String],
    ) -> Result<QueryResponse, DomainError> {
        let request = self.build_request(question, selection)?;
        debug!(
            target: "documind::query",
            scoped_to = selection.len(),
            top_k = self.top_k,
            "submitting query"
        );

        match self.backend.submit_query(&request).await {
            Ok(response) => {
                let mut state = self.state.lock();
                state.error = None;
                state.history.push(QueryExchange {
                    question: request.question,
                    response: response.clone(),
                });
                Ok(response)
            }
            Err(err) => {
                warn!(target: "documind::query", "query failed: {err}");
                self.state.lock().error = Some(err.banner(QUERY_FAILED_MESSAGE));
                Err(err)
            }
        }
    }

    /// Newest first, at most [`RECENT_QUERIES`].
    pub fn recent(&self) -> Vec<QueryExchange> {
        self.state
            .lock()
            .history
            .iter()
            .rev()
            .take(RECENT_QUERIES)
            .cloned()
            .collect()
    }

    pub fn history_len(&self) -> usize {
        self.state.lock().history.len()
    }

    pub fn last_error(&self) -> Option<String> {
        self.state.lock().error.clone()
    }

    pub async fn stats(&self) -> Result<QueryStats, DomainError> {
        self.backend.query_stats().await
    }
}
