use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};

use super::DocumentBackend;
use crate::domain::{DocumentMetadata, DomainError};

pub const LOAD_FAILED_MESSAGE: &str = "Failed to load documents";
pub const DELETE_FAILED_MESSAGE: &str = "Failed to delete document";

/// Point-in-time copy of the library for rendering.
#[derive(Debug, Clone, Default)]
pub struct LibraryView {
    pub documents: Vec<DocumentMetadata>,
    pub selected: Vec<String>,
    /// Banner for the last failed load or delete.
    pub error: Option<String>,
    pub loaded: bool,
}

impl LibraryView {
    pub fn completed(&self) -> impl Iterator<Item = &DocumentMetadata> {
        self.documents.iter().filter(|doc| doc.is_completed())
    }

    pub fn completed_count(&self) -> usize {
        self.completed().count()
    }

    pub fn is_selected(&self, document_id: &str) -> bool {
        self.selected.iter().any(|id| id == document_id)
    }

    /// Drives the "Select All" / "Deselect All" label.
    pub fn all_completed_selected(&self) -> bool {
        let mut completed = self.completed().peekable();
        completed.peek().is_some() && completed.all(|doc| self.is_selected(&doc.document_id))
    }
}

#[derive(Default)]
struct LibraryState {
    documents: Vec<DocumentMetadata>,
    selected: Vec<String>,
    error: Option<String>,
    loaded: bool,
}

impl LibraryState {
    fn completed_ids(&self) -> Vec<String> {
        self.documents
            .iter()
            .filter(|doc| doc.is_completed())
            .map(|doc| doc.document_id.clone())
            .collect()
    }

    /// Drop selected ids that no longer name a completed document.
    fn reconcile(&mut self) {
        let documents = &self.documents;
        self.selected.retain(|id| {
            documents
                .iter()
                .any(|doc| &doc.document_id == id && doc.is_completed())
        });
    }
}

/// Cached document list plus the selection used to scope queries.
///
/// The cache is always replaced wholesale on reload; every mutation of the
/// list and the selection happens under one write lock.
pub struct DocumentLibrary {
    backend: Arc<dyn DocumentBackend>,
    state: RwLock<LibraryState>,
}

impl DocumentLibrary {
    pub fn new(backend: Arc<dyn DocumentBackend>) -> Self {
        Self {
            backend,
            state: RwLock::new(LibraryState::default()),
        }
    }

    /// Reload the list from the backend. On failure the previous list is
    /// kept and an error banner is recorded; calling again is the retry.
    pub async fn refresh(&self) -> Result<usize, DomainError> {
        match self.backend.list_documents().await {
            Ok(list) => {
                let mut state = self.state.write();
                state.documents = list.documents;
                state.loaded = true;
                state.error = None;
                state.reconcile();
                debug!(
                    target: "documind::library",
                    documents = state.documents.len(),
                    selected = state.selected.len(),
                    "document list reloaded"
                );
                Ok(state.documents.len())
            }
            Err(err) => {
                warn!(target: "documind::library", "failed to load documents: {err}");
                self.state.write().error = Some(err.banner(LOAD_FAILED_MESSAGE));
                Err(err)
            }
        }
    }

    pub fn view(&self) -> LibraryView {
        let state = self.state.read();
        LibraryView {
            documents: state.documents.clone(),
            selected: state.selected.clone(),
            error: state.error.clone(),
            loaded: state.loaded,
        }
    }

    pub fn selection(&self) -> Vec<String> {
        self.state.read().selected.clone()
    }

    /// Flip one document in or out of the selection. Returns whether it is
    /// selected afterwards. Only completed documents can be added.
    pub fn toggle(&self, document_id: &str) -> Result<bool, DomainError> {
        let mut state = self.state.write();
        if let Some(pos) = state.selected.iter().position(|id| id == document_id) {
            state.selected.remove(pos);
            return Ok(false);
        }

        match state
            .documents
            .iter()
            .find(|doc| doc.document_id == document_id)
        {
            Some(doc) if doc.is_completed() => {
                state.selected.push(document_id.to_string());
                Ok(true)
            }
            Some(doc) => Err(DomainError::validation(format!(
                "{} is {} and cannot be queried yet",
                doc.filename, doc.status
            ))),
            None => Err(DomainError::not_found(format!(
                "document {document_id} is not in the list"
            ))),
        }
    }

    /// Select every completed document, or clear the selection when it
    /// already equals that set. Returns the new selection.
    pub fn select_all(&self) -> Vec<String> {
        let mut state = self.state.write();
        let completed = state.completed_ids();
        let same_set = completed.len() == state.selected.len()
            && completed.iter().all(|id| state.selected.contains(id));

        state.selected = if same_set { Vec::new() } else { completed };
        state.selected.clone()
    }

    /// Deselect everything; the next query searches all documents.
    pub fn clear_selection(&self) {
        self.state.write().selected.clear();
    }

    /// Delete on the backend, then drop the document from the list and the
    /// selection in a single update.
    pub async fn delete(&self, document_id: &str) -> Result<(), DomainError> {
        match self.backend.delete_document(document_id).await {
            Ok(ack) => {
                let mut state = self.state.write();
                state.documents.retain(|doc| doc.document_id != document_id);
                state.selected.retain(|id| id != document_id);
                state.error = None;
                debug!(
                    target: "documind::library",
                    document_id = %ack.document_id,
                    "document deleted"
                );
                Ok(())
            }
            Err(err) => {
                warn!(
                    target: "documind::library",
                    document_id,
                    "failed to delete document: {err}"
                );
                self.state.write().error = Some(err.banner(DELETE_FAILED_MESSAGE));
                Err(err)
            }
        }
    }
}
