//! Service layer orchestrating domain operations over a document backend.

mod backend;
mod document_library;
mod query_service;
mod status_poller;
mod upload_service;

#[cfg(test)]
pub(crate) mod testing;

pub use backend::DocumentBackend;
pub use document_library::{
    DocumentLibrary, LibraryView, DELETE_FAILED_MESSAGE, LOAD_FAILED_MESSAGE,
};
pub use query_service::{
    QueryExchange, QueryService, DEFAULT_TOP_K, QUERY_FAILED_MESSAGE, RECENT_QUERIES,
};
pub use status_poller::{
    PollConfig, PollEvent, PollHandle, PollOutcome, StatusPoller, DEFAULT_MAX_ATTEMPTS,
    DEFAULT_POLL_INTERVAL,
};
pub use upload_service::{
    UploadObserver, UploadOrchestrator, UploadPhase, UploadPolicy, UploadProgress,
    UploadReceipt, UploadSnapshot, DEFAULT_COMPLETION_DISPLAY, FILE_TOO_LARGE_MESSAGE,
    PROCESSING_FAILED_MESSAGE, PROCESSING_FAILED_NOTICE, PROCESSING_TIMEOUT_MESSAGE,
    UNSUPPORTED_TYPE_MESSAGE, UPLOAD_FAILED_MESSAGE, UPLOAD_IN_PROGRESS_MESSAGE,
};
