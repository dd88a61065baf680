//! Domain layer: documents, citations and the error taxonomy for DocuMind.

pub mod errors;
pub mod models;

pub use errors::DomainError;
pub use models::{
    DocumentChunk, DocumentMetadata, DocumentStatus, SourceInfo, ALLOWED_MEDIA_TYPES,
    MAX_UPLOAD_BYTES,
};
