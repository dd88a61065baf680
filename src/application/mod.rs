//! Application layer wiring DTOs and services for DocuMind.

pub mod dtos;
pub mod services;

pub use dtos::{
    DeleteResponse, DetailedHealthResponse, DocumentListResponse, HealthCheckResponse,
    QueryRequest, QueryResponse, QueryStats, SystemStats, UploadFile, UploadResponse,
    UploadSource,
};
pub use services::{
    DocumentBackend, DocumentLibrary, LibraryView, PollConfig, PollEvent, PollHandle,
    PollOutcome, QueryExchange, QueryService, StatusPoller, UploadObserver, UploadOrchestrator,
    UploadPhase, UploadPolicy, UploadProgress, UploadReceipt, UploadSnapshot,
};
