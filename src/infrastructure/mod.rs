//! Infrastructure layer wiring concrete adapters (the backend HTTP client).

pub mod http_client;

pub use http_client::{ApiClient, ClientConfig, DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
