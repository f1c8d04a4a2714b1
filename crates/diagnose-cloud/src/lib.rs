//! Backend client for the diagnose agent: HTTP transport with retry and
//! backoff, JSON wire types, and the `DiagnoseClient` implementation.

pub mod client;
pub mod transport;

pub use client::DiagnoseApiClient;
pub use transport::http_client::{HttpClient, HttpClientConfig};
