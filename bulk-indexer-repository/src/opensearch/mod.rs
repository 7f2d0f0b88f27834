//! OpenSearch implementation of the search engine client.
//!
//! This module provides a concrete implementation of `SearchEngineClient`
//! using OpenSearch as the backend.

mod bulk;
mod client;
mod config;

pub use client::OpenSearchClient;
pub use config::{OpenSearchConfig, DEFAULT_OPENSEARCH_URL, DEFAULT_REQUEST_TIMEOUT};
