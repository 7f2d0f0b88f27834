//! # Bulk Indexer Repository
//!
//! This crate provides the capability interface the loader uses to talk to
//! the search engine, the error type for engine operations, the request and
//! response types of that interface, and a concrete implementation for
//! OpenSearch.

pub mod errors;
pub mod interfaces;
pub mod opensearch;
pub mod types;

pub use errors::SearchError;
pub use interfaces::SearchEngineClient;
pub use opensearch::{OpenSearchClient, OpenSearchConfig};
pub use types::{AliasAction, BulkOperation, BulkResponse};
