//! Error types for the bulk indexer repository.

mod search_error;

pub use search_error::SearchError;
