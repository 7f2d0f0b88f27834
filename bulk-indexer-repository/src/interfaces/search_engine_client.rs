//! Search engine client trait definition.
//!
//! This module defines the abstract interface for the engine operations the
//! loader needs, allowing for different backend implementations (OpenSearch,
//! Elasticsearch, in-memory test doubles).

use async_trait::async_trait;

use crate::errors::SearchError;
use crate::types::{AliasAction, BulkOperation, BulkResponse};
use bulk_indexer_shared::IndexSchema;

/// Abstract interface for search engine operations.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync` to allow use across async tasks.
///
/// # Error Handling
///
/// Transport failures are reported as `SearchError::ConnectionError`. Every
/// other variant means the engine answered and refused the request.
#[async_trait]
pub trait SearchEngineClient: Send + Sync {
    /// Check whether a physical index exists.
    async fn index_exists(&self, index: &str) -> Result<bool, SearchError>;

    /// Create an index.
    ///
    /// With `schema == None` the engine defaults are used.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The index was created
    /// * `Err(SearchError::IndexAlreadyExists)` - The name is taken
    /// * `Err(SearchError::SchemaError)` - Settings or mappings were rejected
    async fn create_index(
        &self,
        index: &str,
        schema: Option<&IndexSchema>,
    ) -> Result<(), SearchError>;

    /// Delete an index. Deleting a missing index succeeds.
    async fn delete_index(&self, index: &str) -> Result<(), SearchError>;

    /// Check whether the alias is bound to any index.
    async fn alias_exists(&self, alias: &str) -> Result<bool, SearchError>;

    /// Check whether the alias is bound to `index`.
    async fn alias_bound_to(&self, alias: &str, index: &str) -> Result<bool, SearchError>;

    /// Apply alias actions.
    ///
    /// When `supports_atomic_alias_update` is true all actions are applied
    /// in a single request, so readers observe either the old or the new set
    /// of bindings.
    async fn update_aliases(&self, actions: &[AliasAction]) -> Result<(), SearchError>;

    /// Whether `update_aliases` applies several actions atomically.
    fn supports_atomic_alias_update(&self) -> bool {
        true
    }

    /// Submit `create` operations in one request.
    ///
    /// Per-document refusals are returned in the response; an `Err` means the
    /// request as a whole failed.
    ///
    /// # Arguments
    ///
    /// * `operations` - Operations to submit, each carrying its target index
    /// * `refresh` - Ask the engine to make the documents searchable before returning
    async fn bulk_write(
        &self,
        operations: &[BulkOperation],
        refresh: bool,
    ) -> Result<BulkResponse, SearchError>;

    /// Number of documents in an index.
    async fn document_count(&self, index: &str) -> Result<u64, SearchError>;

    /// Check if the search engine is healthy and reachable.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - If the search engine is healthy
    /// * `Ok(false)` - If the search engine is unhealthy
    /// * `Err(SearchError)` - If the health check fails to execute
    async fn health_check(&self) -> Result<bool, SearchError>;
}
