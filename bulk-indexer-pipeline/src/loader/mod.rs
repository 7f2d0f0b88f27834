//! Loader module for the bulk indexer pipeline.
//!
//! Writes one batch of documents into the target index.

use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::errors::LoadError;
use bulk_indexer_repository::{BulkOperation, SearchEngineClient};
use bulk_indexer_shared::{Document, DocumentRejection};

/// Configuration for the bulk loader.
#[derive(Debug, Clone, Copy)]
pub struct LoaderConfig {
    /// Ask the engine to refresh the index after each bulk request.
    pub refresh: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self { refresh: true }
    }
}

/// Result of loading one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub succeeded: usize,
    pub rejections: Vec<DocumentRejection>,
}

impl BatchOutcome {
    pub fn rejected(&self) -> usize {
        self.rejections.len()
    }
}

/// Loader that bulk-writes batches with `create` semantics.
///
/// Refused documents (an id that already exists, a mapping conflict) are
/// reported in the outcome. Only a failure of the whole request is an error.
/// Failed requests are not retried: a retry after a partially applied request
/// would report the already written documents as conflicts.
pub struct BulkLoader {
    client: Arc<dyn SearchEngineClient>,
    config: LoaderConfig,
}

impl BulkLoader {
    /// Create a new loader with the default configuration.
    pub fn new(client: Arc<dyn SearchEngineClient>) -> Self {
        Self::with_config(client, LoaderConfig::default())
    }

    /// Create a new loader with custom configuration.
    pub fn with_config(client: Arc<dyn SearchEngineClient>, config: LoaderConfig) -> Self {
        Self { client, config }
    }

    /// Load `batch` into `target_index`.
    ///
    /// An empty batch does not reach the engine.
    #[instrument(skip(self, batch), fields(batch_size = batch.len()))]
    pub async fn load_batch(
        &self,
        batch: Vec<Document>,
        target_index: &str,
    ) -> Result<BatchOutcome, LoadError> {
        if batch.is_empty() {
            return Ok(BatchOutcome::default());
        }

        let operations: Vec<BulkOperation> = batch
            .into_iter()
            .map(|doc| BulkOperation::create(target_index, doc))
            .collect();

        let response = self
            .client
            .bulk_write(&operations, self.config.refresh)
            .await?;

        if !response.rejections.is_empty() {
            warn!(
                rejected = response.rejections.len(),
                first_id = %response.rejections[0].id,
                first_reason = %response.rejections[0].reason,
                "Documents rejected by the engine"
            );
        }
        debug!(succeeded = response.succeeded, "Batch written");

        Ok(BatchOutcome {
            succeeded: response.succeeded,
            rejections: response.rejections,
        })
    }
}
