//! Index builder module for the bulk indexer pipeline.
//!
//! Creates the physical indices and rebuilds the load target from scratch.

use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::errors::LoadError;
use bulk_indexer_repository::{SearchEngineClient, SearchError};
use bulk_indexer_shared::IndexSchema;

pub struct IndexBuilder {
    client: Arc<dyn SearchEngineClient>,
}

impl IndexBuilder {
    pub fn new(client: Arc<dyn SearchEngineClient>) -> Self {
        Self { client }
    }

    /// Create `name` with engine defaults unless it already exists.
    ///
    /// Losing a creation race to another writer is not an error.
    #[instrument(skip(self))]
    pub async fn ensure_exists(&self, name: &str) -> Result<(), LoadError> {
        if self.client.index_exists(name).await? {
            debug!(index = %name, "Index already exists");
            return Ok(());
        }

        match self.client.create_index(name, None).await {
            Ok(()) | Err(SearchError::IndexAlreadyExists(_)) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete `name` if present and create it again with `schema`.
    ///
    /// Settings or mappings refused by the engine surface as `SchemaError`.
    #[instrument(skip(self, schema))]
    pub async fn rebuild(&self, name: &str, schema: &IndexSchema) -> Result<(), LoadError> {
        if self.client.index_exists(name).await? {
            info!(index = %name, "Deleting and recreating index");
            self.client.delete_index(name).await?;
        }

        debug!(index = %name, "Creating index with mappings and settings");
        self.client.create_index(name, Some(schema)).await?;
        Ok(())
    }
}
