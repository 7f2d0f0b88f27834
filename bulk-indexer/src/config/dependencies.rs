//! Dependency initialization and wiring for the bulk indexer.

use std::sync::Arc;
use tracing::info;

use crate::config::RunConfig;
use crate::IndexingError;
use bulk_indexer_pipeline::LoadOrchestrator;
use bulk_indexer_repository::{OpenSearchClient, SearchEngineClient, SearchError};

/// Container for all initialized dependencies.
pub struct Dependencies {
    /// The configured orchestrator ready to run.
    pub orchestrator: LoadOrchestrator,
}

impl Dependencies {
    /// Connect to OpenSearch and build the orchestrator for `config`.
    ///
    /// # Returns
    ///
    /// * `Ok(Dependencies)` - Initialized dependencies
    /// * `Err(IndexingError)` - If the client cannot be created or the
    ///   cluster is unreachable or unhealthy
    pub async fn new(config: &RunConfig) -> Result<Self, IndexingError> {
        info!(
            opensearch_url = %config.opensearch.url,
            alias = %config.load.alias,
            "Creating OpenSearch connection"
        );

        let search_client = OpenSearchClient::new(config.opensearch.clone()).await?;

        // Verify OpenSearch is reachable
        if !search_client.health_check().await? {
            return Err(SearchError::connection("OpenSearch cluster is unhealthy").into());
        }

        info!("OpenSearch connection verified");

        let client: Arc<dyn SearchEngineClient> = Arc::new(search_client);
        let orchestrator = LoadOrchestrator::new(client, config.load.clone());

        Ok(Self { orchestrator })
    }
}
