//! OpenSearch client implementation.
//!
//! This module provides the concrete implementation of `SearchEngineClient`
//! using the OpenSearch Rust client.

use async_trait::async_trait;
use opensearch::{
    cluster::ClusterHealthParts,
    http::{
        request::JsonBody,
        response::Response,
        transport::{SingleNodeConnectionPool, TransportBuilder},
    },
    indices::{IndicesCreateParts, IndicesDeleteParts, IndicesExistsAliasParts, IndicesExistsParts},
    params::Refresh,
    BulkParts, CountParts, OpenSearch,
};
use serde_json::Value;
use tracing::{debug, error, info, instrument};
use url::Url;

use crate::errors::SearchError;
use crate::interfaces::SearchEngineClient;
use crate::opensearch::bulk::{
    build_alias_body, build_bulk_body, is_already_exists, parse_bulk_response,
};
use crate::opensearch::config::OpenSearchConfig;
use crate::types::{AliasAction, BulkOperation, BulkResponse};
use bulk_indexer_shared::IndexSchema;

/// OpenSearch client implementation.
///
/// # Example
///
/// ```ignore
/// let config = OpenSearchConfig::new("http://localhost:9200");
/// let client = OpenSearchClient::new(config).await?;
///
/// if !client.index_exists("complaints-v1").await? {
///     client.create_index("complaints-v1", None).await?;
/// }
/// ```
pub struct OpenSearchClient {
    client: OpenSearch,
}

impl OpenSearchClient {
    /// Create a new OpenSearch client connected to the configured URL.
    ///
    /// # Returns
    ///
    /// * `Ok(OpenSearchClient)` - A new client instance
    /// * `Err(SearchError)` - If connection setup fails
    pub async fn new(config: OpenSearchConfig) -> Result<Self, SearchError> {
        let parsed_url =
            Url::parse(&config.url).map_err(|e| SearchError::connection(e.to_string()))?;

        let conn_pool = SingleNodeConnectionPool::new(parsed_url);
        let transport = TransportBuilder::new(conn_pool)
            .disable_proxy()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| SearchError::connection(e.to_string()))?;

        let client = OpenSearch::new(transport);

        info!(
            url = %config.url,
            timeout_secs = config.request_timeout.as_secs(),
            "Created OpenSearch client"
        );

        Ok(Self { client })
    }

    /// Map a non-success response to an error.
    ///
    /// Overload and server-side failures mean the request could not be
    /// processed at all and are reported as connection errors.
    async fn status_error(
        response: Response,
        context: &str,
        otherwise: fn(String) -> SearchError,
    ) -> SearchError {
        let status = response.status_code().as_u16();
        let body = response.text().await.unwrap_or_default();
        error!(status = status, body = %body, context = context, "Request failed");

        let message = format!("{} failed with status {}: {}", context, status, body);
        if status == 429 || status >= 500 {
            SearchError::connection(message)
        } else {
            otherwise(message)
        }
    }

    /// Interpret a HEAD-style existence check.
    async fn exists_status(
        response: Response,
        context: &str,
        otherwise: fn(String) -> SearchError,
    ) -> Result<bool, SearchError> {
        match response.status_code().as_u16() {
            200 => Ok(true),
            404 => Ok(false),
            _ => Err(Self::status_error(response, context, otherwise).await),
        }
    }
}

#[async_trait]
impl SearchEngineClient for OpenSearchClient {
    async fn index_exists(&self, index: &str) -> Result<bool, SearchError> {
        let response = self
            .client
            .indices()
            .exists(IndicesExistsParts::Index(&[index]))
            .send()
            .await
            .map_err(|e| SearchError::connection(e.to_string()))?;

        Self::exists_status(response, "Index exists check", SearchError::QueryError).await
    }

    #[instrument(skip(self, schema), fields(with_schema = schema.is_some()))]
    async fn create_index(
        &self,
        index: &str,
        schema: Option<&IndexSchema>,
    ) -> Result<(), SearchError> {
        let indices = self.client.indices();
        let request = indices.create(IndicesCreateParts::Index(index));
        let response = match schema {
            Some(schema) => request.body(schema.to_create_body()).send().await,
            None => request.send().await,
        }
        .map_err(|e| SearchError::connection(e.to_string()))?;

        let status = response.status_code();
        if status.is_success() {
            info!(index = %index, "Created index");
            return Ok(());
        }

        if status.as_u16() == 400 {
            let body = response.text().await.unwrap_or_default();
            if is_already_exists(&body) {
                return Err(SearchError::IndexAlreadyExists(index.to_string()));
            }
            error!(index = %index, body = %body, "Index settings or mappings rejected");
            return Err(SearchError::schema(format!(
                "Creating index {} was rejected: {}",
                index, body
            )));
        }

        Err(Self::status_error(response, "Create index", SearchError::IndexCreationError).await)
    }

    #[instrument(skip(self))]
    async fn delete_index(&self, index: &str) -> Result<(), SearchError> {
        let response = self
            .client
            .indices()
            .delete(IndicesDeleteParts::Index(&[index]))
            .send()
            .await
            .map_err(|e| SearchError::connection(e.to_string()))?;

        let status = response.status_code();

        // 404 is acceptable - index may not exist
        if !status.is_success() && status.as_u16() != 404 {
            return Err(
                Self::status_error(response, "Delete index", SearchError::IndexDeletionError)
                    .await,
            );
        }

        info!(index = %index, "Deleted index");
        Ok(())
    }

    async fn alias_exists(&self, alias: &str) -> Result<bool, SearchError> {
        let response = self
            .client
            .indices()
            .exists_alias(IndicesExistsAliasParts::Name(&[alias]))
            .send()
            .await
            .map_err(|e| SearchError::connection(e.to_string()))?;

        Self::exists_status(response, "Alias exists check", SearchError::AliasError).await
    }

    async fn alias_bound_to(&self, alias: &str, index: &str) -> Result<bool, SearchError> {
        let response = self
            .client
            .indices()
            .exists_alias(IndicesExistsAliasParts::IndexName(&[index], &[alias]))
            .send()
            .await
            .map_err(|e| SearchError::connection(e.to_string()))?;

        Self::exists_status(response, "Alias binding check", SearchError::AliasError).await
    }

    #[instrument(skip(self, actions), fields(action_count = actions.len()))]
    async fn update_aliases(&self, actions: &[AliasAction]) -> Result<(), SearchError> {
        let response = self
            .client
            .indices()
            .update_aliases()
            .body(build_alias_body(actions))
            .send()
            .await
            .map_err(|e| SearchError::connection(e.to_string()))?;

        if !response.status_code().is_success() {
            return Err(
                Self::status_error(response, "Update aliases", SearchError::AliasError).await,
            );
        }

        debug!(actions = ?actions, "Alias actions applied");
        Ok(())
    }

    #[instrument(skip(self, operations), fields(operation_count = operations.len()))]
    async fn bulk_write(
        &self,
        operations: &[BulkOperation],
        refresh: bool,
    ) -> Result<BulkResponse, SearchError> {
        if operations.is_empty() {
            return Ok(BulkResponse::default());
        }

        let body: Vec<JsonBody<Value>> = build_bulk_body(operations)
            .into_iter()
            .map(JsonBody::from)
            .collect();

        let refresh = if refresh { Refresh::True } else { Refresh::False };

        let response = self
            .client
            .bulk(BulkParts::None)
            .body(body)
            .refresh(refresh)
            .send()
            .await
            .map_err(|e| SearchError::connection(e.to_string()))?;

        if !response.status_code().is_success() {
            return Err(
                Self::status_error(response, "Bulk request", SearchError::BulkIndexError).await,
            );
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| SearchError::parse(e.to_string()))?;

        let result = parse_bulk_response(&json)?;
        debug!(
            succeeded = result.succeeded,
            rejected = result.rejections.len(),
            "Bulk request completed"
        );
        Ok(result)
    }

    async fn document_count(&self, index: &str) -> Result<u64, SearchError> {
        let response = self
            .client
            .count(CountParts::Index(&[index]))
            .send()
            .await
            .map_err(|e| SearchError::connection(e.to_string()))?;

        if !response.status_code().is_success() {
            return Err(Self::status_error(response, "Count", SearchError::QueryError).await);
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| SearchError::parse(e.to_string()))?;

        json["count"]
            .as_u64()
            .ok_or_else(|| SearchError::parse("count response has no count field"))
    }

    async fn health_check(&self) -> Result<bool, SearchError> {
        let response = self
            .client
            .cluster()
            .health(ClusterHealthParts::None)
            .send()
            .await
            .map_err(|e| SearchError::connection(e.to_string()))?;

        if !response.status_code().is_success() {
            return Ok(false);
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| SearchError::parse(e.to_string()))?;

        let status = json["status"].as_str().unwrap_or("red");
        debug!(cluster_status = %status, "Cluster health");
        Ok(status == "green" || status == "yellow")
    }
}
