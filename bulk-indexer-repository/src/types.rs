//! Request and response types for search engine operations.

use bulk_indexer_shared::{Document, DocumentRejection};
use serde_json::{json, Value};

/// One action of an alias update request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AliasAction {
    /// Bind `alias` to `index`.
    Add { alias: String, index: String },
    /// Unbind `alias` from `index`.
    Remove { alias: String, index: String },
}

impl AliasAction {
    pub fn add(alias: impl Into<String>, index: impl Into<String>) -> Self {
        Self::Add {
            alias: alias.into(),
            index: index.into(),
        }
    }

    pub fn remove(alias: impl Into<String>, index: impl Into<String>) -> Self {
        Self::Remove {
            alias: alias.into(),
            index: index.into(),
        }
    }

    /// JSON form used by the `_aliases` endpoint.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Add { alias, index } => json!({ "add": { "index": index, "alias": alias } }),
            Self::Remove { alias, index } => {
                json!({ "remove": { "index": index, "alias": alias } })
            }
        }
    }
}

/// A `create` operation of a bulk request.
///
/// Create fails for an id that already exists instead of overwriting it.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkOperation {
    pub id: String,
    pub index: String,
    pub body: Value,
}

impl BulkOperation {
    /// Build a create operation for `document` targeting `index`.
    pub fn create(index: impl Into<String>, document: Document) -> Self {
        Self {
            id: document.id,
            index: index.into(),
            body: document.body,
        }
    }

    /// Action line preceding the source line in NDJSON bulk bodies.
    pub fn action_line(&self) -> Value {
        json!({ "create": { "_index": self.index, "_id": self.id } })
    }
}

/// Result of a bulk request that reached the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkResponse {
    /// Number of operations the engine accepted.
    pub succeeded: usize,
    /// Operations the engine refused, in request order.
    pub rejections: Vec<DocumentRejection>,
}

impl BulkResponse {
    /// Total operations covered by the response.
    pub fn total(&self) -> usize {
        self.succeeded + self.rejections.len()
    }
}
