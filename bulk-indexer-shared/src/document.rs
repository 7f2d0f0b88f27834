//! Document record passed from the source to the bulk loader.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A ready-to-index record.
///
/// The loader only looks at `id`, which becomes the engine document id for
/// `create` semantics. The body is sent as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Unique identifier of the record within the dataset.
    pub id: String,
    /// Opaque JSON payload.
    pub body: Value,
}

impl Document {
    /// Create a new document.
    pub fn new(id: impl Into<String>, body: Value) -> Self {
        Self {
            id: id.into(),
            body,
        }
    }

    /// Build a document from a JSON object, reading the id from `id_field`.
    ///
    /// String and numeric id values are accepted; anything else (including a
    /// missing field or an empty string) yields `None`.
    pub fn from_value(body: Value, id_field: &str) -> Option<Self> {
        let id = match body.get(id_field)? {
            Value::String(s) if !s.is_empty() => s.clone(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        Some(Self { id, body })
    }
}
