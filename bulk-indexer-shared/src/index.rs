//! Physical index naming and role types.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// The two physical indices that rotate behind one alias.
///
/// Names are derived from the alias: `{alias}-v1` and `{alias}-v2`. Which one
/// is live is never stored here; it is read from the alias on every run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexPair {
    /// The name built on the very first run.
    pub primary: String,
    /// The other name.
    pub secondary: String,
}

impl IndexPair {
    /// Create a pair from explicit names.
    pub fn new(primary: impl Into<String>, secondary: impl Into<String>) -> Self {
        Self {
            primary: primary.into(),
            secondary: secondary.into(),
        }
    }

    /// Derive the pair from an alias name.
    pub fn for_alias(alias: &str) -> Self {
        Self::new(format!("{}-v1", alias), format!("{}-v2", alias))
    }

    /// Return the member of the pair that is not `name`.
    pub fn other(&self, name: &str) -> &str {
        if name == self.primary {
            &self.secondary
        } else {
            &self.primary
        }
    }
}

/// Roles of the two indices for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexRoles {
    /// The index currently serving reads (or the nominal one on bootstrap).
    pub live: String,
    /// The non-serving index; this is the rebuild target.
    pub backup: String,
    /// Whether the alias pointed at `live` before the run.
    pub alias_bound: bool,
}

/// Settings and field mapping used when (re)creating an index.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct IndexSchema {
    /// Index settings document (shards, analyzers, ...).
    pub settings: Value,
    /// Field mapping document.
    pub mappings: Value,
}

impl IndexSchema {
    /// Create a schema from its two documents.
    pub fn new(settings: Value, mappings: Value) -> Self {
        Self { settings, mappings }
    }

    /// Body for an index creation request.
    pub fn to_create_body(&self) -> Value {
        json!({
            "settings": self.settings,
            "mappings": self.mappings,
        })
    }
}
