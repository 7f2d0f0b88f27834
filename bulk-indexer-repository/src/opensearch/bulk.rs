//! OpenSearch request body builders and response parsers.
//!
//! Kept free of I/O so the wire format can be tested without a cluster.

use serde_json::{json, Value};

use crate::errors::SearchError;
use crate::types::{AliasAction, BulkOperation, BulkResponse};
use bulk_indexer_shared::DocumentRejection;

/// Build the line sequence of a bulk request: an action line followed by the
/// document source for every operation.
pub fn build_bulk_body(operations: &[BulkOperation]) -> Vec<Value> {
    let mut body = Vec::with_capacity(operations.len() * 2);
    for op in operations {
        body.push(op.action_line());
        body.push(op.body.clone());
    }
    body
}

/// Build the body of an `_aliases` request.
pub fn build_alias_body(actions: &[AliasAction]) -> Value {
    let actions: Vec<Value> = actions.iter().map(AliasAction::to_json).collect();
    json!({ "actions": actions })
}

/// Parse a bulk response into accepted and refused operations.
///
/// Each entry of `items` holds a single key (the operation type) whose value
/// carries `_id`, `status` and, on failure, `error`.
pub fn parse_bulk_response(response: &Value) -> Result<BulkResponse, SearchError> {
    let items = response["items"]
        .as_array()
        .ok_or_else(|| SearchError::parse("bulk response has no items array"))?;

    let mut result = BulkResponse::default();

    for item in items {
        let outcome = item
            .as_object()
            .and_then(|obj| obj.values().next())
            .ok_or_else(|| SearchError::parse(format!("malformed bulk item: {}", item)))?;

        let status = outcome["status"].as_u64().unwrap_or(0);
        let error = &outcome["error"];

        if (200..300).contains(&status) && error.is_null() {
            result.succeeded += 1;
        } else {
            let id = outcome["_id"].as_str().unwrap_or_default();
            result
                .rejections
                .push(DocumentRejection::new(id, rejection_reason(status, error)));
        }
    }

    Ok(result)
}

/// Whether an error response of index creation means the name is taken.
pub fn is_already_exists(body: &str) -> bool {
    body.contains("resource_already_exists_exception")
}

fn rejection_reason(status: u64, error: &Value) -> String {
    match (error["type"].as_str(), error["reason"].as_str()) {
        (Some(kind), Some(reason)) => format!("{}: {}", kind, reason),
        (Some(kind), None) => kind.to_string(),
        (None, Some(reason)) => reason.to_string(),
        (None, None) => format!("status {}", status),
    }
}
