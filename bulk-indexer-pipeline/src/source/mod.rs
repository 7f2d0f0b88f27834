//! NDJSON document source.
//!
//! Reads one JSON record per line, lazily, so only the batch being filled is
//! held in memory.

use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;
use std::sync::Arc;

use serde_json::Value;
use tracing::info;

use crate::errors::LoadError;
use crate::transform::DocumentTransform;
use bulk_indexer_shared::Document;

/// Default field holding the document id.
pub const DEFAULT_ID_FIELD: &str = "complaint_id";

/// Lazy, fallible sequence of documents consumed by the orchestrator.
pub type DocumentStream = Box<dyn Iterator<Item = Result<Document, LoadError>> + Send>;

/// Iterator over the records of an NDJSON reader.
///
/// Blank lines are skipped. An unreadable or malformed line, or a record
/// without a usable id, ends the stream with a `SourceError` naming the line.
pub struct NdjsonSource<R> {
    lines: Lines<R>,
    line_number: usize,
    id_field: String,
    transform: Arc<dyn DocumentTransform>,
    failed: bool,
}

impl<R: BufRead> NdjsonSource<R> {
    pub fn new(
        reader: R,
        id_field: impl Into<String>,
        transform: Arc<dyn DocumentTransform>,
    ) -> Self {
        Self {
            lines: reader.lines(),
            line_number: 0,
            id_field: id_field.into(),
            transform,
            failed: false,
        }
    }

    fn parse(&self, line: &str) -> Result<Document, LoadError> {
        let record: Value = serde_json::from_str(line).map_err(|e| {
            LoadError::source(format!("line {}: invalid JSON: {}", self.line_number, e))
        })?;

        let record = self.transform.apply(record);
        Document::from_value(record, &self.id_field).ok_or_else(|| {
            LoadError::source(format!(
                "line {}: record has no usable {} field",
                self.line_number, self.id_field
            ))
        })
    }
}

impl<R: BufRead> Iterator for NdjsonSource<R> {
    type Item = Result<Document, LoadError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        loop {
            let line = self.lines.next()?;
            self.line_number += 1;

            let result = match line {
                Ok(line) if line.trim().is_empty() => continue,
                Ok(line) => self.parse(&line),
                Err(e) => Err(LoadError::source(format!(
                    "line {}: read failed: {}",
                    self.line_number, e
                ))),
            };

            self.failed = result.is_err();
            return Some(result);
        }
    }
}

/// Open the NDJSON dataset at `path`.
pub fn open(
    path: &Path,
    id_field: &str,
    transform: Arc<dyn DocumentTransform>,
) -> Result<DocumentStream, LoadError> {
    let file = File::open(path).map_err(|e| {
        LoadError::source(format!("cannot open dataset {}: {}", path.display(), e))
    })?;

    info!(
        path = %path.display(),
        id_field = %id_field,
        transform = transform.name(),
        "Opened dataset"
    );

    Ok(Box::new(NdjsonSource::new(
        BufReader::new(file),
        id_field,
        transform,
    )))
}
