//! # Bulk Indexer
//!
//! Main library for the blue/green bulk indexer.
//!
//! This crate provides the configuration, dependency wiring and entry point
//! for loading a dataset into a search index behind an alias.

pub mod config;

pub use config::{Cli, Dependencies, LogFormat, RunConfig};

use std::path::Path;

use bulk_indexer_pipeline::{source, LoadError};
use bulk_indexer_shared::LoadReport;
use thiserror::Error;
use tracing::{info, instrument, warn};

/// Errors that can occur during indexer initialization or execution.
#[derive(Error, Debug)]
pub enum IndexingError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Load error.
    #[error("Load error: {0}")]
    LoadError(#[from] LoadError),

    /// Search error.
    #[error("Search error: {0}")]
    SearchError(#[from] bulk_indexer_repository::SearchError),

    /// Report could not be written.
    #[error("Report error: {0}")]
    ReportError(String),
}

impl IndexingError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Process exit status for this error.
    ///
    /// Configuration problems exit with 2, schema rejections with 3, an alias
    /// that needs operator attention with 4, and everything else with 1.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::ConfigError(_) => 2,
            Self::LoadError(e) => match e.root_cause() {
                LoadError::ConfigError(_) => 2,
                LoadError::SchemaError(_) => 3,
                LoadError::AliasUnresolved { .. } => 4,
                _ => 1,
            },
            Self::SearchError(_) | Self::ReportError(_) => 1,
        }
    }
}

/// Run one load with the given configuration.
///
/// The report is written to `config.report_path` when set, for committed and
/// rolled back runs alike.
#[instrument(skip(config), fields(alias = %config.load.alias))]
pub async fn run(config: &RunConfig) -> Result<LoadReport, IndexingError> {
    let documents = source::open(&config.dataset, &config.id_field, config.transform())?;

    let dependencies = Dependencies::new(config).await?;
    let mut orchestrator = dependencies.orchestrator;

    info!("Begin indexing data");
    match orchestrator.run(documents).await {
        Ok(report) => {
            if let Some(path) = &config.report_path {
                write_report(path, &report)?;
            }
            Ok(report)
        }
        Err(e) => {
            if let (Some(path), Some(report)) = (&config.report_path, e.report()) {
                if let Err(write_err) = write_report(path, report) {
                    warn!(error = %write_err, "Could not write report of failed run");
                }
            }
            Err(e.into())
        }
    }
}

/// Write `report` to `path` as pretty-printed JSON.
pub fn write_report(path: &Path, report: &LoadReport) -> Result<(), IndexingError> {
    let json = serde_json::to_string_pretty(report)
        .map_err(|e| IndexingError::ReportError(e.to_string()))?;
    std::fs::write(path, json).map_err(|e| {
        IndexingError::ReportError(format!("cannot write {}: {}", path.display(), e))
    })?;

    info!(path = %path.display(), "Wrote load report");
    Ok(())
}
