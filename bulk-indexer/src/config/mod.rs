//! Command line and file configuration for the bulk indexer.

mod dependencies;

pub use dependencies::Dependencies;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use serde_json::Value;
use tracing::info;

use crate::IndexingError;
use bulk_indexer_pipeline::batcher::DEFAULT_BATCH_SIZE;
use bulk_indexer_pipeline::loader::LoaderConfig;
use bulk_indexer_pipeline::orchestrator::DEFAULT_PREFETCH_BATCHES;
use bulk_indexer_pipeline::source::DEFAULT_ID_FIELD;
use bulk_indexer_pipeline::transform::{ComplaintEnrichment, DocumentTransform, Passthrough};
use bulk_indexer_pipeline::LoadConfig;
use bulk_indexer_repository::opensearch::{DEFAULT_OPENSEARCH_URL, DEFAULT_REQUEST_TIMEOUT};
use bulk_indexer_repository::OpenSearchConfig;
use bulk_indexer_shared::IndexSchema;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "bulk-indexer")]
#[command(about = "Fill a search index with NDJSON data behind a blue/green alias", long_about = None)]
pub struct Cli {
    /// OpenSearch URL
    #[arg(long, env = "OPENSEARCH_URL", default_value = DEFAULT_OPENSEARCH_URL)]
    pub opensearch_url: String,

    /// Alias readers query; the indices are `{alias}-v1` and `{alias}-v2`
    #[arg(long = "index-name", env = "INDEX_ALIAS")]
    pub index_alias: String,

    /// Index settings document (JSON)
    #[arg(long, env = "INDEX_SETTINGS")]
    pub settings: PathBuf,

    /// Index mappings document (JSON)
    #[arg(long, env = "INDEX_MAPPING")]
    pub mapping: PathBuf,

    /// Dataset in NDJSON format
    #[arg(long, env = "DATASET")]
    pub dataset: PathBuf,

    /// Documents per bulk request
    #[arg(long, env = "BATCH_SIZE", default_value_t = DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,

    /// Field holding the document id
    #[arg(long, default_value = DEFAULT_ID_FIELD)]
    pub id_field: String,

    /// Add derived complaint metadata (dates, narrative flag)
    #[arg(long)]
    pub merge_metadata: bool,

    /// Index records as they are, without complaint enrichment
    #[arg(long, conflicts_with = "merge_metadata")]
    pub raw: bool,

    /// Do not refresh the index after each bulk request
    #[arg(long)]
    pub no_refresh: bool,

    /// Batches parsed ahead of the one being written
    #[arg(long, default_value_t = DEFAULT_PREFETCH_BATCHES)]
    pub prefetch: usize,

    /// Per-request timeout in seconds
    #[arg(long, env = "OPENSEARCH_TIMEOUT", default_value_t = DEFAULT_REQUEST_TIMEOUT.as_secs())]
    pub timeout_secs: u64,

    /// Write the load report as JSON to this file
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Log the resolved configuration before running
    #[arg(long)]
    pub dump_config: bool,
}

impl Cli {
    /// Log every configuration value.
    pub fn dump(&self) {
        info!(
            opensearch_url = %self.opensearch_url,
            index_alias = %self.index_alias,
            settings = %self.settings.display(),
            mapping = %self.mapping.display(),
            dataset = %self.dataset.display(),
            batch_size = self.batch_size,
            id_field = %self.id_field,
            merge_metadata = self.merge_metadata,
            raw = self.raw,
            refresh = !self.no_refresh,
            prefetch = self.prefetch,
            timeout_secs = self.timeout_secs,
            report = ?self.report,
            "Running bulk-indexer with"
        );
    }
}

/// Enrichment applied to source records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enrichment {
    None,
    Complaint { merge_metadata: bool },
}

/// Validated configuration of one run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub opensearch: OpenSearchConfig,
    pub load: LoadConfig,
    pub dataset: PathBuf,
    pub id_field: String,
    pub enrichment: Enrichment,
    pub report_path: Option<PathBuf>,
}

impl RunConfig {
    /// Validate `cli` and read the settings and mapping documents.
    pub fn from_cli(cli: &Cli) -> Result<Self, IndexingError> {
        let alias = cli.index_alias.trim();
        if alias.is_empty() {
            return Err(IndexingError::config("index name must not be empty"));
        }
        if cli.batch_size == 0 {
            return Err(IndexingError::config("batch size must be greater than zero"));
        }
        if cli.prefetch == 0 {
            return Err(IndexingError::config("prefetch must be greater than zero"));
        }
        if cli.id_field.is_empty() {
            return Err(IndexingError::config("id field must not be empty"));
        }

        let settings = load_json(&cli.settings)?;
        let mappings = load_json(&cli.mapping)?;

        let load = LoadConfig::new(alias, IndexSchema::new(settings, mappings))
            .with_batch_size(cli.batch_size)
            .with_prefetch_batches(cli.prefetch)
            .with_loader(LoaderConfig {
                refresh: !cli.no_refresh,
            });

        let enrichment = if cli.raw {
            Enrichment::None
        } else {
            Enrichment::Complaint {
                merge_metadata: cli.merge_metadata,
            }
        };

        Ok(Self {
            opensearch: OpenSearchConfig::new(&cli.opensearch_url)
                .with_request_timeout(Duration::from_secs(cli.timeout_secs)),
            load,
            dataset: cli.dataset.clone(),
            id_field: cli.id_field.clone(),
            enrichment,
            report_path: cli.report.clone(),
        })
    }

    /// Transform applied by the document source.
    pub fn transform(&self) -> Arc<dyn DocumentTransform> {
        match self.enrichment {
            Enrichment::None => Arc::new(Passthrough),
            Enrichment::Complaint { merge_metadata } => {
                Arc::new(ComplaintEnrichment::new(merge_metadata))
            }
        }
    }
}

/// Read a JSON object from `path`.
pub fn load_json(path: &Path) -> Result<Value, IndexingError> {
    let contents = fs::read_to_string(path)
        .map_err(|e| IndexingError::config(format!("cannot read {}: {}", path.display(), e)))?;

    let value: Value = serde_json::from_str(&contents).map_err(|e| {
        IndexingError::config(format!("file {} is not valid JSON: {}", path.display(), e))
    })?;

    if !value.is_object() {
        return Err(IndexingError::config(format!(
            "file {} must hold a JSON object",
            path.display()
        )));
    }
    Ok(value)
}
