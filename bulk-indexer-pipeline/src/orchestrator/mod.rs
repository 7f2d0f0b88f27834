//! Orchestrator module for the bulk indexer pipeline.
//!
//! Runs one blue/green load: resolve roles, rebuild the backup index, stream
//! batches into it, then commit the alias or roll it back.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::broadcast::error::TryRecvError;
use tokio::sync::{broadcast, mpsc};
use tokio_stream::{wrappers::ReceiverStream, StreamExt};
use tracing::{error, info, instrument, warn};

use crate::alias::AliasController;
use crate::batcher::{try_produce_batches, DEFAULT_BATCH_SIZE};
use crate::builder::IndexBuilder;
use crate::errors::LoadError;
use crate::loader::{BulkLoader, LoaderConfig};
use crate::source::DocumentStream;
use bulk_indexer_repository::SearchEngineClient;
use bulk_indexer_shared::{
    BatchReport, Document, IndexPair, IndexRoles, IndexSchema, LoadReport, RunStatus,
};

/// Default number of batches parsed ahead of the one being written.
pub const DEFAULT_PREFETCH_BATCHES: usize = 1;

/// Default number of rejections kept in the report.
pub const DEFAULT_MAX_REJECTIONS: usize = 1000;

/// Configuration for one load run.
#[derive(Debug, Clone)]
pub struct LoadConfig {
    /// Alias readers query.
    pub alias: String,
    /// Physical indices behind the alias.
    pub indices: IndexPair,
    /// Settings and mappings of the rebuilt index.
    pub schema: IndexSchema,
    /// Number of documents per bulk request.
    pub batch_size: usize,
    /// Number of batches buffered between the source and the loader.
    pub prefetch_batches: usize,
    /// Number of rejections kept in the report.
    pub max_rejections: usize,
    /// Bulk loader settings.
    pub loader: LoaderConfig,
}

impl LoadConfig {
    /// Configuration for `alias` with indices `{alias}-v1` and `{alias}-v2`.
    pub fn new(alias: impl Into<String>, schema: IndexSchema) -> Self {
        let alias = alias.into();
        Self {
            indices: IndexPair::for_alias(&alias),
            alias,
            schema,
            batch_size: DEFAULT_BATCH_SIZE,
            prefetch_batches: DEFAULT_PREFETCH_BATCHES,
            max_rejections: DEFAULT_MAX_REJECTIONS,
            loader: LoaderConfig::default(),
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_prefetch_batches(mut self, prefetch_batches: usize) -> Self {
        self.prefetch_batches = prefetch_batches;
        self
    }

    pub fn with_loader(mut self, loader: LoaderConfig) -> Self {
        self.loader = loader;
        self
    }
}

/// Stage of a load run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Idle,
    RolesResolved,
    IndexRebuilt,
    Loading,
    Committing,
    Committed,
    RollingBack,
    RolledBack,
}

impl fmt::Display for LoadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::RolesResolved => "roles_resolved",
            Self::IndexRebuilt => "index_rebuilt",
            Self::Loading => "loading",
            Self::Committing => "committing",
            Self::Committed => "committed",
            Self::RollingBack => "rolling_back",
            Self::RolledBack => "rolled_back",
        };
        f.write_str(name)
    }
}

/// Orchestrator that runs blue/green loads.
///
/// The orchestrator:
/// - Derives the live and backup index from the alias
/// - Rebuilds the backup index with the configured schema
/// - Streams the source into it batch by batch
/// - Moves the alias only after every batch was written
/// - Restores the alias when the load fails or is interrupted
pub struct LoadOrchestrator {
    client: Arc<dyn SearchEngineClient>,
    builder: IndexBuilder,
    loader: BulkLoader,
    aliases: AliasController,
    config: LoadConfig,
    state: LoadState,
    shutdown_tx: broadcast::Sender<()>,
    shutdown_rx: broadcast::Receiver<()>,
}

impl LoadOrchestrator {
    /// Create a new orchestrator with the given client and configuration.
    pub fn new(client: Arc<dyn SearchEngineClient>, config: LoadConfig) -> Self {
        Self::with_alias_controller(client.clone(), config, AliasController::new(client))
    }

    /// Create a new orchestrator with a custom alias controller.
    pub fn with_alias_controller(
        client: Arc<dyn SearchEngineClient>,
        config: LoadConfig,
        aliases: AliasController,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        Self {
            builder: IndexBuilder::new(client.clone()),
            loader: BulkLoader::with_config(client.clone(), config.loader),
            client,
            aliases,
            config,
            state: LoadState::Idle,
            shutdown_tx,
            shutdown_rx,
        }
    }

    /// Current stage of the run.
    pub fn state(&self) -> LoadState {
        self.state
    }

    /// Handle that interrupts a running load when sent to.
    pub fn shutdown_handle(&self) -> broadcast::Sender<()> {
        self.shutdown_tx.clone()
    }

    /// Trigger a graceful shutdown.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Run one load of `source` into the backup index.
    ///
    /// On success the alias points at the freshly loaded index and the report
    /// has status `committed`. A failure during loading restores the alias
    /// and returns `LoadError::RolledBack` carrying the partial report.
    /// Failures before loading leave the alias untouched, as does a shutdown
    /// requested before loading started.
    #[instrument(skip(self, source), fields(alias = %self.config.alias))]
    pub async fn run(&mut self, source: DocumentStream) -> Result<LoadReport, LoadError> {
        self.state = LoadState::Idle;
        let alias = self.config.alias.clone();

        let roles = self
            .aliases
            .resolve_roles(&alias, &self.config.indices)
            .await?;
        self.transition(LoadState::RolesResolved);
        self.check_shutdown()?;

        self.builder.ensure_exists(&roles.live).await?;
        self.builder.ensure_exists(&roles.backup).await?;
        self.builder
            .rebuild(&roles.backup, &self.config.schema)
            .await?;
        self.transition(LoadState::IndexRebuilt);
        self.check_shutdown()?;

        let previous = roles.alias_bound.then(|| roles.live.clone());
        let mut report = LoadReport::new(alias.as_str(), roles.backup.as_str(), previous);

        self.transition(LoadState::Loading);
        info!(
            index = %roles.backup,
            batch_size = self.config.batch_size,
            "Loading data"
        );

        if let Err(cause) = self.load_all(source, &roles.backup, &mut report).await {
            error!(
                error = %cause,
                "Error while loading data, reverting alias to original state"
            );
            return Err(self.roll_back(&roles, cause, report).await);
        }

        match self.client.document_count(&roles.backup).await {
            Ok(count) => info!(index = %roles.backup, count = count, "Index loaded"),
            Err(e) => warn!(index = %roles.backup, error = %e, "Could not count documents"),
        }

        self.transition(LoadState::Committing);
        if let Err(cause) = self.aliases.commit(&alias, &roles.live, &roles.backup).await {
            error!(error = %cause, "Alias commit failed, attempting rollback");
            self.transition(LoadState::RollingBack);

            let outcome = match self.aliases.rollback(&alias, &roles).await {
                Ok(()) => {
                    self.transition(LoadState::RolledBack);
                    report.finish(RunStatus::RolledBack);
                    "alias restored".to_string()
                }
                Err(e) => {
                    error!(error = %e, "Rollback after failed commit failed");
                    report.finish(RunStatus::Unresolved);
                    format!("rollback failed: {}", e)
                }
            };
            return Err(LoadError::alias_unresolved(
                alias,
                format!("commit failed: {}; {}", cause, outcome),
            )
            .with_report(report));
        }

        report.finish(RunStatus::Committed);
        self.transition(LoadState::Committed);
        info!(
            run_id = %report.run_id,
            index = %report.target_index,
            attempted = report.attempted,
            succeeded = report.succeeded,
            rejected = report.rejected,
            elapsed_ms = report.elapsed_ms().unwrap_or_default(),
            "Load committed"
        );
        Ok(report)
    }

    /// Stream `source` into `target` batch by batch.
    ///
    /// A blocking task reads and batches the source ahead of the writes.
    async fn load_all(
        &mut self,
        source: DocumentStream,
        target: &str,
        report: &mut LoadReport,
    ) -> Result<(), LoadError> {
        let (tx, rx) = mpsc::channel::<Result<Vec<Document>, LoadError>>(
            self.config.prefetch_batches.max(1),
        );
        let batch_size = self.config.batch_size;

        let producer = tokio::task::spawn_blocking(move || {
            for batch in try_produce_batches(source, batch_size) {
                if tx.blocking_send(batch).is_err() {
                    break;
                }
            }
        });

        let mut batches = ReceiverStream::new(rx);
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);
        let mut ctrl_c_armed = true;
        let mut sequence = 0;

        loop {
            tokio::select! {
                biased;

                _ = self.shutdown_rx.recv() => {
                    info!("Received shutdown signal");
                    return Err(LoadError::Interrupted);
                }
                signal = &mut ctrl_c, if ctrl_c_armed => {
                    match signal {
                        Ok(()) => {
                            info!("Received interrupt signal");
                            return Err(LoadError::Interrupted);
                        }
                        Err(e) => {
                            warn!(error = %e, "Cannot listen for interrupt signal");
                            ctrl_c_armed = false;
                        }
                    }
                }
                next = batches.next() => {
                    let batch = match next {
                        Some(batch) => batch?,
                        None => break,
                    };
                    if batch.is_empty() {
                        continue;
                    }

                    sequence += 1;
                    let attempted = batch.len();
                    let started = Instant::now();
                    info!(batch = sequence, size = attempted, "Batch retrieved, now bulk load");

                    let outcome = match self.loader.load_batch(batch, target).await {
                        Ok(outcome) => outcome,
                        Err(e) => {
                            let failed = BatchReport {
                                sequence,
                                attempted,
                                succeeded: 0,
                                rejected: 0,
                                elapsed_ms: started.elapsed().as_millis() as u64,
                            };
                            report.record_batch(failed, Vec::new(), self.config.max_rejections);
                            return Err(e);
                        }
                    };
                    let summary = BatchReport {
                        sequence,
                        attempted,
                        succeeded: outcome.succeeded,
                        rejected: outcome.rejected(),
                        elapsed_ms: started.elapsed().as_millis() as u64,
                    };
                    report.record_batch(summary, outcome.rejections, self.config.max_rejections);

                    info!(
                        batch = sequence,
                        indexed = outcome.succeeded,
                        total = report.succeeded,
                        "{} records indexed, total = {}",
                        outcome.succeeded,
                        report.succeeded
                    );
                }
            }
        }

        // The channel also closes when the producer panics.
        producer
            .await
            .map_err(|e| LoadError::source(format!("document source stopped: {}", e)))?;

        Ok(())
    }

    /// Restore the alias after a failed load and wrap `cause` with the
    /// partial report.
    async fn roll_back(
        &mut self,
        roles: &IndexRoles,
        cause: LoadError,
        mut report: LoadReport,
    ) -> LoadError {
        self.transition(LoadState::RollingBack);

        match self.aliases.rollback(&self.config.alias, roles).await {
            Ok(()) => {
                self.transition(LoadState::RolledBack);
                report.finish(RunStatus::RolledBack);
                LoadError::RolledBack {
                    cause: Box::new(cause),
                    report: Box::new(report),
                }
            }
            Err(e) => {
                error!(error = %e, "Rollback failed");
                report.finish(RunStatus::Unresolved);
                LoadError::alias_unresolved(
                    self.config.alias.as_str(),
                    format!("rollback after '{}' failed: {}", cause, e),
                )
                .with_report(report)
            }
        }
    }

    /// Fail with `Interrupted` if a shutdown is pending.
    fn check_shutdown(&mut self) -> Result<(), LoadError> {
        match self.shutdown_rx.try_recv() {
            Ok(()) | Err(TryRecvError::Lagged(_)) => {
                info!(state = %self.state, "Received shutdown signal");
                Err(LoadError::Interrupted)
            }
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => Ok(()),
        }
    }

    fn transition(&mut self, next: LoadState) {
        info!(from = %self.state, to = %next, "Load state changed");
        self.state = next;
    }
}
