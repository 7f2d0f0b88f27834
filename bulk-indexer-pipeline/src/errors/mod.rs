//! Error types for the bulk indexer pipeline.

use bulk_indexer_repository::SearchError;
use bulk_indexer_shared::LoadReport;
use thiserror::Error;

/// Errors that end a load run.
///
/// Per-document rejections are not errors; they are collected in the
/// `LoadReport`.
#[derive(Error, Debug)]
pub enum LoadError {
    /// Settings, mapping or run parameters are missing or invalid.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The engine refused the index settings or mapping.
    #[error("Schema error: {0}")]
    SchemaError(String),

    /// The engine could not be reached or could not process a request.
    #[error("Engine unavailable: {0}")]
    EngineUnavailable(String),

    /// The engine answered with an unexpected failure.
    #[error("Engine error: {0}")]
    EngineError(String),

    /// The dataset could not be read or holds a malformed record.
    #[error("Source error: {0}")]
    SourceError(String),

    /// The alias could not be brought to a known state; needs an operator.
    /// Carries the report when loading had started.
    #[error("Alias {alias} left in an unresolved state: {reason}")]
    AliasUnresolved {
        alias: String,
        reason: String,
        report: Option<Box<LoadReport>>,
    },

    /// The run was interrupted by a signal.
    #[error("Load interrupted")]
    Interrupted,

    /// The load failed and the alias was restored to its pre-run binding.
    #[error("Load rolled back after: {cause}")]
    RolledBack {
        cause: Box<LoadError>,
        report: Box<LoadReport>,
    },
}

impl LoadError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Create a source error.
    pub fn source(msg: impl Into<String>) -> Self {
        Self::SourceError(msg.into())
    }

    /// Create an unresolved alias error.
    pub fn alias_unresolved(alias: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::AliasUnresolved {
            alias: alias.into(),
            reason: reason.into(),
            report: None,
        }
    }

    /// Attach the report of the run to an unresolved alias error.
    pub fn with_report(self, report: LoadReport) -> Self {
        match self {
            Self::AliasUnresolved { alias, reason, .. } => Self::AliasUnresolved {
                alias,
                reason,
                report: Some(Box::new(report)),
            },
            other => other,
        }
    }

    /// The report of a run that failed after loading started.
    pub fn report(&self) -> Option<&LoadReport> {
        match self {
            Self::RolledBack { report, .. } => Some(report),
            Self::AliasUnresolved {
                report: Some(report),
                ..
            } => Some(report),
            _ => None,
        }
    }

    /// The error that started the rollback, or `self`.
    pub fn root_cause(&self) -> &LoadError {
        match self {
            Self::RolledBack { cause, .. } => cause.root_cause(),
            other => other,
        }
    }
}

impl From<SearchError> for LoadError {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::ConnectionError(msg) => Self::EngineUnavailable(msg),
            SearchError::SchemaError(msg) => Self::SchemaError(msg),
            other => Self::EngineError(other.to_string()),
        }
    }
}
