//! Progress and outcome reporting for a load run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single document the engine refused during a bulk write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRejection {
    /// Id of the rejected document.
    pub id: String,
    /// Engine-supplied reason (error type and message).
    pub reason: String,
}

impl DocumentRejection {
    pub fn new(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            reason: reason.into(),
        }
    }
}

/// Terminal status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Still loading; never the status of a finished report.
    InProgress,
    /// The alias was moved to the freshly loaded index.
    Committed,
    /// The run failed and the alias was restored to its pre-run binding.
    RolledBack,
    /// The alias could not be restored; needs an operator.
    Unresolved,
}

/// Counters for one bulk request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    /// 1-based position of the batch in the run.
    pub sequence: usize,
    /// Documents submitted.
    pub attempted: usize,
    /// Documents accepted.
    pub succeeded: usize,
    /// Documents rejected.
    pub rejected: usize,
    /// Wall time of the bulk request.
    pub elapsed_ms: u64,
}

/// Outcome of a full load run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadReport {
    pub run_id: Uuid,
    pub alias: String,
    /// Index that was rebuilt and loaded.
    pub target_index: String,
    /// Index the alias pointed at before the run, if any.
    pub previous_index: Option<String>,
    pub status: RunStatus,
    pub attempted: usize,
    pub succeeded: usize,
    pub rejected: usize,
    /// Retained rejections; capped, see `rejections_truncated`.
    pub rejections: Vec<DocumentRejection>,
    pub rejections_truncated: bool,
    pub batches: Vec<BatchReport>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl LoadReport {
    /// Start a report for a run against `alias` loading into `target_index`.
    pub fn new(
        alias: impl Into<String>,
        target_index: impl Into<String>,
        previous_index: Option<String>,
    ) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            alias: alias.into(),
            target_index: target_index.into(),
            previous_index,
            status: RunStatus::InProgress,
            attempted: 0,
            succeeded: 0,
            rejected: 0,
            rejections: Vec::new(),
            rejections_truncated: false,
            batches: Vec::new(),
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Fold one batch into the running totals.
    ///
    /// At most `max_rejections` rejections are kept in memory; the counter
    /// always reflects the full number.
    pub fn record_batch(
        &mut self,
        batch: BatchReport,
        rejections: Vec<DocumentRejection>,
        max_rejections: usize,
    ) {
        self.attempted += batch.attempted;
        self.succeeded += batch.succeeded;
        self.rejected += batch.rejected;

        let room = max_rejections.saturating_sub(self.rejections.len());
        if rejections.len() > room {
            self.rejections_truncated = true;
        }
        self.rejections.extend(rejections.into_iter().take(room));
        self.batches.push(batch);
    }

    /// Mark the run finished with the given status.
    pub fn finish(&mut self, status: RunStatus) {
        self.status = status;
        self.finished_at = Some(Utc::now());
    }

    /// Run duration in milliseconds, if finished.
    pub fn elapsed_ms(&self) -> Option<i64> {
        self.finished_at
            .map(|end| (end - self.started_at).num_milliseconds())
    }
}
