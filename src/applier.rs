//! Change Applier: logs each change to the WAL, then pushes it downstream.
//!
//! Per-file isolation is the core contract here: one file failing at the
//! log or downstream never aborts the rest of the batch. A change that
//! could not even be logged is reported back synchronously, because the WAL
//! never saw it and recovery cannot help.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::index::DownstreamIndexes;
use crate::observability::Metrics;
use crate::wal::{EntryStatus, Operation, WalStore};

/// One logical file change submitted by the ingestion caller
#[derive(Debug, Clone)]
pub struct FileChange {
    pub path: String,
    pub operation: Operation,
    pub content: Option<String>,
}

/// Per-file outcome of a batch.
///
/// - `applied`: logged and accepted by every downstream index
/// - `deferred`: logged, but the downstream apply failed; the recovery job
///   will keep retrying it
/// - `rejected`: could not be logged at all; the caller must resubmit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeStatus {
    Applied,
    Deferred,
    Rejected,
}

#[derive(Debug, Serialize)]
pub struct ChangeOutcome {
    pub path: String,
    pub status: ChangeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Default, Serialize)]
pub struct BatchCounts {
    pub applied: usize,
    pub deferred: usize,
    pub rejected: usize,
}

#[derive(Debug, Serialize)]
pub struct BatchOutcome {
    pub per_file: Vec<ChangeOutcome>,
    pub counts: BatchCounts,
}

#[derive(Debug, Error)]
pub enum ApplierError {
    /// Every change in the batch failed at the append step, which means the
    /// log itself is unavailable rather than individual changes being bad
    #[error("change log unavailable: {0}")]
    IngestUnavailable(String),
}

pub struct ChangeApplier {
    store: Arc<WalStore>,
    indexes: Arc<DownstreamIndexes>,
    metrics: Arc<Metrics>,
}

impl ChangeApplier {
    pub fn new(
        store: Arc<WalStore>,
        indexes: Arc<DownstreamIndexes>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            store,
            indexes,
            metrics,
        }
    }

    /// Apply a batch of changes for one user, independently per file.
    ///
    /// Errors only when the whole batch failed to ingest; partial failures
    /// are reported through the per-file outcomes instead.
    pub async fn apply_batch(
        &self,
        user_id: &str,
        changes: &[FileChange],
    ) -> Result<BatchOutcome, ApplierError> {
        let mut per_file = Vec::with_capacity(changes.len());
        let mut counts = BatchCounts::default();

        for change in changes {
            let outcome = self.apply_one(user_id, change).await;
            match outcome.status {
                ChangeStatus::Applied => {
                    counts.applied += 1;
                    self.metrics.change_applied();
                }
                ChangeStatus::Deferred => {
                    counts.deferred += 1;
                    self.metrics.change_deferred();
                }
                ChangeStatus::Rejected => {
                    counts.rejected += 1;
                    self.metrics.change_rejected();
                }
            }
            per_file.push(outcome);
        }

        if !changes.is_empty() && counts.rejected == changes.len() {
            let detail = per_file
                .iter()
                .find_map(|o| o.error.clone())
                .unwrap_or_else(|| "append failed".to_string());
            return Err(ApplierError::IngestUnavailable(detail));
        }

        debug!(
            user_id,
            applied = counts.applied,
            deferred = counts.deferred,
            rejected = counts.rejected,
            "Batch processed"
        );
        Ok(BatchOutcome { per_file, counts })
    }

    async fn apply_one(&self, user_id: &str, change: &FileChange) -> ChangeOutcome {
        // Step 1: write-ahead. A failure here means the change was never
        // logged, so it is surfaced to the caller instead of deferred.
        let id = match self
            .store
            .append(
                change.operation,
                &change.path,
                user_id,
                change.content.as_deref(),
            )
            .await
        {
            Ok(id) => id,
            Err(err) => {
                error!(file = %change.path, error = %err, "Change could not be logged");
                return ChangeOutcome {
                    path: change.path.clone(),
                    status: ChangeStatus::Rejected,
                    error: Some(err.to_string()),
                };
            }
        };

        // Step 2: downstream apply. No store lock is held across this await;
        // only the brief append above and mark below are serialized.
        match self
            .indexes
            .apply(
                user_id,
                &change.path,
                change.operation,
                change.content.as_deref(),
            )
            .await
        {
            Ok(()) => {
                if let Err(err) = self.store.mark(&id, EntryStatus::Success, None) {
                    // The indexes accepted the change; a stuck pending entry
                    // is visible in stats and harmless to replay
                    warn!(id, error = %err, "Applied change could not be marked");
                }
                ChangeOutcome {
                    path: change.path.clone(),
                    status: ChangeStatus::Applied,
                    error: None,
                }
            }
            Err(err) => {
                warn!(id, file = %change.path, error = %err, "Downstream apply failed, deferring to recovery");
                if let Err(mark_err) =
                    self.store
                        .mark(&id, EntryStatus::Failed, Some(err.to_string()))
                {
                    error!(id, error = %mark_err, "Failed entry could not be marked");
                }
                ChangeOutcome {
                    path: change.path.clone(),
                    status: ChangeStatus::Deferred,
                    error: Some(err.to_string()),
                }
            }
        }
    }
}
