//! Recovery job: replays failed WAL entries through the downstream indexes.
//!
//! Retries are unbounded. A change that keeps failing is retried every run
//! until it succeeds or an operator intervenes; the downstream apply
//! interface is idempotent, so replaying an entry that partially applied
//! earlier is safe.

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::index::DownstreamIndexes;
use crate::observability::Metrics;
use crate::wal::{EntryStatus, Result, WalStore};

#[derive(Debug, Default, Serialize)]
pub struct RecoveryStats {
    pub found: usize,
    pub recovered: usize,
    pub still_failing: usize,
}

/// One recovery pass over every `failed` entry
pub async fn run(
    store: &WalStore,
    indexes: &DownstreamIndexes,
    metrics: &Metrics,
) -> Result<RecoveryStats> {
    let failed = store.list_failed()?;
    if failed.is_empty() {
        debug!("No failed entries to recover");
        return Ok(RecoveryStats::default());
    }

    info!(count = failed.len(), "Replaying failed WAL entries");
    let mut stats = RecoveryStats {
        found: failed.len(),
        ..Default::default()
    };

    for entry in failed {
        // Reload the logged content; deletes legitimately have none
        let content = match store.get_content(&entry.id).await {
            Ok(content) => content,
            Err(err) => {
                warn!(id = %entry.id, file = %entry.file, error = %err, "Cannot replay entry");
                if let Err(mark_err) =
                    store.mark(&entry.id, EntryStatus::Failed, Some(err.to_string()))
                {
                    error!(id = %entry.id, error = %mark_err, "Unreplayable entry could not be re-marked");
                }
                stats.still_failing += 1;
                continue;
            }
        };

        match indexes
            .apply(&entry.user_id, &entry.file, entry.operation, content.as_deref())
            .await
        {
            Ok(()) => {
                store.mark(&entry.id, EntryStatus::Success, None)?;
                metrics.entry_recovered();
                stats.recovered += 1;
                info!(id = %entry.id, file = %entry.file, "Recovered entry");
            }
            Err(err) => {
                store.mark(&entry.id, EntryStatus::Failed, Some(err.to_string()))?;
                stats.still_failing += 1;
            }
        }
    }

    info!(
        found = stats.found,
        recovered = stats.recovered,
        still_failing = stats.still_failing,
        "Recovery run complete"
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::mock::MockIndexBackend;
    use crate::index::IndexBackend;
    use crate::wal::Operation;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn build() -> (Arc<WalStore>, Arc<MockIndexBackend>, DownstreamIndexes, Metrics, TempDir) {
        let temp = TempDir::new().unwrap();
        let store = Arc::new(WalStore::open(temp.path().join("wal")).unwrap());
        let backend = Arc::new(MockIndexBackend::new());
        let indexes =
            DownstreamIndexes::new(vec![backend.clone() as Arc<dyn IndexBackend>]);
        (store, backend, indexes, Metrics::new(), temp)
    }

    #[tokio::test]
    async fn test_recovers_failed_entry() {
        let (store, backend, indexes, metrics, _temp) = build();
        let id = store
            .append(Operation::Upsert, "b.py", "user-1", Some("y"))
            .await
            .unwrap();
        store
            .mark(&id, EntryStatus::Failed, Some("index down".to_string()))
            .unwrap();

        let stats = run(&store, &indexes, &metrics).await.unwrap();

        assert_eq!(stats.found, 1);
        assert_eq!(stats.recovered, 1);
        let entry = store.get(&id).unwrap().unwrap();
        assert_eq!(entry.status, EntryStatus::Success);
        assert!(entry.completed_at.is_some());

        // The replay carried the logged content
        let applied = backend.applied();
        assert_eq!(applied.len(), 1);
        assert_eq!(applied[0].content.as_deref(), Some("y"));
    }

    #[tokio::test]
    async fn test_still_failing_entry_stays_failed() {
        let (store, backend, indexes, metrics, _temp) = build();
        let id = store
            .append(Operation::Upsert, "b.py", "user-1", Some("y"))
            .await
            .unwrap();
        store
            .mark(&id, EntryStatus::Failed, Some("index down".to_string()))
            .unwrap();
        backend.fail_next(1);

        let stats = run(&store, &indexes, &metrics).await.unwrap();

        assert_eq!(stats.still_failing, 1);
        let entry = store.get(&id).unwrap().unwrap();
        assert_eq!(entry.status, EntryStatus::Failed);
        assert_eq!(entry.attempts, 2);
    }

    #[tokio::test]
    async fn test_missing_blob_re_marks_entry_failed() {
        let (store, backend, indexes, metrics, temp) = build();
        let id = store
            .append(Operation::Upsert, "b.py", "user-1", Some("y"))
            .await
            .unwrap();
        store
            .mark(&id, EntryStatus::Failed, Some("index down".to_string()))
            .unwrap();

        // The blob vanishes out from under the failed entry
        std::fs::remove_file(
            temp.path()
                .join("wal")
                .join("content")
                .join(format!("{id}.txt")),
        )
        .unwrap();

        let stats = run(&store, &indexes, &metrics).await.unwrap();

        // The run survives and the entry stays failed with a diagnostic
        assert_eq!(stats.found, 1);
        assert_eq!(stats.recovered, 0);
        assert_eq!(stats.still_failing, 1);

        let entry = store.get(&id).unwrap().unwrap();
        assert_eq!(entry.status, EntryStatus::Failed);
        assert_eq!(entry.attempts, 2);
        assert!(entry.error.as_deref().unwrap().contains("blob missing"));

        // Nothing reached the indexes
        assert!(backend.applied().is_empty());
    }

    #[tokio::test]
    async fn test_ignores_pending_and_success_entries() {
        let (store, backend, indexes, metrics, _temp) = build();
        let done = store
            .append(Operation::Upsert, "done.py", "u", Some("a"))
            .await
            .unwrap();
        store.mark(&done, EntryStatus::Success, None).unwrap();
        let _pending = store
            .append(Operation::Upsert, "pending.py", "u", Some("b"))
            .await
            .unwrap();

        let stats = run(&store, &indexes, &metrics).await.unwrap();

        assert_eq!(stats.found, 0);
        assert!(backend.applied().is_empty());
    }

    #[tokio::test]
    async fn test_replays_delete_with_null_content() {
        let (store, backend, indexes, metrics, _temp) = build();
        let id = store
            .append(Operation::Delete, "c.py", "user-1", None)
            .await
            .unwrap();
        store
            .mark(&id, EntryStatus::Failed, Some("graph down".to_string()))
            .unwrap();

        let stats = run(&store, &indexes, &metrics).await.unwrap();

        assert_eq!(stats.recovered, 1);
        let applied = backend.applied();
        assert_eq!(applied[0].operation, Operation::Delete);
        assert_eq!(applied[0].content, None);
    }
}
