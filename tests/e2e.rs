//! Component-level lifecycle tests
//!
//! These tests drive the WAL, applier, and background jobs together without
//! the HTTP layer: ingest with a downstream outage, recover, age out, purge.

use std::sync::Arc;

use tempfile::TempDir;

use indexwal::applier::{ChangeApplier, ChangeStatus, FileChange};
use indexwal::index::mock::MockIndexBackend;
use indexwal::index::{DownstreamIndexes, IndexBackend};
use indexwal::jobs::JobScheduler;
use indexwal::observability::Metrics;
use indexwal::wal::{EntryStatus, Operation, WalStore};

struct TestContext {
    store: Arc<WalStore>,
    backend: Arc<MockIndexBackend>,
    applier: ChangeApplier,
    scheduler: Arc<JobScheduler>,
    _temp: TempDir,
}

fn setup(retention: chrono::Duration) -> TestContext {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let store = Arc::new(WalStore::open(temp.path().join("wal")).expect("Failed to open WAL"));
    let backend = Arc::new(MockIndexBackend::new());
    let indexes = Arc::new(DownstreamIndexes::new(vec![
        backend.clone() as Arc<dyn IndexBackend>,
    ]));
    let metrics = Arc::new(Metrics::new());
    let applier = ChangeApplier::new(store.clone(), indexes.clone(), metrics.clone());
    let scheduler = Arc::new(JobScheduler::new(store.clone(), indexes, metrics, retention));

    TestContext {
        store,
        backend,
        applier,
        scheduler,
        _temp: temp,
    }
}

fn upsert(path: &str, content: &str) -> FileChange {
    FileChange {
        path: path.to_string(),
        operation: Operation::Upsert,
        content: Some(content.to_string()),
    }
}

#[tokio::test]
async fn test_outage_then_recovery_lifecycle() {
    let ctx = setup(chrono::Duration::days(7));

    // Downstream is down for the initial apply
    ctx.backend.fail_next(1);
    let outcome = ctx
        .applier
        .apply_batch("user-1", &[upsert("src/parser.py", "def parse(): pass")])
        .await
        .unwrap();
    assert_eq!(outcome.per_file[0].status, ChangeStatus::Deferred);

    let failed = ctx.store.list_failed().unwrap();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].attempts, 1);
    assert!(failed[0].error.is_some());

    // Recovery replays it once the backend is back
    let stats = ctx.scheduler.trigger_recovery().await.unwrap().unwrap();
    assert_eq!(stats.recovered, 1);

    let entry = ctx.store.get(&failed[0].id).unwrap().unwrap();
    assert_eq!(entry.status, EntryStatus::Success);
    assert!(entry.completed_at.is_some());

    // The replay delivered the original content
    let applied = ctx.backend.applied();
    assert_eq!(applied.len(), 1);
    assert_eq!(applied[0].content.as_deref(), Some("def parse(): pass"));

    // Nothing left for a second pass
    let stats = ctx.scheduler.trigger_recovery().await.unwrap().unwrap();
    assert_eq!(stats.found, 0);
}

#[tokio::test]
async fn test_repeated_failure_keeps_retrying() {
    let ctx = setup(chrono::Duration::days(7));

    ctx.backend.fail_next(3);
    ctx.applier
        .apply_batch("user-1", &[upsert("src/a.py", "x")])
        .await
        .unwrap();

    // Two more failing passes, then one that succeeds
    let stats = ctx.scheduler.trigger_recovery().await.unwrap().unwrap();
    assert_eq!(stats.still_failing, 1);
    let stats = ctx.scheduler.trigger_recovery().await.unwrap().unwrap();
    assert_eq!(stats.still_failing, 1);

    let failed = ctx.store.list_failed().unwrap();
    assert_eq!(failed[0].attempts, 3);

    let stats = ctx.scheduler.trigger_recovery().await.unwrap().unwrap();
    assert_eq!(stats.recovered, 1);
}

#[tokio::test]
async fn test_cleanup_purges_only_applied_entries() {
    let ctx = setup(chrono::Duration::zero());

    // One applied, one stuck failing
    ctx.backend.fail_next(1);
    ctx.applier
        .apply_batch(
            "user-1",
            &[upsert("src/stuck.py", "a"), upsert("src/done.py", "b")],
        )
        .await
        .unwrap();

    // Zero retention: the applied entry is immediately eligible
    let stats = ctx.scheduler.trigger_cleanup().await.unwrap().unwrap();
    assert_eq!(stats.purged, 1);
    assert_eq!(stats.live_records, 1);

    let wal_stats = ctx.store.stats().unwrap();
    assert_eq!(wal_stats.total, 1);
    assert_eq!(wal_stats.failed, 1);

    // The failed entry still recovers after the purge
    let stats = ctx.scheduler.trigger_recovery().await.unwrap().unwrap();
    assert_eq!(stats.recovered, 1);
}

#[tokio::test]
async fn test_cleanup_respects_retention_window() {
    let ctx = setup(chrono::Duration::days(7));

    ctx.applier
        .apply_batch("user-1", &[upsert("src/a.py", "x")])
        .await
        .unwrap();

    let stats = ctx.scheduler.trigger_cleanup().await.unwrap().unwrap();
    assert_eq!(stats.eligible, 0);
    assert_eq!(stats.purged, 0);
    assert_eq!(ctx.store.stats().unwrap().total, 1);
}

#[tokio::test]
async fn test_delete_flow_end_to_end() {
    let ctx = setup(chrono::Duration::days(7));

    let changes = [
        upsert("src/a.py", "x"),
        FileChange {
            path: "src/a.py".to_string(),
            operation: Operation::Delete,
            content: None,
        },
    ];
    let outcome = ctx.applier.apply_batch("user-1", &changes).await.unwrap();
    assert_eq!(outcome.counts.applied, 2);

    let applied = ctx.backend.applied();
    assert_eq!(applied[1].operation, Operation::Delete);
    assert_eq!(applied[1].content, None);

    // Both entries logged independently
    assert_eq!(ctx.store.stats().unwrap().total, 2);
}

#[tokio::test]
async fn test_recovery_never_touches_pending_or_success() {
    let ctx = setup(chrono::Duration::days(7));

    ctx.applier
        .apply_batch("user-1", &[upsert("src/a.py", "x")])
        .await
        .unwrap();
    let counting = Arc::new(MockIndexBackend::new());
    // Fresh backend: any recovery replay would show up here
    let indexes = DownstreamIndexes::new(vec![counting.clone() as Arc<dyn IndexBackend>]);
    let metrics = Metrics::new();
    let stats = indexwal::jobs::recovery::run(&ctx.store, &indexes, &metrics)
        .await
        .unwrap();

    assert_eq!(stats.found, 0);
    assert!(counting.applied().is_empty());
}

#[tokio::test]
async fn test_concurrent_batches_are_all_logged() {
    let ctx = setup(chrono::Duration::days(7));
    let applier = Arc::new(ctx.applier);

    let mut handles = Vec::new();
    for task in 0..10 {
        let applier = applier.clone();
        handles.push(tokio::spawn(async move {
            let changes: Vec<FileChange> = (0..10)
                .map(|i| upsert(&format!("src/t{}/f{}.py", task, i), "content"))
                .collect();
            applier
                .apply_batch(&format!("user-{}", task), &changes)
                .await
                .unwrap()
        }));
    }

    for handle in handles {
        let outcome = handle.await.unwrap();
        assert_eq!(outcome.counts.applied, 10);
    }

    let stats = ctx.store.stats().unwrap();
    assert_eq!(stats.total, 100);
    assert_eq!(stats.success, 100);
    assert_eq!(ctx.backend.applied().len(), 100);
}
