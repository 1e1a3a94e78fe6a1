//! Process-local counters exposed through the stats endpoint

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Metrics handle for recording counters
#[derive(Debug, Default)]
pub struct Metrics {
    changes_applied: AtomicU64,
    changes_deferred: AtomicU64,
    changes_rejected: AtomicU64,
    entries_recovered: AtomicU64,
    entries_purged: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn change_applied(&self) {
        self.changes_applied.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "changes_applied", "Metric incremented");
    }

    pub fn change_deferred(&self) {
        self.changes_deferred.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "changes_deferred", "Metric incremented");
    }

    pub fn change_rejected(&self) {
        self.changes_rejected.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "changes_rejected", "Metric incremented");
    }

    pub fn entry_recovered(&self) {
        self.entries_recovered.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "entries_recovered", "Metric incremented");
    }

    pub fn entry_purged(&self) {
        self.entries_purged.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "entries_purged", "Metric incremented");
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            changes_applied: self.changes_applied.load(Ordering::Relaxed),
            changes_deferred: self.changes_deferred.load(Ordering::Relaxed),
            changes_rejected: self.changes_rejected.load(Ordering::Relaxed),
            entries_recovered: self.entries_recovered.load(Ordering::Relaxed),
            entries_purged: self.entries_purged.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub changes_applied: u64,
    pub changes_deferred: u64,
    pub changes_rejected: u64,
    pub entries_recovered: u64,
    pub entries_purged: u64,
}
