//! Cleanup job: purges successfully-applied entries past the retention
//! window, then compacts the log.
//!
//! Only `success` entries are ever purged. Failed entries are the recovery
//! job's inventory and pending entries are in flight, so both are kept no
//! matter how old they get.

use chrono::Duration;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::observability::Metrics;
use crate::wal::{Result, WalStore};

#[derive(Debug, Default, Serialize)]
pub struct CleanupStats {
    pub eligible: usize,
    pub purged: usize,
    pub skipped: usize,
    pub live_records: usize,
}

/// One cleanup pass: purge stale successes, then rewrite the log without
/// superseded records.
pub async fn run(
    store: &WalStore,
    retention: Duration,
    metrics: &Metrics,
) -> Result<CleanupStats> {
    let stale = store.list_stale_success(retention)?;
    let mut stats = CleanupStats {
        eligible: stale.len(),
        ..Default::default()
    };

    if stale.is_empty() {
        debug!("No stale entries to purge");
    } else {
        info!(count = stale.len(), "Purging stale WAL entries");
    }

    for entry in stale {
        match store.delete(&entry.id).await {
            Ok(()) => {
                metrics.entry_purged();
                stats.purged += 1;
            }
            Err(err) => {
                // Left in place; the next run sees it again
                warn!(id = %entry.id, error = %err, "Entry could not be purged");
                stats.skipped += 1;
            }
        }
    }

    stats.live_records = store.compact()?;

    info!(
        eligible = stats.eligible,
        purged = stats.purged,
        skipped = stats.skipped,
        live_records = stats.live_records,
        "Cleanup run complete"
    );
    Ok(stats)
}
