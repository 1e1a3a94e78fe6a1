//! Periodic job scheduler built on tokio timers.
//!
//! Each job carries its own in-progress flag so a slow run is never
//! overlapped by the next timer tick or by a manual trigger. Missed ticks
//! are skipped rather than bursted.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use crate::index::DownstreamIndexes;
use crate::observability::Metrics;
use crate::wal::{WalError, WalStore};

use super::{cleanup, recovery, CleanupStats, RecoveryStats};

/// Holds a job's in-progress flag for the duration of one run.
///
/// Releasing in `Drop` matters: a manual trigger runs inside an HTTP
/// handler future, and the server drops that future if the client
/// disconnects mid-run. Without the drop-based release the flag would stay
/// set and every later trigger, timer ticks included, would be refused.
struct RunGuard {
    flag: Arc<AtomicBool>,
}

impl RunGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        Some(Self { flag: flag.clone() })
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

pub struct JobScheduler {
    store: Arc<WalStore>,
    indexes: Arc<DownstreamIndexes>,
    metrics: Arc<Metrics>,
    retention: chrono::Duration,
    recovery_busy: Arc<AtomicBool>,
    cleanup_busy: Arc<AtomicBool>,
    shutdown_tx: watch::Sender<bool>,
}

impl JobScheduler {
    pub fn new(
        store: Arc<WalStore>,
        indexes: Arc<DownstreamIndexes>,
        metrics: Arc<Metrics>,
        retention: chrono::Duration,
    ) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            store,
            indexes,
            metrics,
            retention,
            recovery_busy: Arc::new(AtomicBool::new(false)),
            cleanup_busy: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
        }
    }

    /// Spawn the recovery and cleanup timers.
    ///
    /// Both fire immediately on start, so failed entries left over from a
    /// previous process are replayed as soon as the service is up.
    pub fn start(self: &Arc<Self>, recovery_interval: Duration, cleanup_interval: Duration) {
        info!(
            recovery_interval_secs = recovery_interval.as_secs(),
            cleanup_interval_secs = cleanup_interval.as_secs(),
            "Starting background jobs"
        );

        let scheduler = self.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        tokio::spawn(async move {
            let mut timer = tokio::time::interval(recovery_interval);
            timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = timer.tick() => {
                        scheduler.trigger_recovery().await;
                    }
                    _ = shutdown_rx.changed() => {
                        info!("Recovery timer stopped");
                        break;
                    }
                }
            }
        });

        let scheduler = self.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        tokio::spawn(async move {
            let mut timer = tokio::time::interval(cleanup_interval);
            timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = timer.tick() => {
                        scheduler.trigger_cleanup().await;
                    }
                    _ = shutdown_rx.changed() => {
                        info!("Cleanup timer stopped");
                        break;
                    }
                }
            }
        });
    }

    /// Run a recovery pass unless one is already in progress.
    ///
    /// Returns `None` when skipped because of an in-progress run.
    pub async fn trigger_recovery(&self) -> Option<Result<RecoveryStats, WalError>> {
        let Some(_guard) = RunGuard::acquire(&self.recovery_busy) else {
            warn!("Recovery already in progress, skipping trigger");
            return None;
        };

        let result = recovery::run(&self.store, &self.indexes, &self.metrics).await;
        if let Err(err) = &result {
            error!(error = %err, "Recovery run failed");
        }
        Some(result)
    }

    /// Run a cleanup pass unless one is already in progress.
    pub async fn trigger_cleanup(&self) -> Option<Result<CleanupStats, WalError>> {
        let Some(_guard) = RunGuard::acquire(&self.cleanup_busy) else {
            warn!("Cleanup already in progress, skipping trigger");
            return None;
        };

        let result = cleanup::run(&self.store, self.retention, &self.metrics).await;
        if let Err(err) = &result {
            error!(error = %err, "Cleanup run failed");
        }
        Some(result)
    }

    /// Stop future timer firings. In-flight runs finish on their own.
    pub fn shutdown(&self) {
        info!("Stopping background jobs");
        let _ = self.shutdown_tx.send(true);
    }
}
