use std::sync::Arc;

use crate::applier::ChangeApplier;
use crate::config::Config;
use crate::jobs::JobScheduler;
use crate::observability::Metrics;
use crate::wal::WalStore;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<WalStore>,
    pub applier: Arc<ChangeApplier>,
    pub scheduler: Arc<JobScheduler>,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        store: Arc<WalStore>,
        applier: Arc<ChangeApplier>,
        scheduler: Arc<JobScheduler>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            config,
            store,
            applier,
            scheduler,
            metrics,
        }
    }
}
