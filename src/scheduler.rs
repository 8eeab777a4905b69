use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;
use tokio::time::{interval, Duration};

use crate::alert_checker::AlertChecker;
use crate::error::Result;
use crate::services::catalog_service::{CatalogService, Pack};

/// Drives the refresh cycle: list sets, rebuild the pack collection, publish
/// the new snapshot, then evaluate alerts against it.
pub struct Scheduler {
    catalog: Arc<CatalogService>,
    checker: Arc<AlertChecker>,
    packs: RwLock<Vec<Pack>>,
    generation: AtomicU64,
    refresh_interval: Duration,
}

impl Scheduler {
    pub fn new(
        catalog: Arc<CatalogService>,
        checker: Arc<AlertChecker>,
        refresh_interval: Duration,
    ) -> Self {
        Self {
            catalog,
            checker,
            packs: RwLock::new(Vec::new()),
            generation: AtomicU64::new(0),
            refresh_interval,
        }
    }

    /// The most recently published pack snapshot.
    pub async fn current_packs(&self) -> Vec<Pack> {
        self.packs.read().await.clone()
    }

    /// Run refresh cycles until shutdown.
    pub async fn start(self: Arc<Self>) {
        let mut interval = interval(self.refresh_interval);

        loop {
            interval.tick().await;

            if let Err(e) = self.refresh().await {
                tracing::error!("refresh cycle failed: {}", e);
            }
        }
    }

    /// Run one full refresh cycle. A cycle superseded by a newer one while
    /// fetching discards its results instead of publishing or evaluating.
    pub async fn refresh(&self) -> Result<()> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let sets = self.catalog.list_sets().await;
        let packs = self.catalog.build_packs(&sets).await;

        if self.generation.load(Ordering::SeqCst) != generation {
            tracing::debug!("refresh superseded, discarding {} packs", packs.len());
            return Ok(());
        }

        let live = packs.iter().filter(|p| p.is_real_data).count();
        tracing::info!("refreshed {} packs ({} from live data)", packs.len(), live);

        *self.packs.write().await = packs.clone();

        self.checker.check_alerts(&packs).await
    }
}
