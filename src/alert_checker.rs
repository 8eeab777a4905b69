use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::error::Result;
use crate::services::alert_service::AlertService;
use crate::services::catalog_service::Pack;
use crate::services::notification_service::{DispatchOutcome, Notifier};
use crate::storage::{KvStore, WEBHOOK_KEY};

const DISPATCH_CONCURRENCY: usize = 4;

/// Scans active alerts against the current pack snapshot after every refresh
/// and dispatches notifications for newly-qualifying alerts.
pub struct AlertChecker {
    alerts: Arc<AlertService>,
    notifier: Arc<dyn Notifier>,
    store: Arc<dyn KvStore>,
    default_endpoint: Option<String>,
}

impl AlertChecker {
    pub fn new(
        alerts: Arc<AlertService>,
        notifier: Arc<dyn Notifier>,
        store: Arc<dyn KvStore>,
        default_endpoint: Option<String>,
    ) -> Self {
        Self {
            alerts,
            notifier,
            store,
            default_endpoint,
        }
    }

    /// Runtime setting from the store wins over the configured default, so
    /// the settings surface can change the endpoint without a restart.
    fn webhook_endpoint(&self) -> Option<String> {
        if let Ok(Some(value)) = self.store.get(WEBHOOK_KEY) {
            if let Some(url) = value.as_str() {
                if !url.is_empty() {
                    return Some(url.to_string());
                }
            }
        }
        self.default_endpoint.clone().filter(|url| !url.is_empty())
    }

    /// Evaluate all alerts against a freshly built pack snapshot. Dispatches
    /// run concurrently under a bounded task group; a failed delivery leaves
    /// the alert untriggered so the next refresh retries it.
    pub async fn check_alerts(&self, packs: &[Pack]) -> Result<()> {
        let Some(endpoint) = self.webhook_endpoint() else {
            tracing::debug!("no webhook endpoint configured, skipping alert evaluation");
            return Ok(());
        };

        let alerts = self.alerts.list()?;
        if alerts.is_empty() || packs.is_empty() {
            return Ok(());
        }

        let by_id: HashMap<&str, &Pack> = packs.iter().map(|p| (p.id.as_str(), p)).collect();
        let semaphore = Arc::new(Semaphore::new(DISPATCH_CONCURRENCY));
        let mut dispatches = JoinSet::new();

        for alert in alerts {
            if alert.triggered && alert.notify_once {
                continue;
            }

            // the pack may have rotated out of the current catalog
            let Some(pack) = by_id.get(alert.pack_id.as_str()) else {
                continue;
            };

            if pack.current_price > alert.target_price {
                continue;
            }

            let pack = (*pack).clone();
            let notifier = self.notifier.clone();
            let endpoint = endpoint.clone();
            let semaphore = semaphore.clone();
            dispatches.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                let outcome = notifier.send_price_alert(&endpoint, &pack, alert.target_price).await;
                (alert, pack, outcome)
            });
        }

        while let Some(joined) = dispatches.join_next().await {
            let Ok((alert, pack, outcome)) = joined else {
                continue;
            };

            match outcome {
                DispatchOutcome::Delivered => {
                    tracing::info!(
                        "price alert sent for {} at ${:.2} (target ${:.2})",
                        pack.name,
                        pack.current_price,
                        alert.target_price
                    );
                    if alert.notify_once {
                        if let Err(e) = self.alerts.mark_triggered(&alert.pack_id) {
                            tracing::warn!("failed to mark alert {} triggered: {}", alert.pack_id, e);
                        }
                    }
                }
                DispatchOutcome::NotConfigured => {}
                DispatchOutcome::Failed(reason) => {
                    tracing::warn!("price alert for {} not delivered: {}", pack.name, reason);
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::{PriceStatus, ProductType, Series};
    use crate::services::alert_service::PriceAlert;
    use crate::services::catalog_service::{
        normalize_sealed_products, packs_from_products, Set, IMAGE_BASE_URL,
    };
    use crate::storage::MemoryStore;
    use crate::tcgcsv::{PriceRow, ProductRow, POKEMON_CATEGORY_ID};
    use async_trait::async_trait;
    use chrono::{NaiveDate, Utc};
    use serde_json::json;
    use std::sync::Mutex;

    struct RecordingNotifier {
        outcome: Mutex<DispatchOutcome>,
        sent: Mutex<Vec<(String, f64)>>,
    }

    impl RecordingNotifier {
        fn new(outcome: DispatchOutcome) -> Self {
            Self {
                outcome: Mutex::new(outcome),
                sent: Mutex::new(Vec::new()),
            }
        }

        fn sent_count(&self) -> usize {
            self.sent.lock().unwrap().len()
        }

        fn set_outcome(&self, outcome: DispatchOutcome) {
            *self.outcome.lock().unwrap() = outcome;
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send_price_alert(
            &self,
            _endpoint: &str,
            pack: &Pack,
            target_price: f64,
        ) -> DispatchOutcome {
            self.sent.lock().unwrap().push((pack.id.clone(), target_price));
            self.outcome.lock().unwrap().clone()
        }

        async fn test_webhook(&self, _endpoint: &str) -> DispatchOutcome {
            DispatchOutcome::Delivered
        }
    }

    struct Fixture {
        checker: AlertChecker,
        alerts: Arc<AlertService>,
        notifier: Arc<RecordingNotifier>,
    }

    fn fixture(outcome: DispatchOutcome) -> Fixture {
        let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
        store.set(WEBHOOK_KEY, json!("https://discord.test/webhook")).unwrap();
        let alerts = Arc::new(AlertService::new(store.clone()));
        let notifier = Arc::new(RecordingNotifier::new(outcome));
        let checker = AlertChecker::new(alerts.clone(), notifier.clone(), store, None);
        Fixture { checker, alerts, notifier }
    }

    fn pack(id: &str, current_price: f64, product_type: ProductType) -> Pack {
        Pack {
            id: id.to_string(),
            product_id: Some(1),
            name: format!("Surging Sparks {}", product_type.display_name()),
            set_id: "sv8".to_string(),
            set_name: "Surging Sparks".to_string(),
            series: Series::ScarletViolet,
            product_type,
            current_price,
            market_price: None,
            mid_price: None,
            low_price: None,
            release_date: NaiveDate::from_ymd_opt(2024, 11, 8).unwrap(),
            is_holographic: false,
            image_url: None,
            product_url: "https://www.tcgplayer.com/product/1".to_string(),
            last_updated: Utc::now(),
            is_real_data: true,
        }
    }

    fn alert(pack_id: &str, target_price: f64, notify_once: bool) -> PriceAlert {
        PriceAlert {
            pack_id: pack_id.to_string(),
            pack_name: "Surging Sparks Booster Box (36 packs)".to_string(),
            set_name: "Surging Sparks".to_string(),
            product_type: ProductType::BoosterBox,
            target_price,
            notify_once,
            created_at: Utc::now(),
            triggered: false,
        }
    }

    #[tokio::test]
    async fn fires_when_price_at_or_below_target() {
        let f = fixture(DispatchOutcome::Delivered);
        f.alerts.upsert(alert("sv8-1", 125.0, true)).unwrap();

        let packs = vec![pack("sv8-1", 120.0, ProductType::BoosterBox)];
        f.checker.check_alerts(&packs).await.unwrap();

        assert_eq!(f.notifier.sent_count(), 1);
        assert!(f.alerts.list().unwrap()[0].triggered);
    }

    #[tokio::test]
    async fn does_not_fire_above_target() {
        let f = fixture(DispatchOutcome::Delivered);
        f.alerts.upsert(alert("sv8-1", 100.0, true)).unwrap();

        let packs = vec![pack("sv8-1", 120.0, ProductType::BoosterBox)];
        f.checker.check_alerts(&packs).await.unwrap();

        assert_eq!(f.notifier.sent_count(), 0);
        assert!(!f.alerts.list().unwrap()[0].triggered);
    }

    #[tokio::test]
    async fn notify_once_alert_fires_at_most_once_across_refreshes() {
        let f = fixture(DispatchOutcome::Delivered);
        f.alerts.upsert(alert("sv8-1", 125.0, true)).unwrap();

        let packs = vec![pack("sv8-1", 120.0, ProductType::BoosterBox)];
        f.checker.check_alerts(&packs).await.unwrap();
        // price stays low on the next refresh; the triggered flag suppresses
        // a second notification
        f.checker.check_alerts(&packs).await.unwrap();

        assert_eq!(f.notifier.sent_count(), 1);
    }

    #[tokio::test]
    async fn recurring_alert_fires_every_refresh() {
        let f = fixture(DispatchOutcome::Delivered);
        f.alerts.upsert(alert("sv8-1", 125.0, false)).unwrap();

        let packs = vec![pack("sv8-1", 120.0, ProductType::BoosterBox)];
        f.checker.check_alerts(&packs).await.unwrap();
        f.checker.check_alerts(&packs).await.unwrap();

        assert_eq!(f.notifier.sent_count(), 2);
        assert!(!f.alerts.list().unwrap()[0].triggered);
    }

    #[tokio::test]
    async fn failed_dispatch_leaves_alert_armed_for_retry() {
        let f = fixture(DispatchOutcome::Failed("status 500".to_string()));
        f.alerts.upsert(alert("sv8-1", 125.0, true)).unwrap();

        let packs = vec![pack("sv8-1", 120.0, ProductType::BoosterBox)];
        f.checker.check_alerts(&packs).await.unwrap();

        assert_eq!(f.notifier.sent_count(), 1);
        assert!(!f.alerts.list().unwrap()[0].triggered);

        // delivery recovers on the next refresh
        f.notifier.set_outcome(DispatchOutcome::Delivered);
        f.checker.check_alerts(&packs).await.unwrap();

        assert_eq!(f.notifier.sent_count(), 2);
        assert!(f.alerts.list().unwrap()[0].triggered);
    }

    #[tokio::test]
    async fn missing_pack_is_skipped_silently() {
        let f = fixture(DispatchOutcome::Delivered);
        f.alerts.upsert(alert("swsh10-9", 20.0, true)).unwrap();

        let packs = vec![pack("sv8-1", 120.0, ProductType::BoosterBox)];
        f.checker.check_alerts(&packs).await.unwrap();

        assert_eq!(f.notifier.sent_count(), 0);
        assert!(!f.alerts.list().unwrap()[0].triggered);
    }

    #[tokio::test]
    async fn no_endpoint_skips_evaluation() {
        let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
        let alerts = Arc::new(AlertService::new(store.clone()));
        let notifier = Arc::new(RecordingNotifier::new(DispatchOutcome::Delivered));
        let checker = AlertChecker::new(alerts.clone(), notifier.clone(), store, None);

        alerts.upsert(alert("sv8-1", 125.0, true)).unwrap();
        let packs = vec![pack("sv8-1", 120.0, ProductType::BoosterBox)];
        checker.check_alerts(&packs).await.unwrap();

        assert_eq!(notifier.sent_count(), 0);
    }

    // Full pipeline: one set, one sealed product from raw rows, classify,
    // then a target-price alert fires exactly once.
    #[tokio::test]
    async fn booster_box_pipeline_end_to_end() {
        let set = Set {
            id: "tcg-1".to_string(),
            group_id: Some(1),
            name: "Surging Sparks".to_string(),
            series: Series::ScarletViolet,
            release_date: NaiveDate::from_ymd_opt(2024, 11, 8).unwrap(),
            total: 191,
            logo_url: format!("{}/sv8/logo.png", IMAGE_BASE_URL),
            symbol_url: format!("{}/sv8/symbol.png", IMAGE_BASE_URL),
        };

        let products = vec![ProductRow {
            product_id: 42,
            name: "Booster Box".to_string(),
            category_id: Some(POKEMON_CATEGORY_ID),
            image_url: None,
            url: None,
        }];
        let prices = vec![PriceRow {
            product_id: 42,
            low_price: Some(120.0),
            mid_price: None,
            market_price: None,
            sub_type_name: None,
        }];

        let sealed = normalize_sealed_products(products, prices);
        let packs = packs_from_products(&set, sealed, Utc::now());

        assert_eq!(packs.len(), 1);
        let built = &packs[0];
        assert_eq!(built.current_price, 120.0);
        assert_eq!(built.product_type, ProductType::BoosterBox);
        // (120 - 143.64) / 143.64 is about -16.5%, across the -15% boundary
        assert_eq!(built.price_status(), PriceStatus::GreatDeal);

        let f = fixture(DispatchOutcome::Delivered);
        f.alerts.upsert(alert(&built.id, 125.0, true)).unwrap();

        f.checker.check_alerts(&packs).await.unwrap();
        f.checker.check_alerts(&packs).await.unwrap();

        assert_eq!(f.notifier.sent_count(), 1);
    }
}
