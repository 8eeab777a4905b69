use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::enums::ProductType;
use crate::error::{AppError, Result};
use crate::storage::{KvStore, ALERTS_KEY};

/// A user-defined target-price alert. The product fields are denormalized so
/// the alert stays displayable after its pack rotates out of the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceAlert {
    pub pack_id: String,
    pub pack_name: String,
    pub set_name: String,
    pub product_type: ProductType,
    pub target_price: f64,
    pub notify_once: bool,
    pub created_at: DateTime<Utc>,
    pub triggered: bool,
}

/// Durable pack-id -> alert mapping. Holds at most one alert per pack:
/// `upsert` replaces an existing entry rather than inserting a duplicate.
pub struct AlertService {
    store: Arc<dyn KvStore>,
    // serializes read-modify-write sequences against the store
    write_lock: Mutex<()>,
}

impl AlertService {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    pub fn list(&self) -> Result<Vec<PriceAlert>> {
        match self.store.get(ALERTS_KEY)? {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => Ok(Vec::new()),
        }
    }

    /// Create or replace the alert for a pack.
    pub fn upsert(&self, alert: PriceAlert) -> Result<()> {
        let _guard = self.guard()?;
        let mut alerts = self.list()?;
        match alerts.iter_mut().find(|a| a.pack_id == alert.pack_id) {
            Some(existing) => *existing = alert,
            None => alerts.push(alert),
        }
        self.persist(alerts)
    }

    pub fn remove(&self, pack_id: &str) -> Result<()> {
        let _guard = self.guard()?;
        let mut alerts = self.list()?;
        alerts.retain(|a| a.pack_id != pack_id);
        self.persist(alerts)
    }

    /// Flip the triggered flag after a delivered notification. Idempotent.
    pub fn mark_triggered(&self, pack_id: &str) -> Result<()> {
        let _guard = self.guard()?;
        let mut alerts = self.list()?;
        if let Some(alert) = alerts.iter_mut().find(|a| a.pack_id == pack_id) {
            alert.triggered = true;
        }
        self.persist(alerts)
    }

    fn persist(&self, alerts: Vec<PriceAlert>) -> Result<()> {
        self.store.set(ALERTS_KEY, serde_json::to_value(alerts)?)
    }

    fn guard(&self) -> Result<MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|_| AppError::Internal("alert store lock poisoned".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn alert(pack_id: &str, target_price: f64) -> PriceAlert {
        PriceAlert {
            pack_id: pack_id.to_string(),
            pack_name: "Surging Sparks Booster Box".to_string(),
            set_name: "Surging Sparks".to_string(),
            product_type: ProductType::BoosterBox,
            target_price,
            notify_once: true,
            created_at: Utc::now(),
            triggered: false,
        }
    }

    fn service() -> AlertService {
        AlertService::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn upsert_inserts_then_replaces() {
        let alerts = service();

        alerts.upsert(alert("sv8-1", 130.0)).unwrap();
        alerts.upsert(alert("sv8-1", 120.0)).unwrap();

        let listed = alerts.list().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].pack_id, "sv8-1");
        assert_eq!(listed[0].target_price, 120.0);
    }

    #[test]
    fn upsert_keeps_alerts_for_other_packs() {
        let alerts = service();

        alerts.upsert(alert("sv8-1", 130.0)).unwrap();
        alerts.upsert(alert("sv7-2", 45.0)).unwrap();

        assert_eq!(alerts.list().unwrap().len(), 2);
    }

    #[test]
    fn remove_deletes_only_the_matching_alert() {
        let alerts = service();

        alerts.upsert(alert("sv8-1", 130.0)).unwrap();
        alerts.upsert(alert("sv7-2", 45.0)).unwrap();
        alerts.remove("sv8-1").unwrap();

        let listed = alerts.list().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].pack_id, "sv7-2");
    }

    #[test]
    fn mark_triggered_flips_the_flag() {
        let alerts = service();

        alerts.upsert(alert("sv8-1", 130.0)).unwrap();
        alerts.mark_triggered("sv8-1").unwrap();

        assert!(alerts.list().unwrap()[0].triggered);

        // marking again is harmless
        alerts.mark_triggered("sv8-1").unwrap();
        assert!(alerts.list().unwrap()[0].triggered);
    }

    #[test]
    fn alerts_survive_serialization() {
        let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
        let alerts = AlertService::new(store.clone());
        alerts.upsert(alert("sv8-1", 130.0)).unwrap();

        // a second service over the same store sees the same alerts
        let reloaded = AlertService::new(store);
        let listed = reloaded.list().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].product_type, ProductType::BoosterBox);
    }
}
