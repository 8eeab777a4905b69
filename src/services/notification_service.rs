use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};

use crate::error::{AppError, Result};
use crate::services::catalog_service::{Pack, IMAGE_BASE_URL};

const FOOTER_TEXT: &str = "PackTracker";

const COLOR_GREEN: u32 = 0x10b981;
const COLOR_GOLD: u32 = 0xfbbf24;
const COLOR_RED: u32 = 0xef4444;

/// Outcome of a webhook delivery attempt. Dispatch never fails hard; a
/// missing endpoint and a failed POST are both ordinary outcomes the caller
/// decides how to handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Delivered,
    NotConfigured,
    Failed(String),
}

impl DispatchOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DispatchOutcome::Delivered)
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_price_alert(&self, endpoint: &str, pack: &Pack, target_price: f64)
        -> DispatchOutcome;

    async fn test_webhook(&self, endpoint: &str) -> DispatchOutcome;
}

/// Delivers price alerts to a Discord-style webhook as rich embeds.
pub struct DiscordNotifier {
    client: reqwest::Client,
}

impl DiscordNotifier {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    fn format_price(price: f64) -> String {
        format!("${:.2}", price)
    }

    /// Deeper drops below the target escalate the embed color.
    fn alert_color(current_price: f64, target_price: f64) -> u32 {
        if current_price <= target_price * 0.8 {
            COLOR_RED
        } else if current_price <= target_price * 0.9 {
            COLOR_GOLD
        } else {
            COLOR_GREEN
        }
    }

    fn build_alert_payload(pack: &Pack, target_price: f64) -> Value {
        let msrp = pack.product_type.msrp();
        let savings = msrp - pack.current_price;
        let percent_off = if msrp > 0.0 { (savings / msrp) * 100.0 } else { 0.0 };
        let thumbnail = pack
            .image_url
            .clone()
            .unwrap_or_else(|| format!("{}/{}/logo.png", IMAGE_BASE_URL, pack.set_id));

        json!({
            "embeds": [{
                "title": format!("PRICE DROP: {}", pack.name),
                "description": format!(
                    "**Price dropped below your target of {}!**",
                    Self::format_price(target_price)
                ),
                "color": Self::alert_color(pack.current_price, target_price),
                "fields": [
                    { "name": "TCGPlayer Price", "value": Self::format_price(pack.current_price), "inline": true },
                    { "name": "Your Target", "value": Self::format_price(target_price), "inline": true },
                    { "name": "MSRP", "value": Self::format_price(msrp), "inline": true },
                    {
                        "name": "You Save vs MSRP",
                        "value": format!("{} ({:.1}% off)", Self::format_price(savings), percent_off),
                        "inline": false
                    },
                    { "name": "Set", "value": pack.set_name, "inline": true },
                    { "name": "Type", "value": pack.product_type.display_name(), "inline": true },
                ],
                "thumbnail": { "url": thumbnail },
                "timestamp": Utc::now().to_rfc3339(),
                "footer": { "text": FOOTER_TEXT },
            }],
            "components": [{
                "type": 1,
                "components": [{
                    "type": 2,
                    "style": 5,
                    "label": "Buy on TCGPlayer",
                    "url": pack.product_url,
                }]
            }]
        })
    }

    fn build_test_payload() -> Value {
        json!({
            "embeds": [{
                "title": "PackTracker Connected!",
                "description": "Your webhook is working. You will receive price alerts \
                                here when TCGPlayer prices drop below your targets.",
                "color": COLOR_GREEN,
                "fields": [
                    { "name": "Status", "value": "Connected", "inline": true },
                    { "name": "Source", "value": "TCGPlayer", "inline": true },
                ],
                "timestamp": Utc::now().to_rfc3339(),
                "footer": { "text": format!("Test message from {}", FOOTER_TEXT) },
            }],
        })
    }

    async fn post(&self, endpoint: &str, payload: &Value) -> DispatchOutcome {
        match self.client.post(endpoint).json(payload).send().await {
            Ok(response) if response.status().is_success() => DispatchOutcome::Delivered,
            Ok(response) => {
                DispatchOutcome::Failed(format!("webhook returned status {}", response.status()))
            }
            Err(e) => DispatchOutcome::Failed(format!("webhook request failed: {}", e)),
        }
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    async fn send_price_alert(
        &self,
        endpoint: &str,
        pack: &Pack,
        target_price: f64,
    ) -> DispatchOutcome {
        if endpoint.is_empty() {
            return DispatchOutcome::NotConfigured;
        }
        let payload = Self::build_alert_payload(pack, target_price);
        self.post(endpoint, &payload).await
    }

    async fn test_webhook(&self, endpoint: &str) -> DispatchOutcome {
        if endpoint.is_empty() {
            return DispatchOutcome::NotConfigured;
        }
        let payload = Self::build_test_payload();
        self.post(endpoint, &payload).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::{ProductType, Series};
    use chrono::NaiveDate;

    fn pack(current_price: f64) -> Pack {
        Pack {
            id: "sv8-11".to_string(),
            product_id: Some(11),
            name: "Surging Sparks Booster Box".to_string(),
            set_id: "sv8".to_string(),
            set_name: "Surging Sparks".to_string(),
            series: Series::ScarletViolet,
            product_type: ProductType::BoosterBox,
            current_price,
            market_price: None,
            mid_price: None,
            low_price: None,
            release_date: NaiveDate::from_ymd_opt(2024, 11, 8).unwrap(),
            is_holographic: false,
            image_url: None,
            product_url: "https://www.tcgplayer.com/product/11".to_string(),
            last_updated: Utc::now(),
            is_real_data: true,
        }
    }

    #[test]
    fn color_tiers_escalate_with_deeper_drops() {
        assert_eq!(DiscordNotifier::alert_color(100.0, 100.0), COLOR_GREEN);
        assert_eq!(DiscordNotifier::alert_color(90.0, 100.0), COLOR_GOLD);
        assert_eq!(DiscordNotifier::alert_color(80.0, 100.0), COLOR_RED);
        assert_eq!(DiscordNotifier::alert_color(75.0, 100.0), COLOR_RED);
    }

    #[test]
    fn alert_payload_carries_price_fields_and_link() {
        let payload = DiscordNotifier::build_alert_payload(&pack(120.0), 125.0);

        let embed = &payload["embeds"][0];
        assert_eq!(embed["title"], "PRICE DROP: Surging Sparks Booster Box");
        assert_eq!(embed["fields"][0]["value"], "$120.00");
        assert_eq!(embed["fields"][1]["value"], "$125.00");
        assert_eq!(embed["fields"][2]["value"], "$143.64");
        assert_eq!(embed["fields"][3]["value"], "$23.64 (16.5% off)");
        assert_eq!(
            payload["components"][0]["components"][0]["url"],
            "https://www.tcgplayer.com/product/11"
        );
    }

    #[test]
    fn missing_image_falls_back_to_set_logo() {
        let payload = DiscordNotifier::build_alert_payload(&pack(120.0), 125.0);
        assert_eq!(
            payload["embeds"][0]["thumbnail"]["url"],
            format!("{}/sv8/logo.png", IMAGE_BASE_URL)
        );
    }

    #[tokio::test]
    async fn empty_endpoint_is_not_configured() {
        let notifier = DiscordNotifier::new(Duration::from_secs(5)).unwrap();
        let outcome = notifier.send_price_alert("", &pack(120.0), 125.0).await;
        assert_eq!(outcome, DispatchOutcome::NotConfigured);

        let outcome = notifier.test_webhook("").await;
        assert_eq!(outcome, DispatchOutcome::NotConfigured);
    }
}
