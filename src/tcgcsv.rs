use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::cache::TtlCache;
use crate::error::{AppError, Result};

/// TCGCSV category id for the Pokemon catalog.
pub const POKEMON_CATEGORY_ID: u32 = 3;

// Set/group listings change rarely; product catalogs occasionally; price
// quotes frequently.
const GROUPS_TTL: Duration = Duration::from_secs(60 * 60);
const PRODUCTS_TTL: Duration = Duration::from_secs(30 * 60);
const PRICES_TTL: Duration = Duration::from_secs(15 * 60);

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupRow {
    pub group_id: u32,
    pub name: String,
    #[serde(default)]
    pub published_on: Option<String>,
    #[serde(default)]
    pub category_id: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRow {
    pub product_id: u32,
    pub name: String,
    #[serde(default)]
    pub category_id: Option<u32>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// One price observation for a product. Any of the three quote fields may be
/// absent depending on market activity.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceRow {
    pub product_id: u32,
    #[serde(default)]
    pub low_price: Option<f64>,
    #[serde(default)]
    pub mid_price: Option<f64>,
    #[serde(default)]
    pub market_price: Option<f64>,
    #[serde(default)]
    pub sub_type_name: Option<String>,
}

/// Read-only client for the TCGCSV pricing source. All three resource
/// classes go through the shared TTL cache.
pub struct TcgcsvClient {
    client: reqwest::Client,
    cache: Arc<TtlCache>,
    base_url: String,
}

impl TcgcsvClient {
    pub fn new(base_url: impl Into<String>, cache: Arc<TtlCache>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            cache,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// All groups (sets) in the catalog.
    pub async fn groups(&self) -> Result<Vec<GroupRow>> {
        self.fetch_rows("groups", "groups".to_string(), GROUPS_TTL).await
    }

    /// Product catalog for one group.
    pub async fn products(&self, group_id: u32) -> Result<Vec<ProductRow>> {
        let path = format!("{}/products", group_id);
        self.fetch_rows(&path, format!("products:{}", group_id), PRODUCTS_TTL).await
    }

    /// Price quotes for one group.
    pub async fn prices(&self, group_id: u32) -> Result<Vec<PriceRow>> {
        let path = format!("{}/prices", group_id);
        self.fetch_rows(&path, format!("prices:{}", group_id), PRICES_TTL).await
    }

    async fn fetch_rows<T: DeserializeOwned>(
        &self,
        path: &str,
        cache_key: String,
        ttl: Duration,
    ) -> Result<Vec<T>> {
        let url = format!("{}/{}", self.base_url, path);
        let client = self.client.clone();
        let fetch_url = url.clone();

        let results = self
            .cache
            .get_or_fetch(&cache_key, ttl, || async move {
                let response = client
                    .get(&fetch_url)
                    .send()
                    .await
                    .map_err(|e| AppError::Source(format!("request to {} failed: {}", fetch_url, e)))?;

                if !response.status().is_success() {
                    return Err(AppError::Source(format!(
                        "{} returned status {}",
                        fetch_url,
                        response.status()
                    )));
                }

                let body: Value = response
                    .json()
                    .await
                    .map_err(|e| AppError::Source(format!("{}: invalid JSON: {}", fetch_url, e)))?;

                match body.get("results") {
                    Some(results) if results.is_array() => Ok(results.clone()),
                    _ => Err(AppError::Source(format!("{}: missing results array", fetch_url))),
                }
            })
            .await?;

        serde_json::from_value(results)
            .map_err(|e| AppError::Source(format!("{}: malformed rows: {}", url, e)))
    }
}
