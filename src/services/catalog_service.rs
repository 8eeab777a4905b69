use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::enums::{PriceStatus, ProductType, Series};
use crate::error::Result;
use crate::fallback;
use crate::tcgcsv::{GroupRow, PriceRow, ProductRow, TcgcsvClient, POKEMON_CATEGORY_ID};

pub const IMAGE_BASE_URL: &str = "https://images.pokemontcg.io";
pub const TCGPLAYER_BASE_URL: &str = "https://www.tcgplayer.com";

/// Keywords that mark a catalog listing as a sealed product rather than a
/// single card.
const SEALED_KEYWORDS: &[&str] = &[
    "booster box",
    "booster pack",
    "elite trainer box",
    "etb",
    "collection box",
    "blister",
    "bundle",
    "premium collection",
    "ultra premium",
    "build & battle",
    "build and battle",
    "sleeved booster",
    "check lane",
    "poster box",
    "special collection",
];

// ─── Models ──────────────────────────────────────────────────────────

/// A released card set. Replaced wholesale on every refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Set {
    pub id: String,
    pub group_id: Option<u32>,
    pub name: String,
    pub series: Series,
    pub release_date: NaiveDate,
    pub total: u32,
    pub logo_url: String,
    pub symbol_url: String,
}

/// A sealed, purchasable product tied to a set. The full pack collection is
/// rebuilt on every refresh; entries are never mutated in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pack {
    pub id: String,
    pub product_id: Option<u32>,
    pub name: String,
    pub set_id: String,
    pub set_name: String,
    pub series: Series,
    pub product_type: ProductType,
    pub current_price: f64,
    pub market_price: Option<f64>,
    pub mid_price: Option<f64>,
    pub low_price: Option<f64>,
    pub release_date: NaiveDate,
    pub is_holographic: bool,
    pub image_url: Option<String>,
    pub product_url: String,
    pub last_updated: DateTime<Utc>,
    pub is_real_data: bool,
}

impl Pack {
    /// Where this pack's price sits relative to its type's MSRP.
    pub fn price_status(&self) -> PriceStatus {
        PriceStatus::classify(Some(self.current_price), self.product_type.msrp())
    }
}

/// A catalog product that passed the sealed filter, joined with its quotes.
#[derive(Debug, Clone)]
pub struct SealedProduct {
    pub product_id: u32,
    pub name: String,
    pub lowest_price: f64,
    pub low_price: Option<f64>,
    pub mid_price: Option<f64>,
    pub market_price: Option<f64>,
    pub image_url: Option<String>,
}

// ─── CatalogService ──────────────────────────────────────────────────

/// Turns raw group/product/price rows from the pricing source into
/// normalized Set and Pack collections, falling back to synthetic data when
/// the live path yields nothing.
pub struct CatalogService {
    tcgcsv: Arc<TcgcsvClient>,
    max_sets: usize,
    max_groups_per_refresh: usize,
    fetch_concurrency: usize,
}

impl CatalogService {
    pub fn new(
        tcgcsv: Arc<TcgcsvClient>,
        max_sets: usize,
        max_groups_per_refresh: usize,
        fetch_concurrency: usize,
    ) -> Self {
        Self {
            tcgcsv,
            max_sets,
            max_groups_per_refresh,
            fetch_concurrency,
        }
    }

    /// List known sets, most recent first. Source failure is absorbed by the
    /// hardcoded fallback list; this never fails.
    pub async fn list_sets(&self) -> Vec<Set> {
        match self.tcgcsv.groups().await {
            Ok(groups) if !groups.is_empty() => map_groups_to_sets(&groups, self.max_sets),
            Ok(_) => {
                tracing::warn!("source returned no groups, using fallback set list");
                fallback::fallback_sets()
            }
            Err(e) => {
                tracing::warn!("set listing failed ({}), using fallback set list", e);
                fallback::fallback_sets()
            }
        }
    }

    /// Sealed products for one group, joined with their price quotes. The
    /// product and price catalogs are fetched concurrently.
    pub async fn sealed_products_with_prices(&self, group_id: u32) -> Result<Vec<SealedProduct>> {
        let (products, prices) =
            tokio::try_join!(self.tcgcsv.products(group_id), self.tcgcsv.prices(group_id))?;
        Ok(normalize_sealed_products(products, prices))
    }

    /// Build the full pack collection for a refresh. Fetches a bounded prefix
    /// of sets concurrently; if nothing usable comes back, the result is
    /// entirely synthetic demo data.
    pub async fn build_packs(&self, sets: &[Set]) -> Vec<Pack> {
        let targets: Vec<Set> = sets
            .iter()
            .filter(|s| s.group_id.is_some())
            .take(self.max_groups_per_refresh)
            .cloned()
            .collect();

        let semaphore = Arc::new(Semaphore::new(self.fetch_concurrency));
        let mut tasks = JoinSet::new();

        for set in targets {
            let client = self.tcgcsv.clone();
            let semaphore = semaphore.clone();
            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                let result = fetch_set_packs(&client, &set).await;
                (set, result)
            });
        }

        let mut packs = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(set_packs))) => packs.extend(set_packs),
                Ok((set, Err(e))) => {
                    tracing::warn!("failed to fetch sealed products for {}: {}", set.name, e);
                }
                Err(e) => tracing::warn!("sealed product fetch task failed: {}", e),
            }
        }

        if packs.is_empty() {
            tracing::warn!("no live sealed products available, generating demo packs");
            return fallback::generate_demo_packs(sets);
        }

        packs
    }
}

async fn fetch_set_packs(client: &TcgcsvClient, set: &Set) -> Result<Vec<Pack>> {
    let Some(group_id) = set.group_id else {
        return Ok(Vec::new());
    };
    let (products, prices) = tokio::try_join!(client.products(group_id), client.prices(group_id))?;
    let sealed = normalize_sealed_products(products, prices);
    Ok(packs_from_products(set, sealed, Utc::now()))
}

// ─── Normalization ───────────────────────────────────────────────────

/// Map raw group rows to Set records: drop promotional groupings, cap to the
/// most recent entries, classify the series, and sort newest first.
pub(crate) fn map_groups_to_sets(groups: &[GroupRow], max_sets: usize) -> Vec<Set> {
    let mut sets: Vec<Set> = groups
        .iter()
        .filter(|g| !g.name.is_empty() && !g.name.contains("Promo"))
        .take(max_sets)
        .map(|g| {
            let code = set_code(&g.name);
            Set {
                id: format!("tcg-{}", g.group_id),
                group_id: Some(g.group_id),
                name: g.name.clone(),
                series: Series::classify(&g.name),
                release_date: parse_release_date(g.published_on.as_deref()),
                total: 0,
                logo_url: format!("{}/{}/logo.png", IMAGE_BASE_URL, code),
                symbol_url: format!("{}/{}/symbol.png", IMAGE_BASE_URL, code),
            }
        })
        .collect();

    sets.sort_by(|a, b| b.release_date.cmp(&a.release_date));
    sets
}

/// Join catalog products with their quote rows, keeping only sealed products
/// that have a derivable price.
pub(crate) fn normalize_sealed_products(
    products: Vec<ProductRow>,
    prices: Vec<PriceRow>,
) -> Vec<SealedProduct> {
    let mut quotes: HashMap<u32, Vec<PriceRow>> = HashMap::new();
    for row in prices {
        quotes.entry(row.product_id).or_default().push(row);
    }

    let mut sealed = Vec::new();
    for product in products {
        if product.category_id != Some(POKEMON_CATEGORY_ID) || !is_sealed_name(&product.name) {
            continue;
        }

        let rows = quotes
            .get(&product.product_id)
            .map(Vec::as_slice)
            .unwrap_or(&[]);

        // lowest across all quote rows; a missing or zero field never competes
        let lowest = rows
            .iter()
            .filter_map(|r| first_positive(&[r.low_price, r.mid_price, r.market_price]))
            .fold(f64::INFINITY, f64::min);
        if !lowest.is_finite() {
            continue;
        }

        let first = rows.first();
        sealed.push(SealedProduct {
            product_id: product.product_id,
            name: product.name,
            lowest_price: lowest,
            low_price: first.and_then(|r| r.low_price),
            mid_price: first.and_then(|r| r.mid_price),
            market_price: first.and_then(|r| r.market_price),
            image_url: product.image_url,
        });
    }
    sealed
}

/// Assemble Pack records for one set from its normalized sealed products.
pub(crate) fn packs_from_products(
    set: &Set,
    products: Vec<SealedProduct>,
    now: DateTime<Utc>,
) -> Vec<Pack> {
    let mut packs = Vec::new();
    for product in products {
        // best available quote: low preferred, then market, then mid
        let Some(current_price) =
            first_positive(&[product.low_price, product.market_price, product.mid_price])
        else {
            continue;
        };

        let product_type = ProductType::infer(&product.name);
        let is_holographic = product.name.to_lowercase().contains("holo");

        packs.push(Pack {
            id: format!("{}-{}", set.id, product.product_id),
            product_id: Some(product.product_id),
            name: product.name,
            set_id: set.id.clone(),
            set_name: set.name.clone(),
            series: set.series,
            product_type,
            current_price,
            market_price: product.market_price,
            mid_price: product.mid_price,
            low_price: product.low_price,
            release_date: set.release_date,
            is_holographic,
            image_url: product.image_url.or_else(|| Some(set.logo_url.clone())),
            product_url: format!("{}/product/{}", TCGPLAYER_BASE_URL, product.product_id),
            last_updated: now,
            is_real_data: true,
        });
    }
    packs
}

fn is_sealed_name(product_name: &str) -> bool {
    let name = product_name.to_lowercase();
    SEALED_KEYWORDS.iter().any(|kw| name.contains(kw))
}

/// First present, positive value in preference order.
fn first_positive(values: &[Option<f64>]) -> Option<f64> {
    values.iter().filter_map(|v| *v).find(|v| *v > 0.0)
}

fn parse_release_date(published_on: Option<&str>) -> NaiveDate {
    published_on
        .and_then(|s| s.get(..10))
        .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
        .unwrap_or_else(default_release_date)
}

fn default_release_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default()
}

/// Known set-name to image-asset code lookup. Incomplete by nature; unknown
/// sets get the base code.
pub(crate) fn set_code(set_name: &str) -> &'static str {
    let name = set_name.to_lowercase();
    if name.contains("surging sparks") {
        "sv8"
    } else if name.contains("stellar crown") {
        "sv7"
    } else if name.contains("shrouded fable") {
        "sv6pt5"
    } else if name.contains("twilight masquerade") {
        "sv6"
    } else if name.contains("temporal forces") {
        "sv5"
    } else if name.contains("paldean fates") {
        "sv4pt5"
    } else if name.contains("paradox rift") {
        "sv4"
    } else if name.contains("151") {
        "sv3pt5"
    } else if name.contains("obsidian flames") {
        "sv3"
    } else if name.contains("paldea evolved") {
        "sv2"
    } else {
        "sv1"
    }
}

/// Retailer search URL used when no direct product page is known.
pub fn tcgplayer_search_url(query: &str) -> String {
    format!(
        "{}/search/pokemon/product?q={}&view=grid&ProductTypeName=Sealed+Products",
        TCGPLAYER_BASE_URL,
        urlencoding::encode(query)
    )
}
