use chrono::{NaiveDate, Utc};
use lazy_static::lazy_static;
use rand::Rng;

use crate::enums::{ProductType, Series};
use crate::services::catalog_service::{tcgplayer_search_url, Pack, Set, IMAGE_BASE_URL};

const MAX_DEMO_SETS: usize = 15;

// Demo prices vary uniformly within [0.70, 1.20) of the type MSRP.
const PRICE_VARIANCE_MIN: f64 = 0.70;
const PRICE_VARIANCE_SPAN: f64 = 0.50;

fn known_set(code: &str, name: &str, series: Series, date: (i32, u32, u32), total: u32, group_id: u32) -> Set {
    let (year, month, day) = date;
    Set {
        id: code.to_string(),
        group_id: Some(group_id),
        name: name.to_string(),
        series,
        release_date: NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default(),
        total,
        logo_url: format!("{}/{}/logo.png", IMAGE_BASE_URL, code),
        symbol_url: format!("{}/{}/symbol.png", IMAGE_BASE_URL, code),
    }
}

lazy_static! {
    /// Known recent sets, used when the pricing source is unreachable.
    pub static ref FALLBACK_SETS: Vec<Set> = vec![
        known_set("sv8", "Surging Sparks", Series::ScarletViolet, (2024, 11, 8), 191, 23901),
        known_set("sv7", "Stellar Crown", Series::ScarletViolet, (2024, 9, 13), 175, 23768),
        known_set("sv6pt5", "Shrouded Fable", Series::ScarletViolet, (2024, 8, 2), 99, 23702),
        known_set("sv6", "Twilight Masquerade", Series::ScarletViolet, (2024, 5, 24), 226, 23582),
        known_set("sv5", "Temporal Forces", Series::ScarletViolet, (2024, 3, 22), 218, 23466),
        known_set("sv4pt5", "Paldean Fates", Series::ScarletViolet, (2024, 1, 26), 245, 23360),
        known_set("sv4", "Paradox Rift", Series::ScarletViolet, (2023, 11, 3), 266, 23218),
        known_set("sv3pt5", "151", Series::ScarletViolet, (2023, 9, 22), 207, 23090),
        known_set("sv3", "Obsidian Flames", Series::ScarletViolet, (2023, 8, 11), 230, 22921),
        known_set("sv2", "Paldea Evolved", Series::ScarletViolet, (2023, 6, 9), 279, 22679),
        known_set("sv1", "Scarlet & Violet", Series::ScarletViolet, (2023, 3, 31), 258, 22426),
        known_set("swsh12pt5", "Crown Zenith", Series::SwordShield, (2023, 1, 20), 230, 22249),
        known_set("swsh12", "Silver Tempest", Series::SwordShield, (2022, 11, 11), 245, 21895),
        known_set("swsh11", "Lost Origin", Series::SwordShield, (2022, 9, 9), 247, 21664),
        known_set("swsh10", "Astral Radiance", Series::SwordShield, (2022, 5, 27), 246, 21204),
    ];
}

pub fn fallback_sets() -> Vec<Set> {
    FALLBACK_SETS.clone()
}

/// Generate a schema-valid synthetic pack collection so downstream consumers
/// always have data to operate on. Selected only when the live path yields
/// zero packs; never mixed with live records.
pub fn generate_demo_packs(sets: &[Set]) -> Vec<Pack> {
    let mut rng = rand::rng();
    let now = Utc::now();
    let mut packs = Vec::new();

    for set in sets.iter().take(MAX_DEMO_SETS) {
        let type_count = rng.random_range(4..8);

        for product_type in ProductType::all().iter().take(type_count) {
            let msrp = product_type.msrp();
            let variance = PRICE_VARIANCE_MIN + rng.random::<f64>() * PRICE_VARIANCE_SPAN;
            let price = (msrp * variance * 100.0).round() / 100.0;
            let name = format!("{} {}", set.name, product_type.display_name());

            packs.push(Pack {
                id: format!("{}-{}", set.id, product_type.as_str()),
                product_id: None,
                name: name.clone(),
                set_id: set.id.clone(),
                set_name: set.name.clone(),
                series: set.series,
                product_type: *product_type,
                current_price: price,
                market_price: None,
                mid_price: None,
                low_price: None,
                release_date: set.release_date,
                is_holographic: rng.random::<f64>() > 0.7,
                image_url: Some(set.logo_url.clone()),
                product_url: tcgplayer_search_url(&name),
                last_updated: now,
                is_real_data: false,
            });
        }
    }

    packs
}
