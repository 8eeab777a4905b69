use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

// ─── ProductType ─────────────────────────────────────────────────────

/// Sealed product categories tracked against their reference MSRP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProductType {
    #[serde(rename = "booster-pack")]
    BoosterPack,
    #[serde(rename = "booster-box")]
    BoosterBox,
    #[serde(rename = "etb")]
    Etb,
    #[serde(rename = "blister-3pack")]
    Blister3Pack,
    #[serde(rename = "blister-1pack")]
    Blister1Pack,
    #[serde(rename = "collection-box")]
    CollectionBox,
    #[serde(rename = "premium-collection")]
    PremiumCollection,
    #[serde(rename = "ultra-premium")]
    UltraPremium,
    #[serde(rename = "booster-bundle")]
    BoosterBundle,
    #[serde(rename = "build-battle-stadium")]
    BuildBattleStadium,
    #[serde(rename = "poster-collection")]
    PosterCollection,
    #[serde(rename = "special-collection")]
    SpecialCollection,
}

/// Ordered keyword table for inferring a product type from a listing name.
/// First match wins; ambiguous names ("Ultra Premium Collection" matches the
/// premium-collection entry first) are an accepted limitation of the data.
const TYPE_KEYWORDS: &[(ProductType, &[&str])] = &[
    (ProductType::BoosterBox, &["booster box", "36 pack", "36-pack"]),
    (ProductType::Etb, &["elite trainer box", "etb"]),
    (ProductType::BoosterPack, &["booster pack", "sleeved booster"]),
    (ProductType::Blister3Pack, &["3 pack blister", "3-pack blister", "check lane"]),
    (ProductType::CollectionBox, &["collection box", "ex box", "v box"]),
    (ProductType::PremiumCollection, &["premium collection"]),
    (ProductType::UltraPremium, &["ultra premium", "ultra-premium"]),
    (ProductType::BoosterBundle, &["booster bundle", "6 pack"]),
    (ProductType::BuildBattleStadium, &["build & battle", "build and battle"]),
];

impl ProductType {
    /// Canonical string stored in persisted alerts and pack ids.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductType::BoosterPack => "booster-pack",
            ProductType::BoosterBox => "booster-box",
            ProductType::Etb => "etb",
            ProductType::Blister3Pack => "blister-3pack",
            ProductType::Blister1Pack => "blister-1pack",
            ProductType::CollectionBox => "collection-box",
            ProductType::PremiumCollection => "premium-collection",
            ProductType::UltraPremium => "ultra-premium",
            ProductType::BoosterBundle => "booster-bundle",
            ProductType::BuildBattleStadium => "build-battle-stadium",
            ProductType::PosterCollection => "poster-collection",
            ProductType::SpecialCollection => "special-collection",
        }
    }

    /// Human-readable name shown in notifications and listings.
    pub fn display_name(&self) -> &'static str {
        match self {
            ProductType::BoosterPack => "Booster Pack",
            ProductType::BoosterBox => "Booster Box (36 packs)",
            ProductType::Etb => "Elite Trainer Box",
            ProductType::Blister3Pack => "3-Pack Blister",
            ProductType::Blister1Pack => "Single Blister",
            ProductType::CollectionBox => "Collection Box",
            ProductType::PremiumCollection => "Premium Collection",
            ProductType::UltraPremium => "Ultra Premium Collection",
            ProductType::BoosterBundle => "Booster Bundle (6 packs)",
            ProductType::BuildBattleStadium => "Build & Battle Stadium",
            ProductType::PosterCollection => "Poster Collection",
            ProductType::SpecialCollection => "Special Collection",
        }
    }

    /// Reference MSRP in USD (Scarlet & Violet era pricing).
    pub fn msrp(&self) -> f64 {
        match self {
            ProductType::BoosterPack => 4.49,
            ProductType::BoosterBox => 143.64,
            ProductType::Etb => 49.99,
            ProductType::Blister3Pack => 14.99,
            ProductType::Blister1Pack => 5.99,
            ProductType::CollectionBox => 24.99,
            ProductType::PremiumCollection => 49.99,
            ProductType::UltraPremium => 119.99,
            ProductType::BoosterBundle => 24.99,
            ProductType::BuildBattleStadium => 44.99,
            ProductType::PosterCollection => 29.99,
            ProductType::SpecialCollection => 39.99,
        }
    }

    pub fn all() -> &'static [ProductType] {
        &[
            ProductType::BoosterPack,
            ProductType::BoosterBox,
            ProductType::Etb,
            ProductType::Blister3Pack,
            ProductType::Blister1Pack,
            ProductType::CollectionBox,
            ProductType::PremiumCollection,
            ProductType::UltraPremium,
            ProductType::BoosterBundle,
            ProductType::BuildBattleStadium,
            ProductType::PosterCollection,
            ProductType::SpecialCollection,
        ]
    }

    /// Infer the product type from a listing name.
    pub fn infer(product_name: &str) -> ProductType {
        let name = product_name.to_lowercase();
        for (product_type, keywords) in TYPE_KEYWORDS {
            if keywords.iter().any(|kw| name.contains(kw)) {
                return *product_type;
            }
        }
        ProductType::CollectionBox
    }
}

impl fmt::Display for ProductType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ProductType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProductType::all()
            .iter()
            .find(|t| t.as_str() == s)
            .copied()
            .ok_or_else(|| AppError::InvalidInput(format!("Unknown product type: {}", s)))
    }
}

// ─── Series ──────────────────────────────────────────────────────────

/// Card set era, derived from keywords in the set name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Series {
    #[serde(rename = "Scarlet & Violet")]
    ScarletViolet,
    #[serde(rename = "Sword & Shield")]
    SwordShield,
    #[serde(rename = "Sun & Moon")]
    SunMoon,
    #[serde(rename = "XY")]
    Xy,
    #[serde(rename = "Other")]
    Other,
}

const SCARLET_VIOLET_KEYWORDS: &[&str] = &[
    "scarlet", "violet", "paldea", "obsidian", "151", "paradox", "temporal", "twilight",
    "shrouded", "stellar", "surging",
];

const SWORD_SHIELD_KEYWORDS: &[&str] = &[
    "sword", "shield", "crown zenith", "silver tempest", "lost origin", "astral",
];

impl Series {
    /// Classify a set name into its era.
    pub fn classify(set_name: &str) -> Series {
        let name = set_name.to_lowercase();
        if SCARLET_VIOLET_KEYWORDS.iter().any(|kw| name.contains(kw)) {
            return Series::ScarletViolet;
        }
        if SWORD_SHIELD_KEYWORDS.iter().any(|kw| name.contains(kw)) {
            return Series::SwordShield;
        }
        if name.contains("sun") || name.contains("moon") {
            return Series::SunMoon;
        }
        if name.contains("xy") {
            return Series::Xy;
        }
        Series::Other
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Series::ScarletViolet => "Scarlet & Violet",
            Series::SwordShield => "Sword & Shield",
            Series::SunMoon => "Sun & Moon",
            Series::Xy => "XY",
            Series::Other => "Other",
        }
    }
}

impl fmt::Display for Series {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ─── PriceStatus ─────────────────────────────────────────────────────

/// Where a current price sits relative to the reference MSRP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PriceStatus {
    #[serde(rename = "great-deal")]
    GreatDeal,
    #[serde(rename = "below-msrp")]
    BelowMsrp,
    #[serde(rename = "at-msrp")]
    AtMsrp,
    #[serde(rename = "above-msrp")]
    AboveMsrp,
    #[serde(rename = "overpriced")]
    Overpriced,
    #[serde(rename = "unknown")]
    Unknown,
}

impl PriceStatus {
    /// Bucket a price by its percentage deviation from MSRP. Thresholds are
    /// inclusive on the lower side: a diff of exactly -15.0% is a GreatDeal.
    pub fn classify(current_price: Option<f64>, msrp: f64) -> PriceStatus {
        let current = match current_price {
            Some(p) if p > 0.0 => p,
            _ => return PriceStatus::Unknown,
        };
        if msrp <= 0.0 {
            return PriceStatus::Unknown;
        }

        let diff = ((current - msrp) / msrp) * 100.0;
        if diff <= -15.0 {
            PriceStatus::GreatDeal
        } else if diff <= -5.0 {
            PriceStatus::BelowMsrp
        } else if diff <= 5.0 {
            PriceStatus::AtMsrp
        } else if diff <= 15.0 {
            PriceStatus::AboveMsrp
        } else {
            PriceStatus::Overpriced
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PriceStatus::GreatDeal => "great-deal",
            PriceStatus::BelowMsrp => "below-msrp",
            PriceStatus::AtMsrp => "at-msrp",
            PriceStatus::AboveMsrp => "above-msrp",
            PriceStatus::Overpriced => "overpriced",
            PriceStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for PriceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
