//! Product snapshots as carried by cart lines.

use serde::{Deserialize, Serialize};

use super::price::Price;

/// A point-in-time copy of the catalog entry for a product in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    pub name: String,
    pub category: String,
    pub unit_price: Price,
    /// Selling unit (e.g. "pc", "bag", "cu.m").
    pub unit: String,
    /// Configured minimum order; `None` means 1.
    #[serde(default)]
    pub minimum_order: Option<u32>,
    #[serde(default)]
    pub stock_quantity: u32,
    #[serde(default = "default_true")]
    pub is_active: bool,
    /// Special pickup-pricing bucket, if this product has one.
    #[serde(default)]
    pub pickup_bucket: Option<PickupBucket>,
}

const fn default_true() -> bool {
    true
}

impl ProductSnapshot {
    /// Fill in `pickup_bucket` from the name/category keywords when the
    /// remote record did not carry one.
    #[must_use]
    pub fn with_detected_bucket(mut self) -> Self {
        if self.pickup_bucket.is_none() {
            self.pickup_bucket = PickupBucket::detect(&self.name, &self.category);
        }
        self
    }
}

/// Concrete hollow block sizes that get a fixed price when picked up at the yard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PickupBucket {
    /// 4-inch hollow block.
    #[serde(rename = "hollow_block_4")]
    HollowBlock4,
    /// 5-inch hollow block.
    #[serde(rename = "hollow_block_5")]
    HollowBlock5,
}

impl PickupBucket {
    /// Keyword heuristic over the display name and category.
    ///
    /// The category must mention a hollow block; the size comes from a
    /// standalone `4`/`5` token (optionally suffixed `in`, `inch`, `inches`)
    /// in the name, falling back to the category. `4` is checked first, so a
    /// name mentioning both sizes lands in the 4-inch bucket.
    #[must_use]
    pub fn detect(name: &str, category: &str) -> Option<Self> {
        let category_lower = category.to_lowercase();
        let is_hollow_block = category_lower.contains("hollow block")
            || category_lower.contains("hollowblock")
            || category_lower.split(|c: char| !c.is_alphanumeric()).any(|t| t == "chb");
        if !is_hollow_block {
            return None;
        }

        size_token(name).or_else(|| size_token(category))
    }
}

fn size_token(text: &str) -> Option<PickupBucket> {
    let lower = text.to_lowercase();
    let tokens: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect();

    let has_size = |size: &str| {
        tokens.iter().any(|token| {
            token
                .strip_prefix(size)
                .is_some_and(|rest| matches!(rest, "" | "in" | "inch" | "inches"))
        })
    };

    if has_size("4") {
        Some(PickupBucket::HollowBlock4)
    } else if has_size("5") {
        Some(PickupBucket::HollowBlock5)
    } else {
        None
    }
}
