//! Context-dependent unit pricing and minimum order rules.
//!
//! Hollow blocks picked up at the yard sell at a fixed per-bucket price and
//! carry a larger minimum order than their catalog entry. Every other
//! product sells at its catalog price under both fulfillment modes.

use rust_decimal::Decimal;

use buildmart_core::{
    CurrencyCode, FulfillmentMode, PickupBucket, Price, ProductId, ProductSnapshot,
};

use crate::error::ValidationError;

/// Fixed pickup price for 4-inch hollow blocks.
pub const HOLLOW_BLOCK_4_PICKUP_PRICE: i64 = 14;
/// Fixed pickup price for 5-inch hollow blocks.
pub const HOLLOW_BLOCK_5_PICKUP_PRICE: i64 = 19;
/// Minimum order for any product in a pickup bucket.
pub const HOLLOW_BLOCK_MINIMUM_ORDER: u32 = 100;
/// Shipping fee charged on a delivered line at or below its minimum order.
pub const FLAT_SHIPPING_FEE: i64 = 150;

/// Tunable pricing constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricingRules {
    pub currency: CurrencyCode,
    pub hollow_block_4_pickup_price: Decimal,
    pub hollow_block_5_pickup_price: Decimal,
    pub hollow_block_minimum_order: u32,
    pub flat_shipping_fee: Decimal,
}

impl Default for PricingRules {
    fn default() -> Self {
        Self {
            currency: CurrencyCode::PHP,
            hollow_block_4_pickup_price: Decimal::from(HOLLOW_BLOCK_4_PICKUP_PRICE),
            hollow_block_5_pickup_price: Decimal::from(HOLLOW_BLOCK_5_PICKUP_PRICE),
            hollow_block_minimum_order: HOLLOW_BLOCK_MINIMUM_ORDER,
            flat_shipping_fee: Decimal::from(FLAT_SHIPPING_FEE),
        }
    }
}

impl PricingRules {
    #[must_use]
    pub const fn flat_shipping_fee(&self) -> Price {
        Price::new(self.flat_shipping_fee, self.currency)
    }

    const fn pickup_price(&self, bucket: PickupBucket) -> Price {
        let amount = match bucket {
            PickupBucket::HollowBlock4 => self.hollow_block_4_pickup_price,
            PickupBucket::HollowBlock5 => self.hollow_block_5_pickup_price,
        };
        Price::new(amount, self.currency)
    }
}

/// Computes effective unit prices, minimum orders and pickup discounts.
#[derive(Debug, Clone, Copy, Default)]
pub struct PricingEngine {
    rules: PricingRules,
}

impl PricingEngine {
    #[must_use]
    pub const fn new(rules: PricingRules) -> Self {
        Self { rules }
    }

    #[must_use]
    pub const fn rules(&self) -> &PricingRules {
        &self.rules
    }

    /// Unit price for `product` under `mode`.
    #[must_use]
    pub fn effective_unit_price(&self, product: &ProductSnapshot, mode: FulfillmentMode) -> Price {
        match (mode, product.pickup_bucket) {
            (FulfillmentMode::Pickup, Some(bucket)) => self.rules.pickup_price(bucket),
            _ => product.unit_price,
        }
    }

    /// Smallest quantity accepted for one order of `product`.
    #[must_use]
    pub fn minimum_order(&self, product: &ProductSnapshot) -> u32 {
        if product.pickup_bucket.is_some() {
            return self.rules.hollow_block_minimum_order;
        }
        product.minimum_order.filter(|&min| min > 0).unwrap_or(1)
    }

    /// Reject a product priced in another currency than the cart totals.
    ///
    /// # Errors
    ///
    /// `CurrencyMismatch` if the catalog price is not in the rules' currency.
    pub fn check_currency(
        &self,
        product_id: ProductId,
        product: &ProductSnapshot,
    ) -> Result<(), ValidationError> {
        let found = product.unit_price.currency_code;
        if found == self.rules.currency {
            return Ok(());
        }
        Err(ValidationError::CurrencyMismatch {
            product_id,
            expected: self.rules.currency,
            found,
        })
    }

    /// Per-unit saving from picking up instead of delivery. Display only.
    #[must_use]
    pub fn pickup_discount(&self, product: &ProductSnapshot, mode: FulfillmentMode) -> Price {
        product
            .unit_price
            .saturating_sub(self.effective_unit_price(product, mode))
    }
}
