//! Per-line shipping fees.

use buildmart_core::{FulfillmentMode, Price};

use super::line::CartLine;
use super::pricing::PricingEngine;

/// Charges a flat fee on delivered lines that do not exceed their minimum
/// order. Lines strictly above the minimum ship free; pickup never pays.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShippingCalculator {
    pricing: PricingEngine,
}

impl ShippingCalculator {
    #[must_use]
    pub const fn new(pricing: PricingEngine) -> Self {
        Self { pricing }
    }

    #[must_use]
    pub fn shipping_fee(&self, line: &CartLine, mode: FulfillmentMode) -> Price {
        let rules = self.pricing.rules();
        if mode == FulfillmentMode::Pickup {
            return Price::zero(rules.currency);
        }
        if line.quantity <= self.pricing.minimum_order(&line.product) {
            rules.flat_shipping_fee()
        } else {
            Price::zero(rules.currency)
        }
    }

    /// Sum of [`Self::shipping_fee`] over the selected lines.
    pub fn total_shipping_fee<'a, I>(&self, lines: I, mode: FulfillmentMode) -> Price
    where
        I: IntoIterator<Item = &'a CartLine>,
    {
        Price::total(
            self.pricing.rules().currency,
            lines
                .into_iter()
                .filter(|line| line.selected)
                .map(|line| self.shipping_fee(line, mode)),
        )
    }
}
