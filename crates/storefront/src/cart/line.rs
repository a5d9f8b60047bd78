//! Cart lines and the derived read model.

use serde::Serialize;

use buildmart_core::{FulfillmentMode, Price, ProductId, ProductSnapshot};

use super::pricing::PricingEngine;
use super::shipping::ShippingCalculator;

/// One product's in-progress quantity and selection state.
///
/// `quantity` is the optimistic local value; `server_quantity` is the last
/// value the remote cart confirmed. Rollback sets the former to the latter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: u32,
    pub selected: bool,
    pub server_quantity: u32,
    pub product: ProductSnapshot,
    /// Bumped on every local quantity edit.
    #[serde(skip)]
    pub(crate) revision: u64,
    /// Revision of the latest edit the server acknowledged.
    #[serde(skip)]
    pub(crate) confirmed_revision: u64,
}

impl CartLine {
    /// A line as it arrives from the server: selected and in sync.
    #[must_use]
    pub const fn loaded(product_id: ProductId, quantity: u32, product: ProductSnapshot) -> Self {
        Self {
            product_id,
            quantity,
            selected: true,
            server_quantity: quantity,
            product,
            revision: 0,
            confirmed_revision: 0,
        }
    }

    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.quantity != self.server_quantity
    }
}

/// Read model published to subscribers after every change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartSnapshot {
    pub lines: Vec<CartLine>,
    pub fulfillment_mode: FulfillmentMode,
    pub total_quantity: u64,
    pub selected_total_price: Price,
    pub total_shipping_fee: Price,
    pub grand_total: Price,
}

impl CartSnapshot {
    #[must_use]
    pub fn compute(
        lines: &[CartLine],
        mode: FulfillmentMode,
        pricing: &PricingEngine,
        shipping: &ShippingCalculator,
    ) -> Self {
        let currency = pricing.rules().currency;
        let total_quantity = lines.iter().map(|line| u64::from(line.quantity)).sum();
        let selected_total_price = Price::total(
            currency,
            lines
                .iter()
                .filter(|line| line.selected)
                .map(|line| {
                    pricing
                        .effective_unit_price(&line.product, mode)
                        .times(line.quantity)
                }),
        );
        let total_shipping_fee = shipping.total_shipping_fee(lines, mode);

        Self {
            lines: lines.to_vec(),
            fulfillment_mode: mode,
            total_quantity,
            selected_total_price,
            total_shipping_fee,
            grand_total: selected_total_price + total_shipping_fee,
        }
    }

    /// Lines currently ticked for checkout.
    pub fn selected_lines(&self) -> impl Iterator<Item = &CartLine> {
        self.lines.iter().filter(|line| line.selected)
    }
}
