//! Price a cart file under a fulfillment mode.
//!
//! # Usage
//!
//! ```bash
//! bm-cli quote --file cart.json --mode pickup
//! ```
//!
//! The file holds the body of `GET /cart`: `{ "items": [...] }`.

use std::fmt::Write;
use std::path::Path;

use buildmart_core::FulfillmentMode;
use buildmart_storefront::api::CartResponse;
use buildmart_storefront::config::ConfigError;
use buildmart_storefront::{
    CartLine, CartSnapshot, PricingEngine, PricingRules, ShippingCalculator, StorefrontConfig,
};
use tracing::debug;

use super::{CliError, read_json};

/// Pricing rules for a quote.
///
/// Quoting needs no API, so a missing `BUILDMART_API_URL` falls back to the
/// default rules. A present but invalid setting is still an error.
///
/// # Errors
///
/// Returns every `ConfigError` other than a missing variable.
pub fn rules(config: Result<StorefrontConfig, ConfigError>) -> Result<PricingRules, ConfigError> {
    match config {
        Ok(config) => Ok(config.pricing),
        Err(ConfigError::MissingEnvVar(name)) => {
            debug!(%name, "No storefront config, quoting with default pricing");
            Ok(PricingRules::default())
        }
        Err(e) => Err(e),
    }
}

/// Load a cart from `path` and print its totals under `mode`.
///
/// # Errors
///
/// Returns `CliError` if the file cannot be read or parsed, or if a line is
/// priced in another currency than `rules`.
pub fn run(path: &Path, mode: FulfillmentMode, rules: PricingRules) -> Result<(), CliError> {
    let cart: CartResponse = read_json(path)?;
    let pricing = PricingEngine::new(rules);

    let mut lines = Vec::with_capacity(cart.items.len());
    for item in cart.items {
        pricing.check_currency(item.product_id, &item.product)?;
        let Some(quantity) = u32::try_from(item.quantity).ok().filter(|&q| q > 0) else {
            continue;
        };
        lines.push(CartLine::loaded(
            item.product_id,
            quantity,
            item.product.with_detected_bucket(),
        ));
    }

    print!("{}", render(&lines, mode, &pricing));
    Ok(())
}

/// Per-line prices and cart totals.
#[must_use]
pub fn render(lines: &[CartLine], mode: FulfillmentMode, pricing: &PricingEngine) -> String {
    let shipping = ShippingCalculator::new(*pricing);
    let snapshot = CartSnapshot::compute(lines, mode, pricing, &shipping);

    let mut out = String::new();
    let _ = writeln!(out, "Fulfillment: {mode}");
    for line in &snapshot.lines {
        let unit_price = pricing.effective_unit_price(&line.product, mode);
        let _ = writeln!(
            out,
            "  {:<32} {:>6} x {:>10} = {:>12}  shipping {:>8}  (min {})",
            line.product.name,
            line.quantity,
            unit_price.to_string(),
            unit_price.times(line.quantity).to_string(),
            shipping.shipping_fee(line, mode).to_string(),
            pricing.minimum_order(&line.product),
        );
    }
    let _ = writeln!(out, "Items:    {}", snapshot.total_quantity);
    let _ = writeln!(out, "Subtotal: {}", snapshot.selected_total_price);
    let _ = writeln!(out, "Shipping: {}", snapshot.total_shipping_fee);
    let _ = writeln!(out, "Total:    {}", snapshot.grand_total);
    out
}
