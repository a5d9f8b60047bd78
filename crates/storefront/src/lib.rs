//! Buildmart storefront cart engine.
//!
//! Local cart state with optimistic edits and debounced server sync,
//! fulfillment-aware pricing and shipping, and all-or-nothing checkout.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod cart;
pub mod checkout;
pub mod config;
pub mod error;

#[cfg(test)]
mod testing;

pub use cart::{CartLine, CartSnapshot, CartStore, PricingEngine, PricingRules, ShippingCalculator};
pub use checkout::{CheckoutCoordinator, CheckoutFields};
pub use config::StorefrontConfig;
pub use error::{CartError, CartNotice, InconsistencyWarning, ValidationError};
