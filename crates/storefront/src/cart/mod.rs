//! Cart engine: local cart state, pricing, shipping and debounced sync.
//!
//! # Flow
//!
//! UI edits go to [`CartStore`], which applies them optimistically and arms
//! the [`SyncScheduler`]. When the debounce window passes without further
//! edits, dirty lines are pushed to the remote cart concurrently.
//!
//! Totals are derived with [`PricingEngine`] and [`ShippingCalculator`] for
//! the store's current fulfillment mode.

mod line;
mod pricing;
mod shipping;
mod store;
mod sync;

pub use line::{CartLine, CartSnapshot};
pub use pricing::{
    FLAT_SHIPPING_FEE, HOLLOW_BLOCK_4_PICKUP_PRICE, HOLLOW_BLOCK_5_PICKUP_PRICE,
    HOLLOW_BLOCK_MINIMUM_ORDER, PricingEngine, PricingRules,
};
pub use shipping::ShippingCalculator;
pub use store::CartStore;
pub use sync::{DEFAULT_DEBOUNCE, ScheduledTask, SyncReport, SyncScheduler};
