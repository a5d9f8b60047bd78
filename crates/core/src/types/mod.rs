//! Core types for Buildmart.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod order;
pub mod price;
pub mod product;
pub mod status;

pub use id::*;
pub use order::{Order, OrderPatch, OrderRequest, User};
pub use price::{CurrencyCode, Price};
pub use product::{PickupBucket, ProductSnapshot};
pub use status::*;
