//! Buildmart Core - Shared types library.
//!
//! This crate provides common types used across all Buildmart components:
//! - `storefront` - Cart engine (pricing, shipping, sync, checkout)
//! - `admin` - Operator order queue (triage and status transitions)
//! - `cli` - Command-line tools for quoting carts and managing orders
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no HTTP clients.
//! Remote collaborators are described as ports in [`ports`] and implemented
//! elsewhere, so every consumer can swap in fakes for tests.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, prices, statuses, products and orders
//! - [`ports`] - Traits for the remote cart, order, auth and catalog services

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod ports;
pub mod types;

pub use ports::*;
pub use types::*;
