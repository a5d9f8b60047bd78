//! Buildmart operator console core.
//!
//! Ranks incoming orders for triage and applies status changes within the
//! selectable-status rules.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod error;
pub mod queue;
pub mod services;

pub use error::AdminError;
pub use queue::{Classification, OrderQueue, QueueEntry};
pub use services::OrderStatusService;
