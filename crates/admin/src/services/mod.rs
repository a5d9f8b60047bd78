//! Operator-facing services.

pub mod order_status;

pub use order_status::OrderStatusService;
