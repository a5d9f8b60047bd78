//! Orders, order requests and the authenticated user.
//!
//! One order always corresponds to exactly one cart line at submission time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::id::{OrderId, ProductId, UserId};
use super::price::Price;
use super::status::{FulfillmentMode, OrderStatus, PaymentStatus, PaymentTerms, Priority};

/// A submitted order as stored by the remote order service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price_at_submission: Price,
    pub shipping_fee: Price,
    pub free_shipping: bool,
    pub payment_terms: PaymentTerms,
    pub priority: Priority,
    pub shipment_type: FulfillmentMode,
    pub order_status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub shipping_address: String,
    /// Idempotency key supplied by the client that created the order.
    #[serde(default)]
    pub client_reference: Option<Uuid>,
}

/// Payload for creating one order from one cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Price,
    pub shipping_fee: Price,
    pub free_shipping: bool,
    pub payment_terms: PaymentTerms,
    pub priority: Priority,
    pub shipment_type: FulfillmentMode,
    pub shipping_address: String,
    /// Fresh per request so a retried submission can be deduplicated server-side.
    pub client_reference: Uuid,
}

/// Partial update applied by the operator console.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_status: Option<OrderStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_status: Option<PaymentStatus>,
}

impl OrderPatch {
    #[must_use]
    pub const fn order_status(status: OrderStatus) -> Self {
        Self {
            order_status: Some(status),
            payment_status: None,
        }
    }

    #[must_use]
    pub const fn payment_status(status: PaymentStatus) -> Self {
        Self {
            order_status: None,
            payment_status: Some(status),
        }
    }
}

/// The signed-in user, as reported by the auth provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub display_name: String,
}
