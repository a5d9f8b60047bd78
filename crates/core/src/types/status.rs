//! Status enums for orders, payments and fulfillment.

use serde::{Deserialize, Serialize};

/// Order lifecycle status.
///
/// Orders move forward through these values; cancellation is a status,
/// not a deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    OnDelivery,
    Completed,
    Canceled,
}

impl OrderStatus {
    /// Every order status, in lifecycle order.
    pub const ALL: [Self; 5] = [
        Self::Pending,
        Self::Processing,
        Self::OnDelivery,
        Self::Completed,
        Self::Canceled,
    ];
}

/// Payment status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
}

impl PaymentStatus {
    pub const ALL: [Self; 3] = [Self::Pending, Self::Paid, Self::Failed];
}

/// Priority requested by the customer at checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

/// How an order leaves the yard: delivered by truck or picked up by the buyer.
///
/// Serialized as the order's `shipment_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FulfillmentMode {
    #[default]
    Delivery,
    Pickup,
}

/// Payment terms agreed at checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentTerms {
    #[default]
    CashOnDelivery,
    BankTransfer,
    #[serde(rename = "net_15")]
    Net15,
    #[serde(rename = "net_30")]
    Net30,
}

macro_rules! impl_display_from_str {
    ($ty:ty, $what:literal, [$($variant:ident => $text:literal),+ $(,)?]) => {
        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$variant => write!(f, $text),)+
                }
            }
        }

        impl std::str::FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    _ => Err(format!(concat!("invalid ", $what, ": {}"), s)),
                }
            }
        }
    };
}

impl_display_from_str!(OrderStatus, "order status", [
    Pending => "pending",
    Processing => "processing",
    OnDelivery => "on_delivery",
    Completed => "completed",
    Canceled => "canceled",
]);

impl_display_from_str!(PaymentStatus, "payment status", [
    Pending => "pending",
    Paid => "paid",
    Failed => "failed",
]);

impl_display_from_str!(Priority, "priority", [
    High => "high",
    Medium => "medium",
    Low => "low",
]);

impl_display_from_str!(FulfillmentMode, "fulfillment mode", [
    Delivery => "delivery",
    Pickup => "pickup",
]);

impl_display_from_str!(PaymentTerms, "payment terms", [
    CashOnDelivery => "cash_on_delivery",
    BankTransfer => "bank_transfer",
    Net15 => "net_15",
    Net30 => "net_30",
]);
