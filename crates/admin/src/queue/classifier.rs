//! Order triage: classification, priority score and queue ordering.
//!
//! Pure functions of an order and the current time. The age of an order is
//! measured in fractional days, so "older than one day" means more than
//! 24 hours have passed since it was created.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use buildmart_core::{Order, OrderStatus, PaymentStatus};

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Age above which a pending, unpaid order is urgent.
const URGENT_AFTER_DAYS: f64 = 1.0;
/// Age above which an open order is escalated.
const STALE_AFTER_DAYS: f64 = 3.0;

const UNPAID_BONUS: f64 = 0.5;
const STALE_BONUS: f64 = 0.3;

/// Triage bucket shown next to each order in the operator queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Urgent,
    HighPriority,
    Normal,
}

impl Classification {
    pub const ALL: [Self; 3] = [Self::Urgent, Self::HighPriority, Self::Normal];
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Urgent => "urgent",
            Self::HighPriority => "high_priority",
            Self::Normal => "normal",
        })
    }
}

/// Days since the order was created. Negative for clock skew.
#[must_use]
pub fn age_in_days(order: &Order, now: DateTime<Utc>) -> f64 {
    #[allow(clippy::cast_precision_loss)] // Order ages are far below 2^52 seconds
    let seconds = (now - order.created_at).num_seconds() as f64;
    seconds / SECONDS_PER_DAY
}

#[must_use]
pub fn classify(order: &Order, now: DateTime<Utc>) -> Classification {
    let age = age_in_days(order, now);
    let status = order.order_status;
    let payment = order.payment_status;

    if status == OrderStatus::Pending && payment == PaymentStatus::Pending && age > URGENT_AFTER_DAYS
    {
        return Classification::Urgent;
    }

    let open = matches!(status, OrderStatus::Pending | OrderStatus::Processing);
    if status == OrderStatus::Pending
        || (status == OrderStatus::Processing && payment == PaymentStatus::Pending)
        || (age > STALE_AFTER_DAYS && open)
    {
        return Classification::HighPriority;
    }

    Classification::Normal
}

const fn base_score(status: OrderStatus) -> f64 {
    match status {
        OrderStatus::Pending => 1.0,
        OrderStatus::Processing => 2.0,
        OrderStatus::OnDelivery => 3.0,
        OrderStatus::Completed => 5.0,
        OrderStatus::Canceled => 6.0,
    }
}

/// Lower is more urgent.
#[must_use]
pub fn score(order: &Order, now: DateTime<Utc>) -> f64 {
    let mut score = base_score(order.order_status);
    if order.payment_status == PaymentStatus::Pending && order.order_status != OrderStatus::Canceled
    {
        score -= UNPAID_BONUS;
    }
    if age_in_days(order, now) > STALE_AFTER_DAYS {
        score -= STALE_BONUS;
    }
    score
}

/// Score ascending, then newest first.
#[must_use]
pub fn compare(a: &Order, b: &Order, now: DateTime<Utc>) -> Ordering {
    score(a, now)
        .total_cmp(&score(b, now))
        .then_with(|| b.created_at.cmp(&a.created_at))
}

/// Orders ranked for the operator queue.
#[must_use]
pub fn sort(mut orders: Vec<Order>, now: DateTime<Utc>) -> Vec<Order> {
    orders.sort_by(|a, b| compare(a, b, now));
    orders
}
