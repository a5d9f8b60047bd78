//! The operator's order queue.
//!
//! [`OrderQueue::build`] ranks a batch of orders and attaches, per order,
//! its classification, score and the status values the operator may pick
//! next.

mod classifier;
mod transitions;


use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use buildmart_core::{Order, OrderStatus, PaymentStatus};

pub use classifier::{Classification, age_in_days, classify, compare, score, sort};
pub use transitions::{
    allowed_order_status_transitions, allowed_order_statuses, allowed_payment_status_transitions,
    allowed_payment_statuses,
};

/// One ranked row of the queue.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueueEntry {
    pub order: Order,
    pub classification: Classification,
    pub score: f64,
    pub allowed_order_statuses: Vec<OrderStatus>,
    pub allowed_payment_statuses: Vec<PaymentStatus>,
}

/// Orders ranked most urgent first.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OrderQueue {
    pub entries: Vec<QueueEntry>,
    pub counts: HashMap<Classification, usize>,
}

impl OrderQueue {
    /// Rank `orders` as of `now`.
    #[must_use]
    pub fn build(orders: Vec<Order>, now: DateTime<Utc>) -> Self {
        let entries: Vec<QueueEntry> = sort(orders, now)
            .into_iter()
            .map(|order| QueueEntry {
                classification: classify(&order, now),
                score: score(&order, now),
                allowed_order_statuses: allowed_order_status_transitions(&order),
                allowed_payment_statuses: allowed_payment_status_transitions(&order),
                order,
            })
            .collect();

        let mut counts = HashMap::new();
        for entry in &entries {
            *counts.entry(entry.classification).or_insert(0) += 1;
        }

        Self { entries, counts }
    }

    #[must_use]
    pub fn count(&self, classification: Classification) -> usize {
        self.counts.get(&classification).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
