//! Which status values an operator may pick next.
//!
//! The lists constrain the operator's choice, not what the order service
//! accepts. Going back to `pending` is the only move that is ever hidden.

use buildmart_core::{Order, OrderStatus, PaymentStatus};

/// Order statuses selectable for an order currently in `current`.
#[must_use]
pub fn allowed_order_statuses(current: OrderStatus) -> Vec<OrderStatus> {
    OrderStatus::ALL
        .into_iter()
        .filter(|&next| current == OrderStatus::Pending || next != OrderStatus::Pending)
        .collect()
}

/// Payment statuses selectable for an order currently in `current`.
#[must_use]
pub fn allowed_payment_statuses(current: PaymentStatus) -> Vec<PaymentStatus> {
    let settled = matches!(current, PaymentStatus::Paid | PaymentStatus::Failed);
    PaymentStatus::ALL
        .into_iter()
        .filter(|&next| !settled || next != PaymentStatus::Pending)
        .collect()
}

#[must_use]
pub fn allowed_order_status_transitions(order: &Order) -> Vec<OrderStatus> {
    allowed_order_statuses(order.order_status)
}

#[must_use]
pub fn allowed_payment_status_transitions(order: &Order) -> Vec<PaymentStatus> {
    allowed_payment_statuses(order.payment_status)
}
