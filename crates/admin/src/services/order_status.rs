//! Applies operator status changes to remote orders.
//!
//! Each change is checked against the selectable-status lists before any
//! write; a rejected change never reaches the order service.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use buildmart_core::{Order, OrderId, OrderPatch, OrderStatus, PaymentStatus, RemoteOrderService};

use crate::error::AdminError;
use crate::queue::{allowed_order_statuses, allowed_payment_statuses};

/// Order status and payment status updates on behalf of an operator.
#[derive(Clone)]
pub struct OrderStatusService {
    orders: Arc<dyn RemoteOrderService>,
}

impl OrderStatusService {
    #[must_use]
    pub fn new(orders: Arc<dyn RemoteOrderService>) -> Self {
        Self { orders }
    }

    /// Move an order to `next`.
    ///
    /// # Errors
    ///
    /// `TransitionNotAllowed` if `next` is not selectable from the order's
    /// current status, or the service error from fetching or updating it.
    #[instrument(skip(self), fields(order_id = %id, next = %next))]
    pub async fn set_order_status(&self, id: OrderId, next: OrderStatus) -> Result<Order, AdminError> {
        let order = self.orders.get_order(id).await?;
        let current = order.order_status;
        if current == next {
            return Ok(order);
        }
        if !allowed_order_statuses(current).contains(&next) {
            warn!(from = %current, "Rejected order status change");
            return Err(AdminError::TransitionNotAllowed {
                field: "order status",
                from: current.to_string(),
                to: next.to_string(),
            });
        }

        let updated = self
            .orders
            .update_order(id, &OrderPatch::order_status(next))
            .await?;
        info!(from = %current, "Order status changed");
        Ok(updated)
    }

    /// Move an order's payment to `next`.
    ///
    /// # Errors
    ///
    /// `TransitionNotAllowed` if `next` is not selectable from the current
    /// payment status, or the service error from fetching or updating it.
    #[instrument(skip(self), fields(order_id = %id, next = %next))]
    pub async fn set_payment_status(
        &self,
        id: OrderId,
        next: PaymentStatus,
    ) -> Result<Order, AdminError> {
        let order = self.orders.get_order(id).await?;
        let current = order.payment_status;
        if current == next {
            return Ok(order);
        }
        if !allowed_payment_statuses(current).contains(&next) {
            warn!(from = %current, "Rejected payment status change");
            return Err(AdminError::TransitionNotAllowed {
                field: "payment status",
                from: current.to_string(),
                to: next.to_string(),
            });
        }

        let updated = self
            .orders
            .update_order(id, &OrderPatch::payment_status(next))
            .await?;
        info!(from = %current, "Payment status changed");
        Ok(updated)
    }
}
