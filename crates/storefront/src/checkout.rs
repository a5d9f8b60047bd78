//! Checkout: one order per selected cart line.
//!
//! Submissions fan out concurrently. The batch succeeds only if every order
//! is created; otherwise a single aggregate error is returned and the cart
//! is left untouched. Orders the server already created in a failed batch
//! are NOT rolled back and are reported as a partial-checkout warning.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use buildmart_core::{
    FulfillmentMode, Order, OrderRequest, PaymentTerms, Priority, ProductCatalogCache, ProductId,
    RemoteOrderService,
};

use crate::cart::{CartLine, CartStore};
use crate::error::{
    CartError, CartNotice, CheckoutFailure, InconsistencyWarning, Result, ValidationError,
    add_breadcrumb,
};

/// Customer-supplied fields for a checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutFields {
    pub shipping_address: String,
    pub payment_terms: PaymentTerms,
    pub priority: Priority,
    pub fulfillment_mode: FulfillmentMode,
}

/// Turns selected cart lines into orders.
#[derive(Clone)]
pub struct CheckoutCoordinator {
    cart: CartStore,
    orders: Arc<dyn RemoteOrderService>,
    catalog: Arc<dyn ProductCatalogCache>,
}

impl CheckoutCoordinator {
    #[must_use]
    pub fn new(
        cart: CartStore,
        orders: Arc<dyn RemoteOrderService>,
        catalog: Arc<dyn ProductCatalogCache>,
    ) -> Self {
        Self {
            cart,
            orders,
            catalog,
        }
    }

    /// Check the fields and lines without touching the network.
    ///
    /// # Errors
    ///
    /// Returns the first violation found.
    pub fn validate(&self, lines: &[CartLine], fields: &CheckoutFields) -> Result<()> {
        if fields.shipping_address.trim().is_empty() {
            return Err(ValidationError::EmptyShippingAddress.into());
        }
        if lines.is_empty() {
            return Err(ValidationError::NoLinesSelected.into());
        }
        let pricing = self.cart.pricing();
        for line in lines {
            let minimum = pricing.minimum_order(&line.product);
            if line.quantity < minimum {
                return Err(ValidationError::BelowMinimumOrder {
                    product_id: line.product_id,
                    quantity: line.quantity,
                    minimum,
                }
                .into());
            }
        }
        Ok(())
    }

    /// Build the order request for one line.
    #[must_use]
    pub fn order_request(&self, line: &CartLine, fields: &CheckoutFields) -> OrderRequest {
        let mode = fields.fulfillment_mode;
        let shipping_fee = self.cart.shipping().shipping_fee(line, mode);
        OrderRequest {
            product_id: line.product_id,
            quantity: line.quantity,
            unit_price: self.cart.pricing().effective_unit_price(&line.product, mode),
            shipping_fee,
            free_shipping: shipping_fee.is_zero(),
            payment_terms: fields.payment_terms,
            priority: fields.priority,
            shipment_type: mode,
            shipping_address: fields.shipping_address.trim().to_string(),
            client_reference: Uuid::new_v4(),
        }
    }

    /// Submit the cart's currently selected lines.
    ///
    /// # Errors
    ///
    /// See [`Self::submit`].
    pub async fn submit_selected(&self, fields: &CheckoutFields) -> Result<Vec<Order>> {
        let lines = self.cart.selected_lines();
        self.submit(&lines, fields).await
    }

    /// Submit one order per line.
    ///
    /// On success the submitted lines are deleted from the remote cart,
    /// removed from the local cart, and the catalog cache is invalidated so
    /// stock levels are refetched.
    ///
    /// # Errors
    ///
    /// - `Unauthorized` without a signed-in user
    /// - `Validation` before any request is made
    /// - `Checkout` if any order submission fails
    #[instrument(skip(self, lines, fields), fields(lines = lines.len()))]
    pub async fn submit(&self, lines: &[CartLine], fields: &CheckoutFields) -> Result<Vec<Order>> {
        if self.cart.auth().current_user().is_none() {
            return Err(CartError::Unauthorized);
        }
        self.validate(lines, fields)?;

        add_breadcrumb(
            "checkout",
            "Submitting orders",
            &[("lines", lines.len().to_string())],
        );

        let requests: Vec<OrderRequest> = lines
            .iter()
            .map(|line| self.order_request(line, fields))
            .collect();

        let results = join_all(
            requests
                .iter()
                .map(|request| self.orders.create_order(request)),
        )
        .await;

        let attempted = results.len();
        let mut created = Vec::with_capacity(attempted);
        let mut errors = Vec::new();
        for result in results {
            match result {
                Ok(order) => created.push(order),
                Err(e) => errors.push(e),
            }
        }

        if let Some(first_error) = errors.first().cloned() {
            let created_ids: Vec<_> = created.iter().map(|order| order.id).collect();
            error!(
                attempted,
                failed = errors.len(),
                created = ?created_ids,
                error = %first_error,
                "Checkout failed"
            );
            if !created_ids.is_empty() {
                self.cart.notify(CartNotice::Inconsistency(
                    InconsistencyWarning::PartialCheckout {
                        created: created_ids.clone(),
                    },
                ));
            }
            return Err(CheckoutFailure {
                attempted,
                failed: errors.len(),
                created: created_ids,
                first_error,
            }
            .into());
        }

        let product_ids: Vec<ProductId> = lines.iter().map(|line| line.product_id).collect();
        self.delete_submitted(&product_ids).await;
        self.cart.forget_lines(&product_ids);
        self.catalog.invalidate().await;

        info!(orders = created.len(), "Checkout complete");
        Ok(created)
    }

    async fn delete_submitted(&self, product_ids: &[ProductId]) {
        let remote = self.cart.remote();
        let results = join_all(product_ids.iter().map(|&id| remote.remove_line(id))).await;
        for (&product_id, result) in product_ids.iter().zip(results) {
            if let Err(error) = result {
                warn!(%product_id, error = %error, "Failed to delete ordered line from remote cart");
                self.cart.notify(CartNotice::Inconsistency(
                    InconsistencyWarning::DeleteFailed { product_id, error },
                ));
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::Ordering;

    use buildmart_core::{CurrencyCode, Price, RemoteCartLine};

    use super::*;
    use crate::testing::{CartCall, CountingCatalog, RecordingCart, RecordingOrders, product, store};

    fn pid(id: i64) -> ProductId {
        ProductId::new(id)
    }

    fn php(amount: i64) -> Price {
        Price::whole(amount, CurrencyCode::PHP)
    }

    fn fields(mode: FulfillmentMode) -> CheckoutFields {
        CheckoutFields {
            shipping_address: " 12 Rizal St, Cebu City ".to_string(),
            payment_terms: PaymentTerms::CashOnDelivery,
            priority: Priority::Medium,
            fulfillment_mode: mode,
        }
    }

    struct Harness {
        remote: Arc<RecordingCart>,
        orders: Arc<RecordingOrders>,
        catalog: Arc<CountingCatalog>,
        cart: CartStore,
        checkout: CheckoutCoordinator,
    }

    async fn harness(signed_in: bool) -> Harness {
        let remote = Arc::new(RecordingCart::default());
        *remote.remote_lines.lock().unwrap() = vec![
            RemoteCartLine {
                product_id: pid(1),
                quantity: 100,
                product: product("Hollow Block 4\"", "Hollow Block", 16),
            },
            RemoteCartLine {
                product_id: pid(2),
                quantity: 5,
                product: product("Washed Sand", "Aggregates", 1200),
            },
        ];
        let cart = store(&remote, signed_in);
        cart.load().await.unwrap();
        let orders = Arc::new(RecordingOrders::default());
        let catalog = Arc::new(CountingCatalog::default());
        let checkout = CheckoutCoordinator::new(
            cart.clone(),
            Arc::clone(&orders) as Arc<dyn RemoteOrderService>,
            Arc::clone(&catalog) as Arc<dyn ProductCatalogCache>,
        );
        Harness {
            remote,
            orders,
            catalog,
            cart,
            checkout,
        }
    }

    #[tokio::test]
    async fn test_successful_checkout_clears_submitted_lines() {
        let h = harness(true).await;
        h.cart.toggle_selection(pid(2), false);

        let created = h
            .checkout
            .submit_selected(&fields(FulfillmentMode::Pickup))
            .await
            .unwrap();

        assert_eq!(created.len(), 1);
        let request = &h.orders.requests()[0];
        assert_eq!(request.product_id, pid(1));
        assert_eq!(request.unit_price, php(14));
        assert!(request.shipping_fee.is_zero());
        assert!(request.free_shipping);
        assert_eq!(request.shipping_address, "12 Rizal St, Cebu City");

        assert!(h.cart.line(pid(1)).is_none());
        assert!(h.cart.line(pid(2)).is_some());
        assert!(h.remote.calls().contains(&CartCall::Remove(pid(1))));
        assert_eq!(h.catalog.invalidations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_delivery_order_carries_flat_fee_at_minimum() {
        let h = harness(true).await;
        let lines = h.cart.selected_lines();
        let request = h
            .checkout
            .order_request(&lines[0], &fields(FulfillmentMode::Delivery));
        assert_eq!(request.unit_price, php(16));
        assert_eq!(request.shipping_fee, php(150));
        assert!(!request.free_shipping);
    }

    #[tokio::test]
    async fn test_one_failure_fails_the_batch_and_keeps_the_cart() {
        let h = harness(true).await;
        h.orders.fail_for(pid(2));
        let mut notices = h.cart.notices();

        let err = h
            .checkout
            .submit_selected(&fields(FulfillmentMode::Delivery))
            .await
            .unwrap_err();

        let CartError::Checkout(failure) = err else {
            panic!("expected checkout failure, got {err:?}");
        };
        assert_eq!(failure.attempted, 2);
        assert_eq!(failure.failed, 1);
        assert_eq!(failure.created.len(), 1);

        assert_eq!(h.orders.requests().len(), 2);
        assert_eq!(h.cart.lines().len(), 2);
        assert!(!h.remote.calls().iter().any(|c| matches!(c, CartCall::Remove(_))));
        assert_eq!(h.catalog.invalidations.load(Ordering::SeqCst), 0);
        assert!(matches!(
            notices.try_recv().unwrap(),
            CartNotice::Inconsistency(InconsistencyWarning::PartialCheckout { .. })
        ));
    }

    #[tokio::test]
    async fn test_validation_blocks_before_any_request() {
        let h = harness(true).await;

        let mut blank = fields(FulfillmentMode::Delivery);
        blank.shipping_address = "   ".to_string();
        let err = h.checkout.submit_selected(&blank).await.unwrap_err();
        assert_eq!(err, CartError::Validation(ValidationError::EmptyShippingAddress));

        h.cart.set_quantity(pid(1), 99).unwrap();
        let err = h
            .checkout
            .submit_selected(&fields(FulfillmentMode::Delivery))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            CartError::Validation(ValidationError::BelowMinimumOrder {
                product_id: pid(1),
                quantity: 99,
                minimum: 100,
            })
        );

        h.cart.select_all(false);
        let err = h
            .checkout
            .submit_selected(&fields(FulfillmentMode::Delivery))
            .await
            .unwrap_err();
        assert_eq!(err, CartError::Validation(ValidationError::NoLinesSelected));

        assert!(h.orders.requests().is_empty());
    }

    #[tokio::test]
    async fn test_checkout_requires_user() {
        let h = harness(false).await;
        let err = h
            .checkout
            .submit_selected(&fields(FulfillmentMode::Delivery))
            .await
            .unwrap_err();
        assert_eq!(err, CartError::Unauthorized);
        assert!(h.orders.requests().is_empty());
    }
}
