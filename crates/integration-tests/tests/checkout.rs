//! Integration tests for checkout: fan-out submission and all-or-nothing
//! client semantics.

#![allow(clippy::unwrap_used)]

use buildmart_core::{FulfillmentMode, PaymentTerms, Priority, ProductId};
use buildmart_integration_tests::{
    CartCall, StaticAuth, TestContext, cement, hollow_block_4, php, remote_line,
};
use buildmart_storefront::error::CheckoutFailure;
use buildmart_storefront::{CartError, CartNotice, CheckoutFields, InconsistencyWarning};

fn pid(id: i64) -> ProductId {
    ProductId::new(id)
}

fn fields(mode: FulfillmentMode) -> CheckoutFields {
    CheckoutFields {
        shipping_address: "Blk 7 Lot 3, Talisay City, Cebu".to_string(),
        payment_terms: PaymentTerms::BankTransfer,
        priority: Priority::High,
        fulfillment_mode: mode,
    }
}

async fn two_line_cart() -> TestContext {
    TestContext::loaded(vec![
        remote_line(1, 100, hollow_block_4()),
        remote_line(2, 25, cement()),
    ])
    .await
}

#[tokio::test]
async fn test_one_failed_order_keeps_every_line_in_the_cart() {
    let ctx = two_line_cart().await;
    ctx.orders.fail_for(pid(2));
    let mut notices = ctx.cart.notices();

    let err = ctx
        .checkout
        .submit_selected(&fields(FulfillmentMode::Delivery))
        .await
        .unwrap_err();

    // Single aggregate error for the batch.
    let CartError::Checkout(CheckoutFailure {
        attempted,
        failed,
        created,
        ..
    }) = err
    else {
        panic!("expected checkout failure, got {err:?}");
    };
    assert_eq!((attempted, failed), (2, 1));

    // Neither line leaves the local cart.
    assert_eq!(ctx.cart.lines().len(), 2);
    assert!(ctx.cart.line(pid(1)).is_some());
    assert!(ctx.cart.line(pid(2)).is_some());
    assert!(
        !ctx.remote_cart
            .calls()
            .iter()
            .any(|call| matches!(call, CartCall::Remove(_)))
    );
    assert_eq!(ctx.catalog.invalidations(), 0);

    // The order that succeeded is persisted and is not rolled back.
    let persisted = ctx.orders.orders();
    assert_eq!(persisted.len(), 1);
    assert_eq!(persisted[0].product_id, pid(1));
    assert_eq!(created, vec![persisted[0].id]);

    match notices.try_recv().unwrap() {
        CartNotice::Inconsistency(InconsistencyWarning::PartialCheckout { created: ids }) => {
            assert_eq!(ids, vec![persisted[0].id]);
        }
        other => panic!("unexpected notice: {other:?}"),
    }
}

#[tokio::test]
async fn test_successful_checkout_submits_one_order_per_line() {
    let ctx = two_line_cart().await;

    let orders = ctx
        .checkout
        .submit_selected(&fields(FulfillmentMode::Delivery))
        .await
        .unwrap();
    assert_eq!(orders.len(), 2);

    let requests = ctx.orders.requests();
    let blocks = requests.iter().find(|r| r.product_id == pid(1)).unwrap();
    assert_eq!(blocks.unit_price, php(16));
    assert_eq!(blocks.shipping_fee, php(150));
    assert!(!blocks.free_shipping);
    let cement = requests.iter().find(|r| r.product_id == pid(2)).unwrap();
    assert!(cement.shipping_fee.is_zero());
    assert!(cement.free_shipping);
    assert_ne!(blocks.client_reference, cement.client_reference);

    assert!(ctx.cart.lines().is_empty());
    let calls = ctx.remote_cart.calls();
    assert!(calls.contains(&CartCall::Remove(pid(1))));
    assert!(calls.contains(&CartCall::Remove(pid(2))));
    assert_eq!(ctx.catalog.invalidations(), 1);
}

#[tokio::test]
async fn test_pickup_checkout_uses_pickup_prices() {
    let ctx = two_line_cart().await;
    ctx.cart.toggle_selection(pid(2), false);

    ctx.checkout
        .submit_selected(&fields(FulfillmentMode::Pickup))
        .await
        .unwrap();

    let requests = ctx.orders.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].unit_price, php(14));
    assert_eq!(requests[0].shipment_type, FulfillmentMode::Pickup);
    assert!(requests[0].shipping_fee.is_zero());

    // The unselected line stays.
    assert_eq!(ctx.cart.lines().len(), 1);
    assert!(ctx.cart.line(pid(2)).is_some());
}

#[tokio::test]
async fn test_below_minimum_blocks_before_any_order() {
    let ctx = two_line_cart().await;
    ctx.cart.set_quantity(pid(2), 9).unwrap();

    let err = ctx
        .checkout
        .submit_selected(&fields(FulfillmentMode::Delivery))
        .await
        .unwrap_err();
    assert!(matches!(err, CartError::Validation(_)));
    assert!(err.is_blocking());
    assert!(ctx.orders.requests().is_empty());
}

#[tokio::test]
async fn test_signed_out_user_cannot_check_out() {
    let ctx = TestContext::with_auth(
        vec![remote_line(1, 100, hollow_block_4())],
        StaticAuth::signed_out(),
    );
    ctx.cart.load().await.unwrap();

    let err = ctx
        .checkout
        .submit_selected(&fields(FulfillmentMode::Delivery))
        .await
        .unwrap_err();
    assert_eq!(err, CartError::Unauthorized);
    assert!(ctx.orders.requests().is_empty());
}
