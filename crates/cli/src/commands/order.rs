//! Apply an operator status change through the remote API.
//!
//! # Usage
//!
//! ```bash
//! bm-cli order status --id 42 --to processing
//! bm-cli order payment --id 42 --to paid
//! ```
//!
//! # Environment Variables
//!
//! - `BUILDMART_API_URL` - Base URL of the REST API
//! - `BUILDMART_API_TOKEN` - Bearer token for the operator account

use std::sync::Arc;

use buildmart_admin::OrderStatusService;
use buildmart_core::{Order, OrderId, OrderStatus, PaymentStatus};
use buildmart_storefront::StorefrontConfig;
use buildmart_storefront::api::{ApiClient, StaticTokenAuth};

use super::CliError;

fn service(config: &StorefrontConfig) -> OrderStatusService {
    let auth = Arc::new(StaticTokenAuth::new(config.api_token.clone(), None));
    OrderStatusService::new(Arc::new(ApiClient::new(&config.api_url, auth)))
}

fn report(order: &Order) {
    println!(
        "Order {}: status {}, payment {}",
        order.id, order.order_status, order.payment_status
    );
}

/// Move order `id` to `next`.
///
/// # Errors
///
/// Returns `CliError` if the change is not allowed or the API call fails.
pub async fn set_status(config: &StorefrontConfig, id: i64, next: OrderStatus) -> Result<(), CliError> {
    let order = service(config)
        .set_order_status(OrderId::new(id), next)
        .await
        .inspect_err(buildmart_admin::AdminError::capture)?;
    report(&order);
    Ok(())
}

/// Move order `id`'s payment to `next`.
///
/// # Errors
///
/// Returns `CliError` if the change is not allowed or the API call fails.
pub async fn set_payment(
    config: &StorefrontConfig,
    id: i64,
    next: PaymentStatus,
) -> Result<(), CliError> {
    let order = service(config)
        .set_payment_status(OrderId::new(id), next)
        .await
        .inspect_err(buildmart_admin::AdminError::capture)?;
    report(&order);
    Ok(())
}
