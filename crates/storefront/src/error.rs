//! Cart error taxonomy, soft warnings and Sentry breadcrumbs.
//!
//! Hard failures are returned as [`CartError`]. Divergence between the local
//! cart and the server is not a failure: it is reported as an
//! [`InconsistencyWarning`] through the cart's notice channel.

use buildmart_core::{CurrencyCode, OrderId, ProductId, ServiceError};
use thiserror::Error;

/// Input rejected before any network call was made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Shipping address is required")]
    EmptyShippingAddress,

    #[error("Quantity {quantity} for product {product_id} is below the minimum order of {minimum}")]
    BelowMinimumOrder {
        product_id: ProductId,
        quantity: u32,
        minimum: u32,
    },

    #[error("No cart lines selected for checkout")]
    NoLinesSelected,

    #[error("Product {0} is not in the cart")]
    LineNotInCart(ProductId),

    #[error("Product {product_id} is priced in {found:?}, the cart is in {expected:?}")]
    CurrencyMismatch {
        product_id: ProductId,
        expected: CurrencyCode,
        found: CurrencyCode,
    },
}

/// Aggregate failure of a checkout batch.
///
/// Orders in `created` were persisted by the server before the batch failed
/// and are not rolled back.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Checkout failed for {failed} of {attempted} orders: {first_error}")]
pub struct CheckoutFailure {
    pub attempted: usize,
    pub failed: usize,
    pub created: Vec<OrderId>,
    pub first_error: ServiceError,
}

/// Errors surfaced by the cart engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error(transparent)]
    Checkout(#[from] CheckoutFailure),

    #[error("Sign in required")]
    Unauthorized,
}

impl CartError {
    /// Whether the error should block the user (field message or checkout
    /// dialog) rather than show as a dismissible toast.
    #[must_use]
    pub const fn is_blocking(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::Checkout(_) | Self::Unauthorized
        )
    }
}

/// Local cart state diverged from the server.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InconsistencyWarning {
    /// The line is gone locally but the remote delete failed. Heals on the
    /// next full cart load.
    #[error("Product {product_id} was removed locally but the server still has it: {error}")]
    DeleteFailed {
        product_id: ProductId,
        error: ServiceError,
    },

    /// The cart was emptied locally but the remote clear failed.
    #[error("Cart was cleared locally but the server still has it: {0}")]
    ClearFailed(ServiceError),

    /// A sync response arrived after a newer local edit and was ignored.
    #[error("Ignored stale sync response for product {product_id} (revision {revision})")]
    StaleResponseDiscarded { product_id: ProductId, revision: u64 },

    /// A checkout batch failed after some orders were already created.
    #[error("Checkout failed after creating orders {created:?}")]
    PartialCheckout { created: Vec<OrderId> },
}

/// Messages pushed to the UI layer outside of a direct call's result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartNotice {
    /// A debounced sync failed for one line; its quantity was rolled back.
    SyncFailed {
        product_id: ProductId,
        error: ServiceError,
    },
    Inconsistency(InconsistencyWarning),
}

/// Result type alias for `CartError`.
pub type Result<T> = std::result::Result<T, CartError>;

/// Add a breadcrumb for cart actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user
/// actions leading up to an error.
pub fn add_breadcrumb(category: &str, message: &str, data: &[(&str, String)]) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    for (key, value) in data {
        breadcrumb.data.insert(
            (*key).to_string(),
            serde_json::Value::String(value.clone()),
        );
    }

    sentry::add_breadcrumb(breadcrumb);
}
