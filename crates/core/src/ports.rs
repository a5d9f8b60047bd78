//! Ports for the remote collaborators of the cart and order engines.
//!
//! Each trait is object safe (via `async_trait`) so callers hold them as
//! `Arc<dyn ...>` and tests can substitute in-memory fakes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{Order, OrderId, OrderPatch, OrderRequest, ProductId, ProductSnapshot, User};

/// Errors returned by a remote service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// The request never got a response (DNS, connect, timeout, reset).
    #[error("Network error: {0}")]
    Network(String),

    /// The service answered with a non-success status.
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// The addressed resource does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Missing or rejected credentials.
    #[error("Unauthorized")]
    Unauthorized,

    /// The response body could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),
}

/// One line of the cart as persisted by the remote cart service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteCartLine {
    pub product_id: ProductId,
    pub quantity: i64,
    pub product: ProductSnapshot,
}

/// Session and identity lookups.
pub trait AuthProvider: Send + Sync {
    /// Bearer token for API calls, if signed in.
    fn token(&self) -> Option<String>;

    /// The signed-in user, if any.
    fn current_user(&self) -> Option<User>;
}

/// Server-side cart persistence.
#[async_trait]
pub trait RemoteCartService: Send + Sync {
    async fn get_cart(&self) -> Result<Vec<RemoteCartLine>, ServiceError>;

    async fn add_line(&self, product_id: ProductId, quantity: u32) -> Result<(), ServiceError>;

    async fn update_line(&self, product_id: ProductId, quantity: u32)
    -> Result<(), ServiceError>;

    async fn remove_line(&self, product_id: ProductId) -> Result<(), ServiceError>;

    async fn clear_cart(&self) -> Result<(), ServiceError>;
}

/// Server-side order persistence.
#[async_trait]
pub trait RemoteOrderService: Send + Sync {
    async fn create_order(&self, request: &OrderRequest) -> Result<Order, ServiceError>;

    async fn get_order(&self, id: OrderId) -> Result<Order, ServiceError>;

    async fn update_order(&self, id: OrderId, patch: &OrderPatch) -> Result<Order, ServiceError>;
}

/// Client-side product catalog cache.
#[async_trait]
pub trait ProductCatalogCache: Send + Sync {
    /// Drop every cached product so the next read refetches stock levels.
    async fn invalidate(&self);
}
