//! In-memory port doubles for unit tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use chrono::Utc;

use buildmart_core::{
    AuthProvider, CurrencyCode, Price, ProductSnapshot, Order, OrderId, OrderPatch, OrderRequest, OrderStatus, PaymentStatus,
    ProductCatalogCache, ProductId, RemoteCartLine, RemoteCartService, RemoteOrderService,
    ServiceError, User, UserId,
};

use crate::cart::{CartStore, PricingEngine, SyncScheduler};

/// Catalog entry with its pickup bucket detected from name and category.
pub fn product(name: &str, category: &str, unit_price: i64) -> ProductSnapshot {
    ProductSnapshot {
        name: name.to_string(),
        category: category.to_string(),
        unit_price: Price::whole(unit_price, CurrencyCode::PHP),
        unit: "pc".to_string(),
        minimum_order: None,
        stock_quantity: 10_000,
        is_active: true,
        pickup_bucket: None,
    }
    .with_detected_bucket()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartCall {
    Get,
    Add(ProductId, u32),
    Update(ProductId, u32),
    Remove(ProductId),
    Clear,
}

#[derive(Default)]
pub struct RecordingCart {
    pub remote_lines: Mutex<Vec<RemoteCartLine>>,
    pub calls: Mutex<Vec<CartCall>>,
    pub failing: Mutex<HashSet<ProductId>>,
    pub fail_clear: Mutex<bool>,
}

impl RecordingCart {
    pub fn calls(&self) -> Vec<CartCall> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn fail_for(&self, product_id: ProductId) {
        self.failing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(product_id);
    }

    fn record(&self, call: CartCall) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }

    fn check(&self, product_id: ProductId) -> Result<(), ServiceError> {
        if self
            .failing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&product_id)
        {
            return Err(ServiceError::Network("connection reset".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteCartService for RecordingCart {
    async fn get_cart(&self) -> Result<Vec<RemoteCartLine>, ServiceError> {
        self.record(CartCall::Get);
        Ok(self
            .remote_lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    async fn add_line(&self, product_id: ProductId, quantity: u32) -> Result<(), ServiceError> {
        self.record(CartCall::Add(product_id, quantity));
        self.check(product_id)
    }

    async fn update_line(&self, product_id: ProductId, quantity: u32) -> Result<(), ServiceError> {
        self.record(CartCall::Update(product_id, quantity));
        self.check(product_id)
    }

    async fn remove_line(&self, product_id: ProductId) -> Result<(), ServiceError> {
        self.record(CartCall::Remove(product_id));
        self.check(product_id)
    }

    async fn clear_cart(&self) -> Result<(), ServiceError> {
        self.record(CartCall::Clear);
        if *self.fail_clear.lock().unwrap_or_else(PoisonError::into_inner) {
            return Err(ServiceError::Server {
                status: 500,
                message: "clear failed".to_string(),
            });
        }
        Ok(())
    }
}

/// Creates orders with sequential ids, failing for chosen products.
#[derive(Default)]
pub struct RecordingOrders {
    pub requests: Mutex<Vec<OrderRequest>>,
    pub failing: Mutex<HashSet<ProductId>>,
    next_id: AtomicI64,
}

impl RecordingOrders {
    pub fn requests(&self) -> Vec<OrderRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn fail_for(&self, product_id: ProductId) {
        self.failing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(product_id);
    }
}

#[async_trait]
impl RemoteOrderService for RecordingOrders {
    async fn create_order(&self, request: &OrderRequest) -> Result<Order, ServiceError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());
        if self
            .failing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&request.product_id)
        {
            return Err(ServiceError::Server {
                status: 422,
                message: "out of stock".to_string(),
            });
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Order {
            id: OrderId::new(id),
            product_id: request.product_id,
            quantity: request.quantity,
            unit_price_at_submission: request.unit_price,
            shipping_fee: request.shipping_fee,
            free_shipping: request.free_shipping,
            payment_terms: request.payment_terms,
            priority: request.priority,
            shipment_type: request.shipment_type,
            order_status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            created_at: Utc::now(),
            shipping_address: request.shipping_address.clone(),
            client_reference: Some(request.client_reference),
        })
    }

    async fn get_order(&self, id: OrderId) -> Result<Order, ServiceError> {
        Err(ServiceError::NotFound(format!("order {id}")))
    }

    async fn update_order(&self, id: OrderId, _patch: &OrderPatch) -> Result<Order, ServiceError> {
        Err(ServiceError::NotFound(format!("order {id}")))
    }
}

#[derive(Default)]
pub struct CountingCatalog {
    pub invalidations: AtomicI64,
}

#[async_trait]
impl ProductCatalogCache for CountingCatalog {
    async fn invalidate(&self) {
        self.invalidations.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct SignedIn(pub bool);

impl AuthProvider for SignedIn {
    fn token(&self) -> Option<String> {
        self.0.then(|| "test-token".to_string())
    }

    fn current_user(&self) -> Option<User> {
        self.0.then(|| User {
            id: UserId::new(1),
            display_name: "Test Buyer".to_string(),
        })
    }
}

pub fn store(remote: &Arc<RecordingCart>, signed_in: bool) -> CartStore {
    CartStore::new(
        Arc::clone(remote) as Arc<dyn RemoteCartService>,
        Arc::new(SignedIn(signed_in)),
        PricingEngine::default(),
        SyncScheduler::default(),
    )
}
