//! Integration test support for Buildmart.
//!
//! In-memory fakes of every port, with call recording and failure
//! injection, so cart, checkout and operator flows can be driven end to end
//! without a server.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p buildmart-integration-tests
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Semaphore;

use buildmart_core::{
    AuthProvider, CurrencyCode, Order, OrderId, OrderPatch, OrderRequest, OrderStatus,
    PaymentStatus, Price, ProductCatalogCache, ProductId, ProductSnapshot, RemoteCartLine,
    RemoteCartService, RemoteOrderService, ServiceError, User, UserId,
};
use buildmart_storefront::cart::SyncScheduler;
use buildmart_storefront::{CartStore, CheckoutCoordinator, PricingEngine};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// =============================================================================
// Fixtures
// =============================================================================

/// Catalog entry with its pickup bucket detected from name and category.
#[must_use]
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

#[must_use]
pub fn hollow_block_4() -> ProductSnapshot {
    product("CHB 4\" Standard", "Hollow Block", 16)
}

#[must_use]
pub fn hollow_block_5() -> ProductSnapshot {
    product("CHB 5\" Standard", "Hollow Block", 22)
}

#[must_use]
pub fn cement() -> ProductSnapshot {
    let mut cement = product("Portland Cement 40kg", "Cement", 265);
    cement.minimum_order = Some(10);
    cement
}

#[must_use]
pub fn php(amount: i64) -> Price {
    Price::whole(amount, CurrencyCode::PHP)
}

#[must_use]
pub fn remote_line(id: i64, quantity: i64, product: ProductSnapshot) -> RemoteCartLine {
    RemoteCartLine {
        product_id: ProductId::new(id),
        quantity,
        product,
    }
}

/// Let spawned tasks run until they block.
pub async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

/// Advance paused time and let woken tasks run.
pub async fn advance(duration: Duration) {
    tokio::time::advance(duration).await;
    settle().await;
}

// =============================================================================
// Cart Service
// =============================================================================

/// A recorded call to the remote cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartCall {
    Get,
    Add(ProductId, u32),
    Update(ProductId, u32),
    Remove(ProductId),
    Clear,
}

/// Remote cart kept in memory.
#[derive(Default)]
pub struct FakeCartService {
    lines: Mutex<Vec<RemoteCartLine>>,
    calls: Mutex<Vec<CartCall>>,
    failing: Mutex<HashSet<ProductId>>,
    fail_clear: Mutex<bool>,
    gate: Mutex<Option<Arc<Semaphore>>>,
}

impl FakeCartService {
    #[must_use]
    pub fn with_lines(lines: Vec<RemoteCartLine>) -> Arc<Self> {
        let service = Self::default();
        *lock(&service.lines) = lines;
        Arc::new(service)
    }

    #[must_use]
    pub fn calls(&self) -> Vec<CartCall> {
        lock(&self.calls).clone()
    }

    pub fn clear_calls(&self) {
        lock(&self.calls).clear();
    }

    /// Server-side quantity of a product, if present.
    #[must_use]
    pub fn quantity(&self, product_id: ProductId) -> Option<i64> {
        lock(&self.lines)
            .iter()
            .find(|line| line.product_id == product_id)
            .map(|line| line.quantity)
    }

    /// Make every request for `product_id` fail.
    pub fn fail_for(&self, product_id: ProductId) {
        lock(&self.failing).insert(product_id);
    }

    pub fn recover(&self, product_id: ProductId) {
        lock(&self.failing).remove(&product_id);
    }

    pub fn fail_clear(&self) {
        *lock(&self.fail_clear) = true;
    }

    /// Hold update and remove responses until [`Self::release`].
    pub fn hold(&self) {
        *lock(&self.gate) = Some(Arc::new(Semaphore::new(0)));
    }

    /// Let every held response through.
    pub fn release(&self) {
        if let Some(gate) = lock(&self.gate).take() {
            gate.close();
        }
    }

    fn record(&self, call: CartCall) {
        lock(&self.calls).push(call);
    }

    async fn wait_for_gate(&self) {
        let gate = lock(&self.gate).clone();
        if let Some(gate) = gate {
            // No permits are ever added; close() is the release.
            let _ = gate.acquire().await;
        }
    }

    fn check(&self, product_id: ProductId) -> Result<(), ServiceError> {
        if lock(&self.failing).contains(&product_id) {
            return Err(ServiceError::Network("connection reset by peer".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteCartService for FakeCartService {
    async fn get_cart(&self) -> Result<Vec<RemoteCartLine>, ServiceError> {
        self.record(CartCall::Get);
        Ok(lock(&self.lines).clone())
    }

    async fn add_line(&self, product_id: ProductId, quantity: u32) -> Result<(), ServiceError> {
        self.record(CartCall::Add(product_id, quantity));
        self.check(product_id)?;
        let mut lines = lock(&self.lines);
        match lines.iter_mut().find(|line| line.product_id == product_id) {
            Some(line) => line.quantity += i64::from(quantity),
            None => lines.push(RemoteCartLine {
                product_id,
                quantity: i64::from(quantity),
                product: product("Unknown", "Unknown", 1),
            }),
        }
        Ok(())
    }

    async fn update_line(&self, product_id: ProductId, quantity: u32) -> Result<(), ServiceError> {
        self.record(CartCall::Update(product_id, quantity));
        self.wait_for_gate().await;
        self.check(product_id)?;
        if let Some(line) = lock(&self.lines)
            .iter_mut()
            .find(|line| line.product_id == product_id)
        {
            line.quantity = i64::from(quantity);
        }
        Ok(())
    }

    async fn remove_line(&self, product_id: ProductId) -> Result<(), ServiceError> {
        self.record(CartCall::Remove(product_id));
        self.wait_for_gate().await;
        self.check(product_id)?;
        lock(&self.lines).retain(|line| line.product_id != product_id);
        Ok(())
    }

    async fn clear_cart(&self) -> Result<(), ServiceError> {
        self.record(CartCall::Clear);
        if *lock(&self.fail_clear) {
            return Err(ServiceError::Server {
                status: 503,
                message: "cart service unavailable".to_string(),
            });
        }
        lock(&self.lines).clear();
        Ok(())
    }
}

// =============================================================================
// Order Service
// =============================================================================

/// Remote order store kept in memory.
pub struct FakeOrderService {
    orders: Mutex<HashMap<OrderId, Order>>,
    requests: Mutex<Vec<OrderRequest>>,
    patches: Mutex<Vec<(OrderId, OrderPatch)>>,
    failing: Mutex<HashSet<ProductId>>,
    next_id: AtomicUsize,
    now: DateTime<Utc>,
}

impl Default for FakeOrderService {
    fn default() -> Self {
        Self::at(Utc::now())
    }
}

impl FakeOrderService {
    /// Orders created by this service are stamped with `now`.
    #[must_use]
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            orders: Mutex::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
            patches: Mutex::new(Vec::new()),
            failing: Mutex::new(HashSet::new()),
            next_id: AtomicUsize::new(1000),
            now,
        }
    }

    #[must_use]
    pub fn with_orders(orders: Vec<Order>) -> Arc<Self> {
        let service = Self::default();
        lock(&service.orders).extend(orders.into_iter().map(|order| (order.id, order)));
        Arc::new(service)
    }

    /// Reject order creation for `product_id`.
    pub fn fail_for(&self, product_id: ProductId) {
        lock(&self.failing).insert(product_id);
    }

    #[must_use]
    pub fn requests(&self) -> Vec<OrderRequest> {
        lock(&self.requests).clone()
    }

    #[must_use]
    pub fn patches(&self) -> Vec<(OrderId, OrderPatch)> {
        lock(&self.patches).clone()
    }

    /// Every order persisted, in id order.
    #[must_use]
    pub fn orders(&self) -> Vec<Order> {
        let mut orders: Vec<Order> = lock(&self.orders).values().cloned().collect();
        orders.sort_by_key(|order| order.id);
        orders
    }
}

#[async_trait]
impl RemoteOrderService for FakeOrderService {
    async fn create_order(&self, request: &OrderRequest) -> Result<Order, ServiceError> {
        lock(&self.requests).push(request.clone());
        if lock(&self.failing).contains(&request.product_id) {
            return Err(ServiceError::Server {
                status: 422,
                message: format!("insufficient stock for product {}", request.product_id),
            });
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let order = Order {
            id: OrderId::new(i64::try_from(id).unwrap_or(i64::MAX)),
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
            created_at: self.now,
            shipping_address: request.shipping_address.clone(),
            client_reference: Some(request.client_reference),
        };
        lock(&self.orders).insert(order.id, order.clone());
        Ok(order)
    }

    async fn get_order(&self, id: OrderId) -> Result<Order, ServiceError> {
        lock(&self.orders)
            .get(&id)
            .cloned()
            .ok_or_else(|| ServiceError::NotFound(format!("order {id}")))
    }

    async fn update_order(&self, id: OrderId, patch: &OrderPatch) -> Result<Order, ServiceError> {
        lock(&self.patches).push((id, *patch));
        let mut orders = lock(&self.orders);
        let order = orders
            .get_mut(&id)
            .ok_or_else(|| ServiceError::NotFound(format!("order {id}")))?;
        if let Some(status) = patch.order_status {
            order.order_status = status;
        }
        if let Some(status) = patch.payment_status {
            order.payment_status = status;
        }
        Ok(order.clone())
    }
}

// =============================================================================
// Catalog Cache and Auth
// =============================================================================

/// Counts invalidations.
#[derive(Default)]
pub struct FakeCatalogCache {
    invalidations: AtomicUsize,
}

impl FakeCatalogCache {
    #[must_use]
    pub fn invalidations(&self) -> usize {
        self.invalidations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProductCatalogCache for FakeCatalogCache {
    async fn invalidate(&self) {
        self.invalidations.fetch_add(1, Ordering::SeqCst);
    }
}

/// Fixed session: signed in as one user, or signed out.
pub struct StaticAuth {
    user: Option<User>,
}

impl StaticAuth {
    #[must_use]
    pub fn signed_in() -> Arc<Self> {
        Arc::new(Self {
            user: Some(User {
                id: UserId::new(42),
                display_name: "Site Engineer".to_string(),
            }),
        })
    }

    #[must_use]
    pub fn signed_out() -> Arc<Self> {
        Arc::new(Self { user: None })
    }
}

impl AuthProvider for StaticAuth {
    fn token(&self) -> Option<String> {
        self.user.as_ref().map(|user| format!("token-{}", user.id))
    }

    fn current_user(&self) -> Option<User> {
        self.user.clone()
    }
}

// =============================================================================
// Wiring
// =============================================================================

/// A cart store and checkout coordinator over fresh fakes.
pub struct TestContext {
    pub remote_cart: Arc<FakeCartService>,
    pub orders: Arc<FakeOrderService>,
    pub catalog: Arc<FakeCatalogCache>,
    pub cart: CartStore,
    pub checkout: CheckoutCoordinator,
}

impl TestContext {
    /// Wire a signed-in store over `lines` and load it.
    ///
    /// # Panics
    ///
    /// Panics if the initial load fails.
    #[allow(clippy::expect_used)]
    pub async fn loaded(lines: Vec<RemoteCartLine>) -> Self {
        let ctx = Self::with_auth(lines, StaticAuth::signed_in());
        ctx.cart.load().await.expect("initial cart load");
        ctx.remote_cart.clear_calls();
        ctx
    }

    #[must_use]
    pub fn with_auth(lines: Vec<RemoteCartLine>, auth: Arc<StaticAuth>) -> Self {
        let remote_cart = FakeCartService::with_lines(lines);
        let orders = Arc::new(FakeOrderService::default());
        let catalog = Arc::new(FakeCatalogCache::default());
        let cart = CartStore::new(
            Arc::clone(&remote_cart) as Arc<dyn RemoteCartService>,
            auth,
            PricingEngine::default(),
            SyncScheduler::default(),
        );
        let checkout = CheckoutCoordinator::new(
            cart.clone(),
            Arc::clone(&orders) as Arc<dyn RemoteOrderService>,
            Arc::clone(&catalog) as Arc<dyn ProductCatalogCache>,
        );
        Self {
            remote_cart,
            orders,
            catalog,
            cart,
            checkout,
        }
    }
}
