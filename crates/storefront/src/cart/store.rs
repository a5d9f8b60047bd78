//! The authoritative local view of the user's cart.
//!
//! # Optimistic updates
//!
//! Quantity edits apply locally at once and mark the line dirty; the
//! debounced sync pushes them to the server later. A failed update rolls
//! the line back to its last server-confirmed quantity.
//!
//! Every local edit bumps the line's revision. A sync response is only
//! allowed to roll back or confirm the line if no newer edit happened while
//! it was in flight; otherwise it is discarded and the newer edit's own sync
//! settles the line.
//!
//! # Read model
//!
//! After every change a fresh [`CartSnapshot`] is published on a `watch`
//! channel. Sync failures and inconsistency warnings go out on a separate
//! `broadcast` channel of [`CartNotice`]s.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{broadcast, watch};
use tracing::{debug, info, instrument, warn};

use buildmart_core::{
    AuthProvider, FulfillmentMode, Price, ProductId, ProductSnapshot, RemoteCartService,
};

use super::line::{CartLine, CartSnapshot};
use super::pricing::PricingEngine;
use super::shipping::ShippingCalculator;
use super::sync::{SyncOp, SyncReport, SyncScheduler, run_round};
use crate::config::StorefrontConfig;
use crate::error::{
    CartError, CartNotice, InconsistencyWarning, Result, ValidationError, add_breadcrumb,
};

const NOTICE_CAPACITY: usize = 64;

#[derive(Debug, Default)]
struct CartState {
    lines: Vec<CartLine>,
    fulfillment_mode: FulfillmentMode,
    /// Lines with a local change not yet pushed to the server.
    dirty: BTreeSet<ProductId>,
    /// Revision at which a line was removed locally, until its delete is sent.
    removed: HashMap<ProductId, u64>,
    next_revision: u64,
}

impl CartState {
    fn line(&self, product_id: ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|line| line.product_id == product_id)
    }

    fn line_mut(&mut self, product_id: ProductId) -> Option<&mut CartLine> {
        self.lines
            .iter_mut()
            .find(|line| line.product_id == product_id)
    }

    fn bump_revision(&mut self) -> u64 {
        self.next_revision += 1;
        self.next_revision
    }

    fn take_ops(&mut self, only: Option<&[ProductId]>) -> Vec<SyncOp> {
        let product_ids: Vec<ProductId> = self
            .dirty
            .iter()
            .copied()
            .filter(|id| only.is_none_or(|only| only.contains(id)))
            .collect();

        product_ids
            .into_iter()
            .map(|product_id| {
                self.dirty.remove(&product_id);
                let removed_at = self.removed.remove(&product_id);
                match self.line(product_id) {
                    Some(line) => SyncOp::Update {
                        product_id,
                        quantity: line.quantity,
                        revision: line.revision,
                    },
                    None => SyncOp::Delete {
                        product_id,
                        revision: removed_at.unwrap_or_default(),
                    },
                }
            })
            .collect()
    }
}

/// Shared, cheaply cloneable handle to the cart.
#[derive(Clone)]
pub struct CartStore {
    inner: Arc<CartStoreInner>,
}

struct CartStoreInner {
    state: Mutex<CartState>,
    remote: Arc<dyn RemoteCartService>,
    auth: Arc<dyn AuthProvider>,
    pricing: PricingEngine,
    shipping: ShippingCalculator,
    scheduler: SyncScheduler,
    snapshot: watch::Sender<CartSnapshot>,
    notices: broadcast::Sender<CartNotice>,
}

impl CartStore {
    /// Create an empty cart store.
    #[must_use]
    pub fn new(
        remote: Arc<dyn RemoteCartService>,
        auth: Arc<dyn AuthProvider>,
        pricing: PricingEngine,
        scheduler: SyncScheduler,
    ) -> Self {
        let shipping = ShippingCalculator::new(pricing);
        let initial = CartSnapshot::compute(&[], FulfillmentMode::default(), &pricing, &shipping);
        let (snapshot, _) = watch::channel(initial);
        let (notices, _) = broadcast::channel(NOTICE_CAPACITY);

        Self {
            inner: Arc::new(CartStoreInner {
                state: Mutex::new(CartState::default()),
                remote,
                auth,
                pricing,
                shipping,
                scheduler,
                snapshot,
                notices,
            }),
        }
    }

    /// Create an empty cart store with the configured pricing and debounce
    /// window.
    #[must_use]
    pub fn from_config(
        config: &StorefrontConfig,
        remote: Arc<dyn RemoteCartService>,
        auth: Arc<dyn AuthProvider>,
    ) -> Self {
        Self::new(
            remote,
            auth,
            PricingEngine::new(config.pricing),
            SyncScheduler::new(config.sync_debounce),
        )
    }

    fn state(&self) -> MutexGuard<'_, CartState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, state: &CartState) {
        let snapshot = CartSnapshot::compute(
            &state.lines,
            state.fulfillment_mode,
            &self.inner.pricing,
            &self.inner.shipping,
        );
        self.inner.snapshot.send_replace(snapshot);
    }

    pub(crate) fn notify(&self, notice: CartNotice) {
        // No receivers just means no UI is listening.
        let _ = self.inner.notices.send(notice);
    }

    // =========================================================================
    // Read Model
    // =========================================================================

    /// Subscribe to snapshots published after every change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CartSnapshot> {
        self.inner.snapshot.subscribe()
    }

    /// Subscribe to sync failures and inconsistency warnings.
    #[must_use]
    pub fn notices(&self) -> broadcast::Receiver<CartNotice> {
        self.inner.notices.subscribe()
    }

    #[must_use]
    pub fn snapshot(&self) -> CartSnapshot {
        self.inner.snapshot.borrow().clone()
    }

    #[must_use]
    pub fn lines(&self) -> Vec<CartLine> {
        self.state().lines.clone()
    }

    #[must_use]
    pub fn line(&self, product_id: ProductId) -> Option<CartLine> {
        self.state().line(product_id).cloned()
    }

    #[must_use]
    pub fn selected_lines(&self) -> Vec<CartLine> {
        self.state()
            .lines
            .iter()
            .filter(|line| line.selected)
            .cloned()
            .collect()
    }

    /// Products with local changes (including removals) awaiting sync.
    #[must_use]
    pub fn pending_changes(&self) -> Vec<ProductId> {
        self.state().dirty.iter().copied().collect()
    }

    #[must_use]
    pub fn total_quantity(&self) -> u64 {
        self.inner.snapshot.borrow().total_quantity
    }

    #[must_use]
    pub fn selected_total_price(&self) -> Price {
        self.inner.snapshot.borrow().selected_total_price
    }

    #[must_use]
    pub fn total_shipping_fee(&self) -> Price {
        self.inner.snapshot.borrow().total_shipping_fee
    }

    #[must_use]
    pub fn grand_total(&self) -> Price {
        self.inner.snapshot.borrow().grand_total
    }

    #[must_use]
    pub fn fulfillment_mode(&self) -> FulfillmentMode {
        self.state().fulfillment_mode
    }

    #[must_use]
    pub fn pricing(&self) -> &PricingEngine {
        &self.inner.pricing
    }

    #[must_use]
    pub fn shipping(&self) -> &ShippingCalculator {
        &self.inner.shipping
    }

    pub(crate) fn remote(&self) -> &dyn RemoteCartService {
        self.inner.remote.as_ref()
    }

    pub(crate) fn auth(&self) -> &dyn AuthProvider {
        self.inner.auth.as_ref()
    }

    #[must_use]
    pub fn is_sync_scheduled(&self) -> bool {
        self.inner.scheduler.is_armed()
    }

    // =========================================================================
    // Loading
    // =========================================================================

    /// Replace the local cart with the server's.
    ///
    /// Pending local edits are dropped; this is how drift left by a failed
    /// delete heals.
    ///
    /// # Errors
    ///
    /// Returns the service error if the cart cannot be fetched, or
    /// `CurrencyMismatch` if a line is priced in another currency. Local
    /// state is untouched in both cases.
    #[instrument(skip(self))]
    pub async fn load(&self) -> Result<()> {
        let remote_lines = self.inner.remote.get_cart().await?;
        for remote in &remote_lines {
            self.inner
                .pricing
                .check_currency(remote.product_id, &remote.product)
                .inspect_err(|e| warn!(error = %e, "Rejected cart from server"))?;
        }

        let lines: Vec<CartLine> = remote_lines
            .into_iter()
            .filter_map(|remote| {
                let quantity = u32::try_from(remote.quantity).ok().filter(|&q| q > 0)?;
                Some(CartLine::loaded(remote.product_id, quantity, remote.product))
            })
            .collect();

        self.inner.scheduler.cancel();
        let mut state = self.state();
        state.lines = lines;
        state.dirty.clear();
        state.removed.clear();
        info!(lines = state.lines.len(), "Cart loaded");
        self.publish(&state);
        Ok(())
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Add `quantity` of a product.
    ///
    /// A new line is created on the server right away. A product already in
    /// the cart has the quantity merged into its line through the debounced
    /// path instead.
    ///
    /// # Errors
    ///
    /// `Unauthorized` without a signed-in user, `CurrencyMismatch` for a
    /// product priced in another currency, or the service error if the
    /// server refuses the new line.
    #[instrument(skip(self, product), fields(product_id = %product_id))]
    pub async fn add(
        &self,
        product_id: ProductId,
        product: ProductSnapshot,
        quantity: u32,
    ) -> Result<()> {
        if self.inner.auth.current_user().is_none() {
            return Err(CartError::Unauthorized);
        }
        self.inner.pricing.check_currency(product_id, &product)?;
        // Same bucket a reload would give the line.
        let product = product.with_detected_bucket();
        if quantity == 0 {
            return Ok(());
        }
        add_breadcrumb(
            "cart",
            "Added to cart",
            &[
                ("product_id", product_id.to_string()),
                ("quantity", quantity.to_string()),
            ],
        );

        let existing = self.state().line(product_id).map(|line| line.quantity);
        if let Some(current) = existing {
            return self.set_quantity(product_id, i64::from(current) + i64::from(quantity));
        }

        self.inner.remote.add_line(product_id, quantity).await?;

        let mut state = self.state();
        let revision = state.bump_revision();
        if let Some(line) = state.line_mut(product_id) {
            // Added again while the request was in flight.
            line.quantity += quantity;
            line.revision = revision;
            state.dirty.insert(product_id);
            self.publish(&state);
            drop(state);
            self.schedule_sync();
            return Ok(());
        }

        let mut line = CartLine::loaded(product_id, quantity, product);
        line.revision = revision;
        line.confirmed_revision = revision;
        state.lines.push(line);
        state.removed.remove(&product_id);
        state.dirty.remove(&product_id);
        self.publish(&state);
        Ok(())
    }

    /// Set a line's quantity. Zero or less removes the line and queues a
    /// remote delete.
    ///
    /// # Errors
    ///
    /// `LineNotInCart` when a positive quantity targets a product that is
    /// not in the cart.
    pub fn set_quantity(&self, product_id: ProductId, quantity: i64) -> Result<()> {
        let mut state = self.state();
        let revision = state.bump_revision();

        match u32::try_from(quantity).ok().filter(|&q| q > 0) {
            None => {
                let before = state.lines.len();
                state.lines.retain(|line| line.product_id != product_id);
                if state.lines.len() == before {
                    return Ok(());
                }
                state.removed.insert(product_id, revision);
                state.dirty.insert(product_id);
                debug!(%product_id, "Line removed locally");
            }
            Some(quantity) => {
                let line = state
                    .line_mut(product_id)
                    .ok_or(ValidationError::LineNotInCart(product_id))?;
                line.quantity = quantity;
                line.revision = revision;
                state.dirty.insert(product_id);
                debug!(%product_id, quantity, "Quantity changed locally");
            }
        }

        self.publish(&state);
        drop(state);
        self.schedule_sync();
        Ok(())
    }

    /// Tick or untick a line for checkout. Never syncs.
    ///
    /// Returns whether the line exists.
    pub fn toggle_selection(&self, product_id: ProductId, selected: bool) -> bool {
        let mut state = self.state();
        let Some(line) = state.line_mut(product_id) else {
            return false;
        };
        line.selected = selected;
        self.publish(&state);
        true
    }

    /// Set every line's selection flag.
    pub fn select_all(&self, selected: bool) {
        let mut state = self.state();
        for line in &mut state.lines {
            line.selected = selected;
        }
        self.publish(&state);
    }

    /// Switch between delivery and pickup pricing.
    pub fn set_fulfillment_mode(&self, mode: FulfillmentMode) {
        let mut state = self.state();
        state.fulfillment_mode = mode;
        self.publish(&state);
    }

    /// Remove a line and delete it on the server immediately.
    ///
    /// Other dirty lines keep waiting for the debounce timer.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn remove(&self, product_id: ProductId) -> SyncReport {
        add_breadcrumb(
            "cart",
            "Removed from cart",
            &[("product_id", product_id.to_string())],
        );
        // A non-positive quantity never fails.
        let _ = self.set_quantity(product_id, 0);
        self.reconcile(Some(std::slice::from_ref(&product_id))).await
    }

    /// Empty the cart locally and on the server.
    ///
    /// # Errors
    ///
    /// Returns the service error if the remote clear fails. The local cart
    /// stays empty and an inconsistency warning is published.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<()> {
        add_breadcrumb("cart", "Cleared cart", &[]);
        self.inner.scheduler.cancel();
        {
            let mut state = self.state();
            state.lines.clear();
            state.dirty.clear();
            state.removed.clear();
            self.publish(&state);
        }

        if let Err(error) = self.inner.remote.clear_cart().await {
            warn!(error = %error, "Remote cart clear failed");
            self.notify(CartNotice::Inconsistency(InconsistencyWarning::ClearFailed(
                error.clone(),
            )));
            return Err(error.into());
        }
        Ok(())
    }

    /// Drop lines locally without queueing remote deletes.
    pub(crate) fn forget_lines(&self, product_ids: &[ProductId]) {
        let mut state = self.state();
        state
            .lines
            .retain(|line| !product_ids.contains(&line.product_id));
        for product_id in product_ids {
            state.dirty.remove(product_id);
            state.removed.remove(product_id);
        }
        self.publish(&state);
    }

    // =========================================================================
    // Sync
    // =========================================================================

    fn schedule_sync(&self) {
        let weak = Arc::downgrade(&self.inner);
        self.inner.scheduler.arm(move || async move {
            if let Some(inner) = weak.upgrade() {
                CartStore { inner }.reconcile(None).await;
            }
        });
    }

    /// Cancel the debounce timer and reconcile every dirty line now.
    pub async fn flush_now(&self) -> SyncReport {
        self.inner.scheduler.cancel();
        self.reconcile(None).await
    }

    #[instrument(skip(self, only))]
    async fn reconcile(&self, only: Option<&[ProductId]>) -> SyncReport {
        let ops = self.state().take_ops(only);
        if ops.is_empty() {
            return SyncReport::default();
        }

        let outcomes = run_round(self.inner.remote.as_ref(), ops).await;

        let mut report = SyncReport::default();
        let mut notices = Vec::new();
        {
            let mut state = self.state();
            for outcome in outcomes {
                let product_id = outcome.op.product_id();
                match (outcome.op, outcome.result) {
                    (
                        SyncOp::Update {
                            quantity, revision, ..
                        },
                        Ok(()),
                    ) => {
                        if let Some(line) = state.line_mut(product_id)
                            && revision > line.confirmed_revision
                        {
                            line.server_quantity = quantity;
                            line.confirmed_revision = revision;
                        }
                        report.updated.push(product_id);
                    }
                    (SyncOp::Update { revision, .. }, Err(error)) => {
                        match state.line_mut(product_id) {
                            Some(line) if line.revision == revision => {
                                warn!(%product_id, error = %error, "Cart sync failed, rolling back");
                                line.quantity = line.server_quantity;
                                notices.push(CartNotice::SyncFailed {
                                    product_id,
                                    error: error.clone(),
                                });
                                report.failed.push((product_id, error));
                            }
                            _ => {
                                debug!(%product_id, revision, "Discarding stale sync failure");
                                notices.push(CartNotice::Inconsistency(
                                    InconsistencyWarning::StaleResponseDiscarded {
                                        product_id,
                                        revision,
                                    },
                                ));
                                report.stale.push(product_id);
                            }
                        }
                    }
                    (SyncOp::Delete { .. }, Ok(())) => report.deleted.push(product_id),
                    (SyncOp::Delete { revision, .. }, Err(error)) => {
                        if state.line(product_id).is_some() {
                            // Re-added while the delete was in flight.
                            notices.push(CartNotice::Inconsistency(
                                InconsistencyWarning::StaleResponseDiscarded {
                                    product_id,
                                    revision,
                                },
                            ));
                            report.stale.push(product_id);
                        } else {
                            warn!(%product_id, error = %error, "Remote delete failed, line stays removed locally");
                            notices.push(CartNotice::Inconsistency(
                                InconsistencyWarning::DeleteFailed {
                                    product_id,
                                    error: error.clone(),
                                },
                            ));
                            report.failed.push((product_id, error));
                        }
                    }
                }
            }
            self.publish(&state);
        }

        for notice in notices {
            self.notify(notice);
        }
        debug!(
            updated = report.updated.len(),
            deleted = report.deleted.len(),
            failed = report.failed.len(),
            stale = report.stale.len(),
            "Cart sync round finished"
        );
        report
    }
}

impl std::fmt::Debug for CartStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartStore")
            .field("state", &*self.state())
            .field("scheduler", &self.inner.scheduler)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use buildmart_core::{CurrencyCode, RemoteCartLine};

    use super::*;
    use crate::cart::DEFAULT_DEBOUNCE;
    use crate::testing::{CartCall, RecordingCart, SignedIn, product, store};

    fn pid(id: i64) -> ProductId {
        ProductId::new(id)
    }

    fn php(amount: i64) -> Price {
        Price::whole(amount, CurrencyCode::PHP)
    }

    fn remote_line(id: i64, quantity: i64) -> RemoteCartLine {
        RemoteCartLine {
            product_id: pid(id),
            quantity,
            product: product("Hollow Block 4\"", "Hollow Block", 16),
        }
    }

    async fn loaded_store(lines: Vec<RemoteCartLine>) -> (Arc<RecordingCart>, CartStore) {
        let remote = Arc::new(RecordingCart::default());
        *remote.remote_lines.lock().unwrap() = lines;
        let cart = store(&remote, true);
        cart.load().await.unwrap();
        remote.calls.lock().unwrap().clear();
        (remote, cart)
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_load_drops_empty_lines_and_selects_all() {
        let (_, cart) = loaded_store(vec![
            remote_line(1, 120),
            remote_line(2, 0),
            remote_line(3, -4),
        ])
        .await;

        let lines = cart.lines();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].product_id, pid(1));
        assert!(lines[0].selected);
        assert_eq!(lines[0].server_quantity, 120);
        assert!(cart.pending_changes().is_empty());
        assert_eq!(cart.total_quantity(), 120);
        assert_eq!(cart.selected_total_price(), php(1920));
    }

    #[tokio::test(start_paused = true)]
    async fn test_edits_within_window_coalesce_into_one_update() {
        let (remote, cart) = loaded_store(vec![remote_line(1, 120)]).await;

        for quantity in [130, 140, 150] {
            cart.set_quantity(pid(1), quantity).unwrap();
            tokio::time::advance(Duration::from_millis(1000)).await;
            settle().await;
        }
        assert!(remote.calls().is_empty());
        assert_eq!(cart.line(pid(1)).unwrap().quantity, 150);

        tokio::time::advance(Duration::from_millis(2000)).await;
        settle().await;
        assert_eq!(remote.calls(), vec![CartCall::Update(pid(1), 150)]);

        let line = cart.line(pid(1)).unwrap();
        assert_eq!(line.server_quantity, 150);
        assert!(!line.is_dirty());
        assert!(cart.pending_changes().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_update_rolls_back_to_server_quantity() {
        let (remote, cart) = loaded_store(vec![remote_line(1, 120), remote_line(2, 200)]).await;
        remote.fail_for(pid(1));
        let mut notices = cart.notices();

        cart.set_quantity(pid(1), 300).unwrap();
        cart.set_quantity(pid(2), 250).unwrap();
        tokio::time::advance(DEFAULT_DEBOUNCE).await;
        settle().await;

        assert_eq!(cart.line(pid(1)).unwrap().quantity, 120);
        assert_eq!(cart.line(pid(2)).unwrap().quantity, 250);
        assert_eq!(cart.snapshot().total_quantity, 370);

        let notice = notices.try_recv().unwrap();
        assert!(matches!(notice, CartNotice::SyncFailed { product_id, .. } if product_id == pid(1)));
    }

    #[tokio::test]
    async fn test_set_quantity_on_missing_line() {
        let (remote, cart) = loaded_store(vec![remote_line(1, 120)]).await;

        let err = cart.set_quantity(pid(9), 5).unwrap_err();
        assert_eq!(err, CartError::Validation(ValidationError::LineNotInCart(pid(9))));

        cart.set_quantity(pid(9), 0).unwrap();
        assert!(!cart.is_sync_scheduled());
        assert!(remote.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_remove_deletes_immediately_and_leaves_other_edits_pending() {
        let (remote, cart) = loaded_store(vec![remote_line(1, 120), remote_line(2, 200)]).await;

        cart.set_quantity(pid(2), 220).unwrap();
        let report = cart.remove(pid(1)).await;

        assert_eq!(report.deleted, vec![pid(1)]);
        assert_eq!(remote.calls(), vec![CartCall::Remove(pid(1))]);
        assert!(cart.line(pid(1)).is_none());
        assert_eq!(cart.pending_changes(), vec![pid(2)]);
        assert!(cart.is_sync_scheduled());
    }

    #[tokio::test]
    async fn test_failed_remove_keeps_line_gone_and_warns() {
        let (remote, cart) = loaded_store(vec![remote_line(1, 120)]).await;
        remote.fail_for(pid(1));
        let mut notices = cart.notices();

        let report = cart.remove(pid(1)).await;
        assert_eq!(report.failed.len(), 1);
        assert!(cart.lines().is_empty());
        assert!(matches!(
            notices.try_recv().unwrap(),
            CartNotice::Inconsistency(InconsistencyWarning::DeleteFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_selection_never_syncs() {
        let (remote, cart) = loaded_store(vec![remote_line(1, 120), remote_line(2, 200)]).await;

        assert!(cart.toggle_selection(pid(2), false));
        assert!(!cart.toggle_selection(pid(9), false));
        assert_eq!(cart.selected_lines().len(), 1);
        assert_eq!(cart.selected_total_price(), php(1920));
        assert_eq!(cart.total_quantity(), 320);
        assert!(!cart.is_sync_scheduled());
        assert!(remote.calls().is_empty());

        cart.select_all(true);
        assert_eq!(cart.selected_lines().len(), 2);
    }

    #[tokio::test]
    async fn test_fulfillment_mode_reprices_snapshot() {
        let (_, cart) = loaded_store(vec![remote_line(1, 100)]).await;
        let mut snapshots = cart.subscribe();

        assert_eq!(cart.grand_total(), php(1600 + 150));
        cart.set_fulfillment_mode(FulfillmentMode::Pickup);
        assert!(snapshots.has_changed().unwrap());
        let snapshot = snapshots.borrow_and_update().clone();
        assert_eq!(snapshot.fulfillment_mode, FulfillmentMode::Pickup);
        assert_eq!(snapshot.selected_total_price, php(1400));
        assert!(snapshot.total_shipping_fee.is_zero());
    }

    #[tokio::test]
    async fn test_add_requires_user() {
        let remote = Arc::new(RecordingCart::default());
        let cart = store(&remote, false);
        let err = cart
            .add(pid(1), product("Washed Sand", "Aggregates", 1200), 2)
            .await
            .unwrap_err();
        assert_eq!(err, CartError::Unauthorized);
        assert!(remote.calls().is_empty());
    }

    #[tokio::test]
    async fn test_add_new_line_is_immediate_and_existing_line_merges() {
        let (remote, cart) = loaded_store(vec![remote_line(1, 120)]).await;

        cart.add(pid(2), product("Washed Sand", "Aggregates", 1200), 2)
            .await
            .unwrap();
        assert_eq!(remote.calls(), vec![CartCall::Add(pid(2), 2)]);
        assert!(!cart.line(pid(2)).unwrap().is_dirty());

        cart.add(pid(1), product("Hollow Block 4\"", "Hollow Block", 16), 30)
            .await
            .unwrap();
        assert_eq!(remote.calls().len(), 1);
        assert_eq!(cart.line(pid(1)).unwrap().quantity, 150);
        assert_eq!(cart.pending_changes(), vec![pid(1)]);
    }

    #[tokio::test]
    async fn test_added_hollow_block_gets_pickup_price_without_reload() {
        let (_, cart) = loaded_store(Vec::new()).await;
        let mut block = product("CHB 4 inch", "Hollow Block", 16);
        block.pickup_bucket = None;

        cart.add(pid(4), block, 100).await.unwrap();
        cart.set_fulfillment_mode(FulfillmentMode::Pickup);

        let line = cart.line(pid(4)).unwrap();
        assert_eq!(
            cart.pricing().effective_unit_price(&line.product, FulfillmentMode::Pickup),
            php(14)
        );
        assert_eq!(cart.pricing().minimum_order(&line.product), 100);
        assert_eq!(cart.selected_total_price(), php(1400));
    }

    #[tokio::test]
    async fn test_foreign_currency_is_rejected_at_the_boundary() {
        let mut imported = product("Rebar 10mm", "Steel", 5);
        imported.unit_price = Price::whole(5, CurrencyCode::USD);

        let (remote, cart) = loaded_store(vec![remote_line(1, 120)]).await;
        let err = cart.add(pid(7), imported.clone(), 3).await.unwrap_err();
        assert!(matches!(
            err,
            CartError::Validation(ValidationError::CurrencyMismatch { .. })
        ));
        assert!(remote.calls().is_empty());

        remote.remote_lines.lock().unwrap().push(RemoteCartLine {
            product_id: pid(7),
            quantity: 3,
            product: imported,
        });
        let err = cart.load().await.unwrap_err();
        assert!(matches!(
            err,
            CartError::Validation(ValidationError::CurrencyMismatch { .. })
        ));
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.selected_total_price(), php(1920));
    }

    #[tokio::test(start_paused = true)]
    async fn test_from_config_uses_configured_debounce_and_fee() {
        let env = std::collections::HashMap::from([
            ("BUILDMART_API_URL", "https://api.buildmart.ph/v1"),
            ("BUILDMART_SYNC_DEBOUNCE_MS", "500"),
            ("BUILDMART_FLAT_SHIPPING_FEE", "200"),
        ]);
        let config =
            StorefrontConfig::from_lookup(|key| env.get(key).map(ToString::to_string)).unwrap();

        let remote = Arc::new(RecordingCart::default());
        *remote.remote_lines.lock().unwrap() = vec![remote_line(1, 120)];
        let cart = CartStore::from_config(
            &config,
            Arc::clone(&remote) as Arc<dyn RemoteCartService>,
            Arc::new(SignedIn(true)),
        );
        cart.load().await.unwrap();
        remote.calls.lock().unwrap().clear();

        cart.set_quantity(pid(1), 100).unwrap();
        assert_eq!(cart.total_shipping_fee(), php(200));

        tokio::time::advance(Duration::from_millis(500)).await;
        settle().await;
        assert_eq!(remote.calls(), vec![CartCall::Update(pid(1), 100)]);
    }

    #[tokio::test]
    async fn test_clear_failure_empties_locally_and_warns() {
        let (remote, cart) = loaded_store(vec![remote_line(1, 120)]).await;
        *remote.fail_clear.lock().unwrap() = true;
        let mut notices = cart.notices();

        let err = cart.clear().await.unwrap_err();
        assert!(matches!(err, CartError::Service(_)));
        assert!(cart.lines().is_empty());
        assert!(matches!(
            notices.try_recv().unwrap(),
            CartNotice::Inconsistency(InconsistencyWarning::ClearFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_flush_now_sends_pending_edits() {
        let (remote, cart) = loaded_store(vec![remote_line(1, 120), remote_line(2, 200)]).await;

        cart.set_quantity(pid(1), 130).unwrap();
        cart.set_quantity(pid(2), 0).unwrap();
        let report = cart.flush_now().await;

        assert!(report.is_clean());
        assert_eq!(report.requests(), 2);
        assert!(!cart.is_sync_scheduled());
        let calls = remote.calls();
        assert!(calls.contains(&CartCall::Update(pid(1), 130)));
        assert!(calls.contains(&CartCall::Remove(pid(2))));
    }
}
