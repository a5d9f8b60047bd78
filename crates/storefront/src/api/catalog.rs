//! Client-side cache of product snapshots.
//!
//! Entries expire after the configured TTL. A successful checkout clears the
//! whole cache so stock levels are refetched.

use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use tracing::debug;

use buildmart_core::{ProductCatalogCache, ProductId, ProductSnapshot};

use crate::config::StorefrontConfig;

const MAX_CAPACITY: u64 = 1000;

/// `moka`-backed product cache keyed by product.
#[derive(Clone)]
pub struct CatalogCache {
    cache: Cache<ProductId, ProductSnapshot>,
}

impl CatalogCache {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(MAX_CAPACITY)
            .time_to_live(ttl)
            .build();
        Self { cache }
    }

    /// Cache with the configured TTL.
    #[must_use]
    pub fn from_config(config: &StorefrontConfig) -> Self {
        Self::new(config.catalog_cache_ttl)
    }

    pub async fn get(&self, product_id: ProductId) -> Option<ProductSnapshot> {
        self.cache.get(&product_id).await
    }

    pub async fn insert(&self, product_id: ProductId, product: ProductSnapshot) {
        self.cache.insert(product_id, product).await;
    }

    /// Drop one product, e.g. after its stock changed.
    pub async fn invalidate_product(&self, product_id: ProductId) {
        self.cache.invalidate(&product_id).await;
    }

    /// Number of live entries. Pending evictions are applied first.
    pub async fn len(&self) -> u64 {
        self.cache.run_pending_tasks().await;
        self.cache.entry_count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl ProductCatalogCache for CatalogCache {
    async fn invalidate(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
        debug!("Product catalog cache invalidated");
    }
}
