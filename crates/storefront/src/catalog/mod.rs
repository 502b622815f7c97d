//! Catalog reads with time-bounded caching.
//!
//! [`Catalog`] puts a [`CatalogCache`] in front of every read from a
//! [`CatalogSource`] (normally the remote commerce client). Each read kind has
//! its own TTL, and the cache key is the query fingerprint.
//!
//! Remote failures propagate to the caller; there is no stale fallback.

pub mod cache;
pub mod query;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use shopfront_core::{Category, Page, PaymentMethod, Product, ProductId};
use tracing::{info, instrument};

use crate::backend::BackendError;

pub use cache::{CacheStats, CatalogCache, Clock, ManualClock, SystemClock};
pub use query::{CategoryQuery, ProductOrderBy, ProductQuery, SortOrder};

/// Where catalog data comes from.
pub trait CatalogSource: Send + Sync {
    fn list_categories(
        &self,
        query: &CategoryQuery,
    ) -> impl Future<Output = Result<Page<Category>, BackendError>> + Send;

    fn list_products(
        &self,
        query: &ProductQuery,
    ) -> impl Future<Output = Result<Page<Product>, BackendError>> + Send;

    fn get_product(
        &self,
        id: ProductId,
    ) -> impl Future<Output = Result<Product, BackendError>> + Send;

    fn list_payment_methods(
        &self,
    ) -> impl Future<Output = Result<Vec<PaymentMethod>, BackendError>> + Send;
}

impl<S: CatalogSource> CatalogSource for Arc<S> {
    fn list_categories(
        &self,
        query: &CategoryQuery,
    ) -> impl Future<Output = Result<Page<Category>, BackendError>> + Send {
        (**self).list_categories(query)
    }

    fn list_products(
        &self,
        query: &ProductQuery,
    ) -> impl Future<Output = Result<Page<Product>, BackendError>> + Send {
        (**self).list_products(query)
    }

    fn get_product(
        &self,
        id: ProductId,
    ) -> impl Future<Output = Result<Product, BackendError>> + Send {
        (**self).get_product(id)
    }

    fn list_payment_methods(
        &self,
    ) -> impl Future<Output = Result<Vec<PaymentMethod>, BackendError>> + Send {
        (**self).list_payment_methods()
    }
}

/// Freshness window per read kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogTtls {
    pub products: Duration,
    pub categories: Duration,
    pub payment_methods: Duration,
}

impl Default for CatalogTtls {
    fn default() -> Self {
        Self {
            products: Duration::from_secs(300),
            categories: Duration::from_secs(900),
            payment_methods: Duration::from_secs(3600),
        }
    }
}

/// Cached catalog reads.
#[derive(Debug)]
pub struct Catalog<S> {
    source: Option<S>,
    cache: CatalogCache,
    ttls: CatalogTtls,
}

impl<S: CatalogSource> Catalog<S> {
    /// A catalog over `source`. With `None`, every read fails with
    /// [`BackendError::NotConfigured`].
    #[must_use]
    pub const fn new(source: Option<S>, cache: CatalogCache, ttls: CatalogTtls) -> Self {
        Self {
            source,
            cache,
            ttls,
        }
    }

    fn source(&self) -> Result<&S, BackendError> {
        self.source.as_ref().ok_or(BackendError::NotConfigured)
    }

    /// Returns true if a source is attached.
    #[must_use]
    pub const fn is_configured(&self) -> bool {
        self.source.is_some()
    }

    /// List categories.
    ///
    /// # Errors
    ///
    /// Returns an error if no source is configured or the fetch fails.
    #[instrument(skip(self))]
    pub async fn categories(&self, query: &CategoryQuery) -> Result<Page<Category>, BackendError> {
        let source = self.source()?;
        self.cache
            .get(&query.fingerprint(), self.ttls.categories, || {
                source.list_categories(query)
            })
            .await
    }

    /// List products matching `query`.
    ///
    /// # Errors
    ///
    /// Returns an error if no source is configured or the fetch fails.
    #[instrument(skip(self))]
    pub async fn products(&self, query: &ProductQuery) -> Result<Page<Product>, BackendError> {
        let source = self.source()?;
        self.cache
            .get(&query.fingerprint(), self.ttls.products, || {
                source.list_products(query)
            })
            .await
    }

    /// Get a single product.
    ///
    /// # Errors
    ///
    /// Returns an error if no source is configured, the product does not
    /// exist, or the fetch fails.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn product(&self, id: ProductId) -> Result<Product, BackendError> {
        let source = self.source()?;
        self.cache
            .get(&query::product_key(id), self.ttls.products, || {
                source.get_product(id)
            })
            .await
    }

    /// List enabled payment methods.
    ///
    /// # Errors
    ///
    /// Returns an error if no source is configured or the fetch fails.
    #[instrument(skip(self))]
    pub async fn payment_methods(&self) -> Result<Vec<PaymentMethod>, BackendError> {
        let source = self.source()?;
        self.cache
            .get(query::PAYMENT_METHODS_KEY, self.ttls.payment_methods, || {
                source.list_payment_methods()
            })
            .await
    }

    /// Drop all cached catalog data.
    pub fn refresh(&self) {
        self.cache.invalidate_all();
        info!("Catalog cache cleared");
    }

    #[must_use]
    pub const fn cache(&self) -> &CatalogCache {
        &self.cache
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use shopfront_core::{CategoryId, Money};

    use super::*;

    #[derive(Debug, Default)]
    struct FakeSource {
        calls: AtomicUsize,
        failing: AtomicBool,
    }

    impl FakeSource {
        fn hit(&self) -> Result<(), BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failing.load(Ordering::SeqCst) {
                Err(BackendError::Api {
                    status: 503,
                    message: "maintenance".to_string(),
                })
            } else {
                Ok(())
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    fn product(id: i64) -> Product {
        Product {
            id: ProductId::new(id),
            name: format!("Product {id}"),
            unit_price: Money::from_units(10),
            compare_unit_price: Money::from_units(12),
            transfer_price: None,
            stock_quantity: None,
            featured: false,
            image_url: None,
            category_ids: vec![],
        }
    }

    fn page<T>(items: Vec<T>, page: u32) -> Page<T> {
        Page {
            items,
            page,
            per_page: 20,
            total: None,
            total_pages: None,
        }
    }

    impl CatalogSource for FakeSource {
        async fn list_categories(
            &self,
            query: &CategoryQuery,
        ) -> Result<Page<Category>, BackendError> {
            self.hit()?;
            Ok(page(vec![], query.page()))
        }

        async fn list_products(&self, query: &ProductQuery) -> Result<Page<Product>, BackendError> {
            self.hit()?;
            let id = query.category.map_or(1, |c| c.as_i64());
            Ok(page(vec![product(id)], query.page()))
        }

        async fn get_product(&self, id: ProductId) -> Result<Product, BackendError> {
            self.hit()?;
            Ok(product(id.as_i64()))
        }

        async fn list_payment_methods(&self) -> Result<Vec<PaymentMethod>, BackendError> {
            self.hit()?;
            Ok(vec![PaymentMethod {
                id: "cod".to_string(),
                title: "Cash on delivery".to_string(),
                description: String::new(),
            }])
        }
    }

    fn catalog() -> (Catalog<Arc<FakeSource>>, Arc<FakeSource>, ManualClock) {
        let source = Arc::new(FakeSource::default());
        let clock = ManualClock::default();
        let cache = CatalogCache::with_clock(100, Arc::new(clock.clone()));
        (
            Catalog::new(Some(Arc::clone(&source)), cache, CatalogTtls::default()),
            source,
            clock,
        )
    }

    #[tokio::test]
    async fn test_repeat_reads_are_cached() {
        let (catalog, source, _) = catalog();

        catalog.product(ProductId::new(4)).await.unwrap();
        catalog.product(ProductId::new(4)).await.unwrap();
        catalog.payment_methods().await.unwrap();
        catalog.payment_methods().await.unwrap();

        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_distinct_queries_fetch_separately() {
        let (catalog, source, _) = catalog();

        let a = catalog.products(&ProductQuery::in_category(CategoryId::new(1))).await.unwrap();
        let b = catalog.products(&ProductQuery::in_category(CategoryId::new(2))).await.unwrap();

        assert_eq!(a.items[0].id, ProductId::new(1));
        assert_eq!(b.items[0].id, ProductId::new(2));
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_each_kind_has_its_own_ttl() {
        let (catalog, source, clock) = catalog();

        catalog.products(&ProductQuery::default()).await.unwrap();
        catalog.categories(&CategoryQuery::default()).await.unwrap();
        assert_eq!(source.calls(), 2);

        // Past the product TTL, inside the category TTL.
        clock.advance(Duration::from_secs(301));
        catalog.products(&ProductQuery::default()).await.unwrap();
        catalog.categories(&CategoryQuery::default()).await.unwrap();
        assert_eq!(source.calls(), 3);
    }

    #[tokio::test]
    async fn test_remote_failure_propagates() {
        let (catalog, source, clock) = catalog();
        catalog.product(ProductId::new(1)).await.unwrap();

        source.failing.store(true, Ordering::SeqCst);
        clock.advance(Duration::from_secs(600));

        let err = catalog.product(ProductId::new(1)).await.unwrap_err();
        assert!(matches!(err, BackendError::Api { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_refresh_invalidates() {
        let (catalog, source, _) = catalog();
        catalog.payment_methods().await.unwrap();
        catalog.refresh();
        catalog.payment_methods().await.unwrap();
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_unconfigured_catalog_fails_every_read() {
        let catalog: Catalog<Arc<FakeSource>> =
            Catalog::new(None, CatalogCache::new(10), CatalogTtls::default());

        assert!(!catalog.is_configured());
        assert!(matches!(
            catalog.products(&ProductQuery::default()).await,
            Err(BackendError::NotConfigured)
        ));
        assert!(matches!(
            catalog.payment_methods().await,
            Err(BackendError::NotConfigured)
        ));
    }
}
