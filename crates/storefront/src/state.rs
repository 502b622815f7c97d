//! Application state shared across handlers.

use std::sync::Arc;

use crate::backend::{BackendError, CommerceClient};
use crate::cart::CartStore;
use crate::catalog::{Catalog, CatalogCache};
use crate::checkout::CheckoutService;
use crate::config::StorefrontConfig;
use crate::ledger::OrderLedger;
use crate::persistence::{FileStore, KeyValueStore, MemoryStore};
use crate::pricing::PricingEngine;
use crate::wishlist::WishlistStore;

/// Application state shared across all handlers.
///
/// This is cheaply cloneable via `Arc` and contains all shared resources.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pricing: PricingEngine,
    cart: Arc<CartStore>,
    ledger: Arc<OrderLedger>,
    wishlist: WishlistStore,
    catalog: Catalog<CommerceClient>,
    checkout: CheckoutService<CommerceClient>,
}

impl AppState {
    /// Create a new application state with stores persisted under
    /// `config.data_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the commerce client cannot be built.
    pub fn new(config: StorefrontConfig) -> Result<Self, BackendError> {
        let dir = config.data_dir.clone();
        Self::assemble(
            config,
            FileStore::new(dir.join("cart.json")),
            FileStore::new(dir.join("orders.json")),
            FileStore::new(dir.join("wishlist.json")),
        )
    }

    /// Create a state whose stores live only in memory.
    ///
    /// # Errors
    ///
    /// Returns an error if the commerce client cannot be built.
    pub fn in_memory(config: StorefrontConfig) -> Result<Self, BackendError> {
        Self::assemble(
            config,
            MemoryStore::new(),
            MemoryStore::new(),
            MemoryStore::new(),
        )
    }

    fn assemble(
        config: StorefrontConfig,
        cart: impl KeyValueStore + 'static,
        orders: impl KeyValueStore + 'static,
        wishlist: impl KeyValueStore + 'static,
    ) -> Result<Self, BackendError> {
        let remote = config
            .commerce
            .as_ref()
            .map(CommerceClient::new)
            .transpose()?;
        if remote.is_none() {
            tracing::info!("No commerce backend configured, orders will be recorded locally");
        }

        let pricing = PricingEngine::new(config.pricing);
        let cart = Arc::new(CartStore::open(cart));
        let ledger = Arc::new(OrderLedger::open(orders, pricing));
        let wishlist = WishlistStore::open(wishlist);

        let catalog = Catalog::new(
            remote.clone(),
            CatalogCache::new(config.catalog.max_entries),
            config.catalog.ttls,
        );
        let checkout = CheckoutService::new(
            Arc::clone(&cart),
            Arc::clone(&ledger),
            pricing,
            config.minimum_order_amount,
            remote,
        );

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pricing,
                cart,
                ledger,
                wishlist,
                catalog,
                checkout,
            }),
        })
    }

    /// Get the application configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn pricing(&self) -> &PricingEngine {
        &self.inner.pricing
    }

    #[must_use]
    pub fn cart(&self) -> &CartStore {
        &self.inner.cart
    }

    /// Get the local order ledger.
    #[must_use]
    pub fn ledger(&self) -> &OrderLedger {
        &self.inner.ledger
    }

    #[must_use]
    pub fn wishlist(&self) -> &WishlistStore {
        &self.inner.wishlist
    }

    /// Get the cached catalog.
    #[must_use]
    pub fn catalog(&self) -> &Catalog<CommerceClient> {
        &self.inner.catalog
    }

    #[must_use]
    pub fn checkout(&self) -> &CheckoutService<CommerceClient> {
        &self.inner.checkout
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("cart", &self.inner.cart)
            .field("ledger", &self.inner.ledger)
            .field("remote", &self.inner.checkout.is_remote_configured())
            .finish_non_exhaustive()
    }
}
