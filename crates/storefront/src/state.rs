//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Instant;

use sqlx::PgPool;

use crate::config::StorefrontConfig;
use crate::db::Stores;
use crate::services::auth::TokenService;
use crate::services::cart::{CartLocks, CartService};
use crate::services::payments::{PaymentError, PaymentProcessor, StripeClient};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the stores, the payment processor and
/// configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    stores: Stores,
    pool: Option<PgPool>,
    payments: Arc<dyn PaymentProcessor>,
    tokens: TokenService,
    cart_locks: CartLocks,
    started_at: Instant,
}

impl AppState {
    /// Create the production state: `PostgreSQL` stores and the Stripe client.
    ///
    /// # Errors
    ///
    /// Returns an error if the payment client cannot be built.
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Result<Self, PaymentError> {
        let stores = Stores::postgres(&pool);
        let payments = Arc::new(StripeClient::new(config.payments.clone())?);
        Ok(Self::build(config, stores, Some(pool), payments))
    }

    /// Assemble state from arbitrary stores and payment processor.
    #[must_use]
    pub fn from_parts(
        config: StorefrontConfig,
        stores: Stores,
        payments: Arc<dyn PaymentProcessor>,
    ) -> Self {
        Self::build(config, stores, None, payments)
    }

    fn build(
        config: StorefrontConfig,
        stores: Stores,
        pool: Option<PgPool>,
        payments: Arc<dyn PaymentProcessor>,
    ) -> Self {
        let tokens = TokenService::new(&config.auth);
        Self {
            inner: Arc::new(AppStateInner {
                config,
                stores,
                pool,
                payments,
                tokens,
                cart_locks: CartLocks::new(),
                started_at: Instant::now(),
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the stores.
    #[must_use]
    pub fn stores(&self) -> &Stores {
        &self.inner.stores
    }

    /// The database pool, when running against `PostgreSQL`.
    #[must_use]
    pub fn pool(&self) -> Option<&PgPool> {
        self.inner.pool.as_ref()
    }

    /// Get a reference to the payment processor.
    #[must_use]
    pub fn payments(&self) -> &dyn PaymentProcessor {
        self.inner.payments.as_ref()
    }

    /// Get a reference to the token service.
    #[must_use]
    pub fn tokens(&self) -> &TokenService {
        &self.inner.tokens
    }

    /// Seconds since the state was created.
    #[must_use]
    pub fn uptime_secs(&self) -> u64 {
        self.inner.started_at.elapsed().as_secs()
    }

    /// A cart service honoring the payment verification setting.
    #[must_use]
    pub fn cart_service(&self) -> CartService<'_> {
        let service = CartService::new(&self.inner.stores, &self.inner.cart_locks);
        if self.inner.config.require_verified_payment {
            service.verify_payments_with(self.payments())
        } else {
            service
        }
    }
}
