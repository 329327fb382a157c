//! Cart engine, checkout and order history.
//!
//! # Concurrency
//!
//! Every mutation of a user's cart (add, update, remove, checkout) runs as a
//! read-modify-write under that user's [`CartLocks`] entry. The lock only
//! covers this process; across processes the `version` column does the
//! work: [`CartStore::save_cart`] refuses stale writes and the whole
//! mutation is replayed, up to [`MAX_WRITE_ATTEMPTS`] times.
//!
//! Reads (`get_cart`, `list_orders`) take no lock.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use moka::future::Cache;
use rust_decimal::Decimal;
use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, instrument};

use cornerstore_core::{
    CartStatus, LineItemError, LineItems, ProductId, Quantity, QuantityError, UserId,
    to_minor_units, with_cents,
};

use super::payments::{PaymentError, PaymentIntentStatus, PaymentProcessor};
use crate::db::{CartStore, ProductStore, RepositoryError, Stores};
use crate::models::cart::{CartOrder, CartView, Catalog, OrderView, index_catalog};

/// Attempts per mutation before a version conflict is surfaced.
pub const MAX_WRITE_ATTEMPTS: u32 = 3;

/// Errors from cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// Bad input (missing product id, non-positive quantity).
    #[error("{0}")]
    Validation(String),

    /// Unknown product, no open cart, or product not in the cart.
    #[error("{0}")]
    NotFound(String),

    /// Payment could not be created or verified.
    #[error(transparent)]
    Payment(#[from] PaymentError),

    /// Repository/database error, including exhausted write retries.
    #[error("storage error: {0}")]
    Storage(#[from] RepositoryError),
}

impl From<QuantityError> for CartError {
    fn from(err: QuantityError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<LineItemError> for CartError {
    fn from(err: LineItemError) -> Self {
        match err {
            LineItemError::NotInCart(_) => Self::NotFound("Product not found in cart".to_owned()),
            LineItemError::Quantity(e) => e.into(),
            LineItemError::TotalTooLarge => Self::Validation(err.to_string()),
        }
    }
}

impl CartError {
    fn cart_not_found() -> Self {
        Self::NotFound("Cart not found".to_owned())
    }

    const fn is_write_conflict(&self) -> bool {
        matches!(self, Self::Storage(RepositoryError::Conflict(_)))
    }
}

/// Per-user mutexes serializing cart mutations within this process.
///
/// Entries idle for ten minutes are evicted; a fresh mutex is created on the
/// next access.
#[derive(Clone)]
pub struct CartLocks {
    locks: Cache<UserId, Arc<Mutex<()>>>,
}

impl Default for CartLocks {
    fn default() -> Self {
        Self::new()
    }
}

impl CartLocks {
    #[must_use]
    pub fn new() -> Self {
        Self {
            locks: Cache::builder()
                .max_capacity(100_000)
                .time_to_idle(Duration::from_secs(600))
                .build(),
        }
    }

    async fn acquire(&self, user_id: UserId) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .get_with(user_id, async { Arc::new(Mutex::new(())) })
            .await;
        lock.lock_owned().await
    }
}

/// Cart service.
///
/// When built with [`CartService::verify_payments_with`], checkout only
/// succeeds against a settled payment intent matching the cart total.
pub struct CartService<'a> {
    products: &'a dyn ProductStore,
    carts: &'a dyn CartStore,
    locks: &'a CartLocks,
    payments: Option<&'a dyn PaymentProcessor>,
}

impl<'a> CartService<'a> {
    #[must_use]
    pub fn new(stores: &'a Stores, locks: &'a CartLocks) -> Self {
        Self {
            products: stores.products.as_ref(),
            carts: stores.carts.as_ref(),
            locks,
            payments: None,
        }
    }

    /// Require a verified payment at checkout.
    #[must_use]
    pub fn verify_payments_with(mut self, processor: &'a dyn PaymentProcessor) -> Self {
        self.payments = Some(processor);
        self
    }

    /// The user's open cart resolved against the catalog.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Storage` if a store fails.
    #[instrument(skip(self))]
    pub async fn get_cart(&self, user_id: UserId) -> Result<CartView, CartError> {
        let Some(cart) = self.carts.find_open_cart(user_id).await? else {
            return Ok(CartView::empty());
        };
        let catalog = self.catalog_for(&cart.items).await?;
        Ok(CartView::project(&cart.items, &catalog)?)
    }

    /// Add `quantity` units of a product, creating the cart if needed.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Validation` for an invalid product id or
    /// quantity and `CartError::NotFound` if the product does not exist.
    #[instrument(skip(self))]
    pub async fn add_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<CartOrder, CartError> {
        if !product_id.is_assigned() {
            return Err(CartError::Validation("Invalid product id".to_owned()));
        }
        let quantity = Quantity::new(quantity)?;

        let _guard = self.locks.acquire(user_id).await;
        self.with_retries(|| self.add_once(user_id, product_id, quantity))
            .await
    }

    /// Replace the quantity of a line item.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Validation` for a non-positive quantity and
    /// `CartError::NotFound` if there is no cart or the product is not in it.
    #[instrument(skip(self))]
    pub async fn update_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<CartOrder, CartError> {
        let quantity = Quantity::new(quantity)?;

        let _guard = self.locks.acquire(user_id).await;
        self.with_retries(|| {
            self.mutate_existing(user_id, move |items| {
                items.set_quantity(product_id, quantity)
            })
        })
        .await
    }

    /// Remove a line item. The cart itself stays, possibly empty.
    ///
    /// # Errors
    ///
    /// Returns `CartError::NotFound` if there is no cart or the product is
    /// not in it.
    #[instrument(skip(self))]
    pub async fn remove_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<CartOrder, CartError> {
        let _guard = self.locks.acquire(user_id).await;
        self.with_retries(|| {
            self.mutate_existing(user_id, move |items| items.remove(product_id).map(drop))
        })
        .await
    }

    /// Seal the open cart as a paid order.
    ///
    /// Unit prices are captured and the total recomputed from them, so the
    /// order keeps what was charged even if the catalog later changes.
    ///
    /// # Errors
    ///
    /// Returns `CartError::NotFound` if there is no open cart and
    /// `CartError::Payment` if verification is enabled and the payment is
    /// missing, unsettled or for a different amount.
    #[instrument(skip(self))]
    pub async fn checkout(
        &self,
        user_id: UserId,
        payment_intent_id: Option<&str>,
    ) -> Result<CartOrder, CartError> {
        let _guard = self.locks.acquire(user_id).await;
        let order = self
            .with_retries(|| self.checkout_once(user_id, payment_intent_id))
            .await?;

        info!(order_id = %order.id, total = %order.total, "order placed");
        Ok(order)
    }

    /// Paid orders, newest first, resolved against the current catalog.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Storage` if a store fails.
    #[instrument(skip(self))]
    pub async fn list_orders(&self, user_id: UserId) -> Result<Vec<OrderView>, CartError> {
        let orders = self.carts.list_orders(user_id).await?;

        let mut ids: Vec<ProductId> = orders.iter().flat_map(|o| o.items.product_ids()).collect();
        ids.sort_unstable();
        ids.dedup();
        let catalog = index_catalog(self.products.get_products(&ids).await?);

        Ok(orders
            .iter()
            .map(|order| OrderView::project(order, &catalog))
            .collect())
    }

    async fn with_retries<T, F, Fut>(&self, mut op: F) -> Result<T, CartError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, CartError>>,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Err(err) if err.is_write_conflict() && attempt < MAX_WRITE_ATTEMPTS => {
                    debug!(attempt, error = %err, "cart write conflict, retrying");
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    async fn add_once(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<CartOrder, CartError> {
        if self.products.get_product(product_id).await?.is_none() {
            return Err(CartError::NotFound("Product not found".to_owned()));
        }

        match self.carts.find_open_cart(user_id).await? {
            Some(mut cart) => {
                cart.items.add(product_id, quantity)?;
                cart.total = self.total_of(&cart.items).await?;
                Ok(self.carts.save_cart(&cart).await?)
            }
            None => {
                let mut items = LineItems::new();
                items.add(product_id, quantity)?;
                let total = self.total_of(&items).await?;
                // Losing a creation race yields `Conflict`; the retry then
                // finds the winner's cart.
                Ok(self.carts.create_cart(user_id, &items, total).await?)
            }
        }
    }

    async fn mutate_existing<F>(&self, user_id: UserId, change: F) -> Result<CartOrder, CartError>
    where
        F: FnOnce(&mut LineItems) -> Result<(), LineItemError>,
    {
        let mut cart = self
            .carts
            .find_open_cart(user_id)
            .await?
            .ok_or_else(CartError::cart_not_found)?;

        change(&mut cart.items)?;
        cart.total = self.total_of(&cart.items).await?;
        Ok(self.carts.save_cart(&cart).await?)
    }

    async fn checkout_once(
        &self,
        user_id: UserId,
        payment_intent_id: Option<&str>,
    ) -> Result<CartOrder, CartError> {
        let mut cart = self
            .carts
            .find_open_cart(user_id)
            .await?
            .ok_or_else(CartError::cart_not_found)?;

        let catalog = self.catalog_for(&cart.items).await?;
        let price_of = |id: ProductId| catalog.get(&id).map(|p| p.price);
        cart.items.freeze_prices(price_of);
        cart.total = with_cents(cart.items.total(price_of)?);

        if let Some(processor) = self.payments {
            verify_payment(processor, payment_intent_id, cart.total).await?;
        }

        debug_assert!(cart.status.can_transition_to(CartStatus::Paid));
        cart.status = CartStatus::Paid;
        cart.paid_at = Some(Utc::now());
        cart.payment_reference = payment_intent_id.map(str::to_owned);

        Ok(self.carts.save_cart(&cart).await?)
    }

    async fn catalog_for(&self, items: &LineItems) -> Result<Catalog, CartError> {
        Ok(index_catalog(
            self.products.get_products(&items.product_ids()).await?,
        ))
    }

    async fn total_of(&self, items: &LineItems) -> Result<Decimal, CartError> {
        let catalog = self.catalog_for(items).await?;
        Ok(with_cents(
            items.total(|id| catalog.get(&id).map(|p| p.price))?,
        ))
    }
}

/// Start a payment for `amount` minor units.
///
/// # Errors
///
/// Returns `PaymentError::InvalidAmount` for non-positive amounts and the
/// processor's error otherwise.
#[instrument(skip(processor))]
pub async fn initiate_payment(
    processor: &dyn PaymentProcessor,
    amount: i64,
) -> Result<String, CartError> {
    if amount <= 0 {
        return Err(PaymentError::InvalidAmount.into());
    }

    let intent = processor.create_payment_intent(amount).await?;
    intent
        .client_secret
        .ok_or_else(|| PaymentError::Parse("payment intent has no client secret".to_owned()).into())
}

async fn verify_payment(
    processor: &dyn PaymentProcessor,
    payment_intent_id: Option<&str>,
    total: Decimal,
) -> Result<(), PaymentError> {
    let id = payment_intent_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| PaymentError::Unverified("payment intent id is required".to_owned()))?;

    let intent = processor
        .retrieve_payment_intent(id)
        .await
        .map_err(|e| match e {
            // An id the processor doesn't know is the client's problem.
            PaymentError::Rejected {
                status: 404,
                message,
            } => PaymentError::Unverified(message),
            other => other,
        })?;

    if intent.status != PaymentIntentStatus::Succeeded {
        return Err(PaymentError::Unverified(format!(
            "payment intent status is {:?}",
            intent.status
        )));
    }

    let expected = to_minor_units(total).ok_or(PaymentError::InvalidAmount)?;
    if intent.amount != expected || !intent.currency.eq_ignore_ascii_case(processor.currency()) {
        return Err(PaymentError::Unverified(format!(
            "payment of {} {} does not match cart total of {expected}",
            intent.amount, intent.currency
        )));
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::db::MemoryStore;
    use crate::models::product::{NewProduct, ProductUpdate};
    use crate::services::payments::PaymentIntent;

    struct Fixture {
        store: Arc<MemoryStore>,
        stores: Stores,
        locks: CartLocks,
    }

    impl Fixture {
        fn new() -> Self {
            let store = Arc::new(MemoryStore::new());
            Self {
                stores: Stores::memory(&store),
                store,
                locks: CartLocks::new(),
            }
        }

        fn service(&self) -> CartService<'_> {
            CartService::new(&self.stores, &self.locks)
        }

        async fn product(&self, price: &str) -> ProductId {
            self.store
                .create_product(&NewProduct {
                    name: "Cart Product".to_owned(),
                    description: None,
                    price: cornerstore_core::Price::new(Decimal::from_str(price).unwrap())
                        .unwrap(),
                    image_url: None,
                })
                .await
                .unwrap()
                .id
        }
    }

    struct FakeProcessor {
        intent: PaymentIntent,
        /// Status returned by every retrieval while the processor is down.
        outage: Option<u16>,
    }

    impl FakeProcessor {
        fn settled(amount: i64) -> Self {
            Self {
                intent: PaymentIntent {
                    id: "pi_test".to_owned(),
                    client_secret: Some("pi_test_secret".to_owned()),
                    amount,
                    currency: "usd".to_owned(),
                    status: PaymentIntentStatus::Succeeded,
                },
                outage: None,
            }
        }
    }

    #[async_trait]
    impl PaymentProcessor for FakeProcessor {
        fn currency(&self) -> &str {
            "usd"
        }

        async fn create_payment_intent(&self, amount: i64) -> Result<PaymentIntent, PaymentError> {
            Ok(PaymentIntent {
                amount,
                ..self.intent.clone()
            })
        }

        async fn retrieve_payment_intent(&self, id: &str) -> Result<PaymentIntent, PaymentError> {
            if let Some(status) = self.outage {
                return Err(PaymentError::Rejected {
                    status,
                    message: "processor unavailable".to_owned(),
                });
            }
            if id == self.intent.id {
                Ok(self.intent.clone())
            } else {
                Err(PaymentError::Rejected {
                    status: 404,
                    message: "No such payment_intent".to_owned(),
                })
            }
        }
    }

    /// Delegates to a real store but fails the first `failures` saves.
    struct FlakyCarts {
        inner: Arc<MemoryStore>,
        failures: AtomicU32,
    }

    #[async_trait]
    impl CartStore for FlakyCarts {
        async fn find_open_cart(
            &self,
            user_id: UserId,
        ) -> Result<Option<CartOrder>, RepositoryError> {
            self.inner.find_open_cart(user_id).await
        }

        async fn create_cart(
            &self,
            user_id: UserId,
            items: &LineItems,
            total: Decimal,
        ) -> Result<CartOrder, RepositoryError> {
            self.inner.create_cart(user_id, items, total).await
        }

        async fn save_cart(&self, cart: &CartOrder) -> Result<CartOrder, RepositoryError> {
            let remaining = self.failures.load(Ordering::SeqCst);
            if remaining > 0 {
                self.failures.store(remaining - 1, Ordering::SeqCst);
                return Err(RepositoryError::Conflict("injected".to_owned()));
            }
            self.inner.save_cart(cart).await
        }

        async fn list_orders(&self, user_id: UserId) -> Result<Vec<CartOrder>, RepositoryError> {
            self.inner.list_orders(user_id).await
        }
    }

    const USER: UserId = UserId::new(1);

    #[tokio::test]
    async fn test_get_cart_without_cart_is_empty() {
        let fx = Fixture::new();
        let view = fx.service().get_cart(USER).await.unwrap();
        assert!(view.products.is_empty());
        assert_eq!(view.total.to_string(), "0.00");
    }

    #[tokio::test]
    async fn test_add_then_get() {
        let fx = Fixture::new();
        let a = fx.product("10.99").await;

        fx.service().add_item(USER, a, 2).await.unwrap();
        let view = fx.service().get_cart(USER).await.unwrap();

        assert_eq!(view.products.len(), 1);
        assert_eq!(view.products[0].id, a);
        assert_eq!(view.products[0].quantity, 2);
        assert_eq!(view.total.to_string(), "21.98");
    }

    #[tokio::test]
    async fn test_add_accumulates_and_update_replaces() {
        let fx = Fixture::new();
        let a = fx.product("4.25").await;
        let service = fx.service();

        service.add_item(USER, a, 2).await.unwrap();
        let cart = service.add_item(USER, a, 3).await.unwrap();
        assert_eq!(cart.items.get(a).unwrap().quantity.get(), 5);

        let cart = service.update_item(USER, a, 3).await.unwrap();
        assert_eq!(cart.items.get(a).unwrap().quantity.get(), 3);
        assert_eq!(cart.total.to_string(), "12.75");
    }

    #[tokio::test]
    async fn test_remove_only_item_leaves_empty_cart() {
        let fx = Fixture::new();
        let a = fx.product("10.99").await;
        let service = fx.service();

        service.add_item(USER, a, 2).await.unwrap();
        let cart = service.remove_item(USER, a).await.unwrap();
        assert!(cart.items.is_empty());
        assert_eq!(cart.total, Decimal::ZERO);

        // The record survives.
        assert!(fx.store.find_open_cart(USER).await.unwrap().is_some());
        let view = service.get_cart(USER).await.unwrap();
        assert!(view.products.is_empty());
        assert_eq!(view.total.to_string(), "0.00");
    }

    #[tokio::test]
    async fn test_invalid_quantities_leave_cart_unchanged() {
        let fx = Fixture::new();
        let a = fx.product("1.00").await;
        let service = fx.service();
        let before = service.add_item(USER, a, 1).await.unwrap();

        for qty in [0, -1] {
            assert!(matches!(
                service.add_item(USER, a, qty).await,
                Err(CartError::Validation(_))
            ));
            assert!(matches!(
                service.update_item(USER, a, qty).await,
                Err(CartError::Validation(_))
            ));
        }
        assert!(matches!(
            service.add_item(USER, ProductId::new(0), 1).await,
            Err(CartError::Validation(_))
        ));

        let after = fx.store.find_open_cart(USER).await.unwrap().unwrap();
        assert_eq!(after, before);
    }

    #[tokio::test]
    async fn test_not_found_cases() {
        let fx = Fixture::new();
        let a = fx.product("1.00").await;
        let b = fx.product("2.00").await;
        let service = fx.service();

        // No cart yet.
        assert!(matches!(
            service.update_item(USER, a, 1).await,
            Err(CartError::NotFound(_))
        ));
        assert!(matches!(
            service.remove_item(USER, a).await,
            Err(CartError::NotFound(_))
        ));
        assert!(matches!(
            service.checkout(USER, None).await,
            Err(CartError::NotFound(_))
        ));
        // Unknown product.
        assert!(matches!(
            service.add_item(USER, ProductId::new(999), 1).await,
            Err(CartError::NotFound(_))
        ));
        assert!(fx.store.find_open_cart(USER).await.unwrap().is_none());

        // Product not in the cart.
        let before = service.add_item(USER, a, 1).await.unwrap();
        assert!(matches!(
            service.update_item(USER, b, 1).await,
            Err(CartError::NotFound(_))
        ));
        assert!(matches!(
            service.remove_item(USER, b).await,
            Err(CartError::NotFound(_))
        ));
        assert_eq!(fx.store.find_open_cart(USER).await.unwrap().unwrap(), before);
    }

    #[tokio::test]
    async fn test_deleted_product_is_hidden_and_excluded_from_total() {
        let fx = Fixture::new();
        let a = fx.product("3.00").await;
        let b = fx.product("5.00").await;
        let service = fx.service();
        service.add_item(USER, a, 1).await.unwrap();
        service.add_item(USER, b, 2).await.unwrap();

        fx.store.delete_product(b).await.unwrap();
        let view = service.get_cart(USER).await.unwrap();
        assert_eq!(view.products.len(), 1);
        assert_eq!(view.total.to_string(), "3.00");

        // Still stored until explicitly removed.
        let stored = fx.store.find_open_cart(USER).await.unwrap().unwrap();
        assert_eq!(stored.items.len(), 2);
        service.remove_item(USER, b).await.unwrap();
    }

    #[tokio::test]
    async fn test_get_cart_does_not_persist() {
        let fx = Fixture::new();
        let a = fx.product("2.00").await;
        let service = fx.service();
        let saved = service.add_item(USER, a, 1).await.unwrap();

        fx.store
            .update_product(
                a,
                &ProductUpdate {
                    price: Some(cornerstore_core::Price::new(Decimal::from(7)).unwrap()),
                    ..ProductUpdate::default()
                },
            )
            .await
            .unwrap();

        let view = service.get_cart(USER).await.unwrap();
        assert_eq!(view.total.to_string(), "7.00");
        let stored = fx.store.find_open_cart(USER).await.unwrap().unwrap();
        assert_eq!(stored.version, saved.version);
        assert_eq!(stored.total, saved.total);
    }

    #[tokio::test]
    async fn test_lenient_checkout_freezes_order() {
        let fx = Fixture::new();
        let a = fx.product("10.00").await;
        let b = fx.product("1.50").await;
        let service = fx.service();
        service.add_item(USER, a, 2).await.unwrap();
        service.add_item(USER, b, 1).await.unwrap();

        let order = service.checkout(USER, None).await.unwrap();
        assert_eq!(order.status, CartStatus::Paid);
        assert_eq!(order.total.to_string(), "21.50");
        assert!(order.paid_at.is_some());
        assert!(service.get_cart(USER).await.unwrap().products.is_empty());

        // Reprice one product and delete the other.
        fx.store
            .update_product(
                a,
                &ProductUpdate {
                    price: Some(cornerstore_core::Price::new(Decimal::from(99)).unwrap()),
                    ..ProductUpdate::default()
                },
            )
            .await
            .unwrap();
        fx.store.delete_product(b).await.unwrap();

        let orders = service.list_orders(USER).await.unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].total.to_string(), "21.50");
        assert_eq!(orders[0].products.len(), 1);
        assert_eq!(orders[0].products[0].price.to_string(), "10.00");

        // A new add starts a fresh cart.
        let next = service.add_item(USER, a, 1).await.unwrap();
        assert_ne!(next.id, order.id);
    }

    #[tokio::test]
    async fn test_orders_newest_first() {
        let fx = Fixture::new();
        let a = fx.product("1.00").await;
        let service = fx.service();

        service.add_item(USER, a, 1).await.unwrap();
        let first = service.checkout(USER, None).await.unwrap();
        service.add_item(USER, a, 2).await.unwrap();
        let second = service.checkout(USER, None).await.unwrap();

        let ids: Vec<_> = service
            .list_orders(USER)
            .await
            .unwrap()
            .into_iter()
            .map(|o| o.id)
            .collect();
        assert_eq!(ids, vec![second.id, first.id]);
        assert!(service.list_orders(UserId::new(2)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_verified_checkout_requires_matching_payment() {
        let fx = Fixture::new();
        let a = fx.product("10.99").await;
        fx.service().add_item(USER, a, 2).await.unwrap();

        let wrong_amount = FakeProcessor::settled(100);
        let service = fx.service().verify_payments_with(&wrong_amount);
        for intent in [None, Some("pi_test"), Some("pi_unknown")] {
            assert!(matches!(
                service.checkout(USER, intent).await,
                Err(CartError::Payment(PaymentError::Unverified(_)))
            ));
        }
        assert!(fx.store.find_open_cart(USER).await.unwrap().is_some());

        let mut pending = FakeProcessor::settled(2198);
        pending.intent.status = PaymentIntentStatus::Processing;
        let service = fx.service().verify_payments_with(&pending);
        assert!(matches!(
            service.checkout(USER, Some("pi_test")).await,
            Err(CartError::Payment(PaymentError::Unverified(_)))
        ));

        let settled = FakeProcessor::settled(2198);
        let service = fx.service().verify_payments_with(&settled);
        let order = service.checkout(USER, Some("pi_test")).await.unwrap();
        assert_eq!(order.payment_reference.as_deref(), Some("pi_test"));
        assert!(fx.store.find_open_cart(USER).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_processor_failures_are_not_reported_as_unverified() {
        let fx = Fixture::new();
        let a = fx.product("10.99").await;
        fx.service().add_item(USER, a, 2).await.unwrap();

        for status in [401, 429, 500, 503] {
            let mut down = FakeProcessor::settled(2198);
            down.outage = Some(status);
            let service = fx.service().verify_payments_with(&down);

            let err = service.checkout(USER, Some("pi_test")).await.unwrap_err();
            assert!(
                matches!(
                    err,
                    CartError::Payment(PaymentError::Rejected { status: s, .. }) if s == status
                ),
                "{status}: {err:?}"
            );
            let (code, _) = crate::error::AppError::from(err).status_and_message();
            assert_eq!(code, axum::http::StatusCode::BAD_GATEWAY);
        }
        assert!(fx.store.find_open_cart(USER).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_total_beyond_order_range_is_rejected() {
        let fx = Fixture::new();
        let a = fx.product("9999999999.99").await;
        let service = fx.service();
        let before = service.add_item(USER, a, 1).await.unwrap();
        assert_eq!(before.total.to_string(), "9999999999.99");

        for result in [
            service.add_item(USER, a, 1_000).await,
            service.update_item(USER, a, 2_000_000_000).await,
        ] {
            assert!(matches!(result, Err(CartError::Validation(_))));
        }
        assert_eq!(fx.store.find_open_cart(USER).await.unwrap().unwrap(), before);
        assert!(matches!(
            fx.service().add_item(UserId::new(2), a, 1_000).await,
            Err(CartError::Validation(_))
        ));
        assert!(fx.store.find_open_cart(UserId::new(2)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_initiate_payment() {
        let processor = FakeProcessor::settled(0);
        assert_eq!(
            initiate_payment(&processor, 2198).await.unwrap(),
            "pi_test_secret"
        );
        assert!(matches!(
            initiate_payment(&processor, 0).await,
            Err(CartError::Payment(PaymentError::InvalidAmount))
        ));
    }

    #[tokio::test]
    async fn test_write_conflicts_are_retried_then_surfaced() {
        let store = Arc::new(MemoryStore::new());
        let flaky = Arc::new(FlakyCarts {
            inner: store.clone(),
            failures: AtomicU32::new(MAX_WRITE_ATTEMPTS - 1),
        });
        let stores = Stores {
            carts: flaky.clone(),
            ..Stores::memory(&store)
        };
        let locks = CartLocks::new();
        let service = CartService::new(&stores, &locks);

        let a = store
            .create_product(&NewProduct {
                name: "A".to_owned(),
                description: None,
                price: cornerstore_core::Price::new(Decimal::ONE).unwrap(),
                image_url: None,
            })
            .await
            .unwrap()
            .id;
        service.add_item(USER, a, 1).await.unwrap();

        // Recovers within the budget.
        let cart = service.add_item(USER, a, 1).await.unwrap();
        assert_eq!(cart.items.get(a).unwrap().quantity.get(), 2);

        // Exhausts it.
        flaky.failures.store(MAX_WRITE_ATTEMPTS, Ordering::SeqCst);
        assert!(matches!(
            service.add_item(USER, a, 1).await,
            Err(CartError::Storage(RepositoryError::Conflict(_)))
        ));
        let stored = store.find_open_cart(USER).await.unwrap().unwrap();
        assert_eq!(stored.items.get(a).unwrap().quantity.get(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_adds_lose_nothing() {
        let fx = Arc::new(Fixture::new());
        let a = fx.product("1.00").await;

        let tasks: Vec<_> = (0..25)
            .map(|_| {
                let fx = fx.clone();
                tokio::spawn(async move { fx.service().add_item(USER, a, 1).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let cart = fx.store.find_open_cart(USER).await.unwrap().unwrap();
        assert_eq!(cart.items.get(a).unwrap().quantity.get(), 25);
        assert_eq!(cart.total.to_string(), "25.00");
    }
}
