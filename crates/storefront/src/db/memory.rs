//! In-process implementation of every store.
//!
//! Enforces the same constraints as the `PostgreSQL` schema: unique emails,
//! one open cart per user, version-checked cart writes and immutable paid
//! records.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;

use cornerstore_core::{CartOrderId, CartStatus, Email, LineItems, ProductId, UserId};

use super::{CartStore, ProductStore, RepositoryError, UserStore};
use crate::models::cart::CartOrder;
use crate::models::product::{NewProduct, Product, ProductUpdate};
use crate::models::user::User;

#[derive(Default)]
struct Tables {
    users: BTreeMap<UserId, (User, String)>,
    products: BTreeMap<ProductId, Product>,
    carts: BTreeMap<CartOrderId, CartOrder>,
    next_user: i32,
    next_product: i32,
    next_cart: i32,
}

fn next_id(counter: &mut i32) -> i32 {
    *counter += 1;
    *counter
}

/// Memory-backed [`UserStore`], [`ProductStore`] and [`CartStore`].
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(
        &self,
        name: &str,
        email: &Email,
        password_hash: &str,
    ) -> Result<User, RepositoryError> {
        let mut tables = self.lock();
        if tables.users.values().any(|(u, _)| &u.email == email) {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }

        let user = User {
            id: UserId::new(next_id(&mut tables.next_user)),
            name: name.to_owned(),
            email: email.clone(),
            created_at: Utc::now(),
        };
        tables
            .users
            .insert(user.id, (user.clone(), password_hash.to_owned()));
        Ok(user)
    }

    async fn get_with_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        Ok(self
            .lock()
            .users
            .values()
            .find(|(u, _)| &u.email == email)
            .cloned())
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.lock().users.get(&id).map(|(u, _)| u.clone()))
    }
}

#[async_trait]
impl ProductStore for MemoryStore {
    async fn list_products(&self) -> Result<Vec<Product>, RepositoryError> {
        Ok(self.lock().products.values().cloned().collect())
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(self.lock().products.get(&id).cloned())
    }

    async fn get_products(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        let tables = self.lock();
        Ok(ids
            .iter()
            .filter_map(|id| tables.products.get(id).cloned())
            .collect())
    }

    async fn create_product(&self, product: &NewProduct) -> Result<Product, RepositoryError> {
        let mut tables = self.lock();
        let now = Utc::now();
        let created = Product {
            id: ProductId::new(next_id(&mut tables.next_product)),
            name: product.name.clone(),
            description: product.description.clone(),
            price: product.price,
            image_url: product.image_url.clone(),
            created_at: now,
            updated_at: now,
        };
        tables.products.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_product(
        &self,
        id: ProductId,
        update: &ProductUpdate,
    ) -> Result<Option<Product>, RepositoryError> {
        let mut tables = self.lock();
        let Some(product) = tables.products.get_mut(&id) else {
            return Ok(None);
        };
        update.apply(product);
        product.updated_at = Utc::now();
        Ok(Some(product.clone()))
    }

    async fn delete_product(&self, id: ProductId) -> Result<bool, RepositoryError> {
        Ok(self.lock().products.remove(&id).is_some())
    }
}

#[async_trait]
impl CartStore for MemoryStore {
    async fn find_open_cart(&self, user_id: UserId) -> Result<Option<CartOrder>, RepositoryError> {
        Ok(self
            .lock()
            .carts
            .values()
            .find(|c| c.user_id == user_id && c.status == CartStatus::Cart)
            .cloned())
    }

    async fn create_cart(
        &self,
        user_id: UserId,
        items: &LineItems,
        total: Decimal,
    ) -> Result<CartOrder, RepositoryError> {
        let mut tables = self.lock();
        if tables
            .carts
            .values()
            .any(|c| c.user_id == user_id && c.status == CartStatus::Cart)
        {
            return Err(RepositoryError::Conflict(
                "user already has an open cart".to_owned(),
            ));
        }

        let now = Utc::now();
        let cart = CartOrder {
            id: CartOrderId::new(next_id(&mut tables.next_cart)),
            user_id,
            status: CartStatus::Cart,
            items: items.clone(),
            total,
            version: 1,
            payment_reference: None,
            created_at: now,
            updated_at: now,
            paid_at: None,
        };
        tables.carts.insert(cart.id, cart.clone());
        Ok(cart)
    }

    async fn save_cart(&self, cart: &CartOrder) -> Result<CartOrder, RepositoryError> {
        let mut tables = self.lock();
        let stored = tables.carts.get_mut(&cart.id).ok_or(RepositoryError::NotFound)?;

        if stored.version != cart.version || !stored.status.is_mutable() {
            return Err(RepositoryError::Conflict(format!(
                "cart {} changed concurrently",
                cart.id
            )));
        }

        stored.status = cart.status;
        stored.items = cart.items.clone();
        stored.total = cart.total;
        stored.payment_reference.clone_from(&cart.payment_reference);
        stored.paid_at = cart.paid_at;
        stored.version += 1;
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }

    async fn list_orders(&self, user_id: UserId) -> Result<Vec<CartOrder>, RepositoryError> {
        let mut orders: Vec<CartOrder> = self
            .lock()
            .carts
            .values()
            .filter(|c| c.user_id == user_id && c.status == CartStatus::Paid)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.paid_at.cmp(&a.paid_at).then(b.id.cmp(&a.id)));
        Ok(orders)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use cornerstore_core::{Price, Quantity};

    use super::*;

    fn email(s: &str) -> Email {
        Email::parse(s).unwrap()
    }

    fn one_item() -> LineItems {
        let mut items = LineItems::new();
        items
            .add(ProductId::new(1), Quantity::new(1).unwrap())
            .unwrap();
        items
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let store = MemoryStore::new();
        store
            .create_user("Ann", &email("ann@example.com"), "hash")
            .await
            .unwrap();

        let err = store
            .create_user("Ann again", &email("ANN@example.com"), "hash")
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_only_one_open_cart_per_user() {
        let store = MemoryStore::new();
        let user = UserId::new(1);
        store
            .create_cart(user, &LineItems::new(), Decimal::ZERO)
            .await
            .unwrap();

        let err = store
            .create_cart(user, &LineItems::new(), Decimal::ZERO)
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));

        // Other users are unaffected.
        store
            .create_cart(UserId::new(2), &LineItems::new(), Decimal::ZERO)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_stale_version_is_rejected() {
        let store = MemoryStore::new();
        let cart = store
            .create_cart(UserId::new(1), &LineItems::new(), Decimal::ZERO)
            .await
            .unwrap();

        let mut first = cart.clone();
        first.items = one_item();
        let saved = store.save_cart(&first).await.unwrap();
        assert_eq!(saved.version, cart.version + 1);

        let err = store.save_cart(&cart).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_paid_record_is_immutable() {
        let store = MemoryStore::new();
        let user = UserId::new(1);
        let mut cart = store
            .create_cart(user, &one_item(), Decimal::ONE)
            .await
            .unwrap();

        cart.status = CartStatus::Paid;
        cart.paid_at = Some(Utc::now());
        let paid = store.save_cart(&cart).await.unwrap();

        let mut tampered = paid.clone();
        tampered.total = Decimal::ZERO;
        assert!(store.save_cart(&tampered).await.is_err());

        assert!(store.find_open_cart(user).await.unwrap().is_none());
        let orders = store.list_orders(user).await.unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].total, Decimal::ONE);
    }

    #[tokio::test]
    async fn test_product_update_and_delete() {
        let store = MemoryStore::new();
        let product = store
            .create_product(&NewProduct {
                name: "Mug".to_owned(),
                description: Some("Ceramic".to_owned()),
                price: Price::new(Decimal::new(899, 2)).unwrap(),
                image_url: None,
            })
            .await
            .unwrap();

        let updated = store
            .update_product(
                product.id,
                &ProductUpdate {
                    description: Some(None),
                    ..ProductUpdate::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.name, "Mug");
        assert_eq!(updated.description, None);

        assert!(store.delete_product(product.id).await.unwrap());
        assert!(!store.delete_product(product.id).await.unwrap());
        assert!(
            store
                .get_products(&[product.id])
                .await
                .unwrap()
                .is_empty()
        );
    }
}
