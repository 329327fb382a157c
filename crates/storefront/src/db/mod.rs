//! Database operations for the storefront.
//!
//! # Database: `cornerstore`
//!
//! ## Tables
//!
//! - `users` - Registered shoppers and their Argon2 password hashes
//! - `products` - The catalog
//! - `cart_orders` - Carts (`status = 'cart'`) and finalized orders (`status = 'paid'`),
//!   line items stored as JSONB
//!
//! Line items reference products by id only. There is deliberately no foreign
//! key: a product may be deleted while carts and orders still mention it.
//!
//! # Stores
//!
//! Handlers and services talk to the [`UserStore`], [`ProductStore`] and
//! [`CartStore`] traits. [`PgUserRepository`], [`ProductRepository`] and
//! [`CartRepository`] implement them over `PostgreSQL`; [`MemoryStore`]
//! implements all three in process for tests and local experiments.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p cornerstore-cli -- migrate
//! ```

pub mod carts;
pub mod memory;
pub mod products;
pub mod users;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use cornerstore_core::{Email, LineItems, ProductId, UserId};

use crate::models::cart::CartOrder;
use crate::models::product::{NewProduct, Product, ProductUpdate};
use crate::models::user::User;

pub use carts::CartRepository;
pub use memory::MemoryStore;
pub use products::ProductRepository;
pub use users::PgUserRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (unique email, second open cart, stale version).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Map a unique-violation into `RepositoryError::Conflict`.
pub(crate) fn conflict_on_unique(err: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = err
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(what.to_owned());
    }
    RepositoryError::Database(err)
}

/// Registered users.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a user. Fails with `Conflict` if the email is taken.
    async fn create_user(
        &self,
        name: &str,
        email: &Email,
        password_hash: &str,
    ) -> Result<User, RepositoryError>;

    /// Look up a user together with their password hash.
    async fn get_with_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError>;

    /// Look up a user by id.
    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepositoryError>;
}

/// The product catalog.
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// All products, oldest first.
    async fn list_products(&self) -> Result<Vec<Product>, RepositoryError>;

    /// A single product.
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;

    /// Every product among `ids` that still exists, in no particular order.
    async fn get_products(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError>;

    /// Insert a product.
    async fn create_product(&self, product: &NewProduct) -> Result<Product, RepositoryError>;

    /// Apply a partial update. `None` if the product does not exist.
    async fn update_product(
        &self,
        id: ProductId,
        update: &ProductUpdate,
    ) -> Result<Option<Product>, RepositoryError>;

    /// Delete a product. Returns whether a row was removed.
    async fn delete_product(&self, id: ProductId) -> Result<bool, RepositoryError>;
}

/// Carts and orders.
///
/// Writes are optimistic: [`CartStore::save_cart`] only succeeds if the
/// stored version still equals `cart.version` and the record is still an
/// open cart. Paid records are never rewritten.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// The user's open cart, if any.
    async fn find_open_cart(&self, user_id: UserId) -> Result<Option<CartOrder>, RepositoryError>;

    /// Create the user's open cart. Fails with `Conflict` if one already exists.
    async fn create_cart(
        &self,
        user_id: UserId,
        items: &LineItems,
        total: Decimal,
    ) -> Result<CartOrder, RepositoryError>;

    /// Persist items, total, status and payment fields of an open cart.
    ///
    /// Returns the stored record with its bumped version. Fails with
    /// `Conflict` if the version is stale or the record is no longer open.
    async fn save_cart(&self, cart: &CartOrder) -> Result<CartOrder, RepositoryError>;

    /// The user's paid orders, newest first.
    async fn list_orders(&self, user_id: UserId) -> Result<Vec<CartOrder>, RepositoryError>;
}

/// Shared handles to the three stores.
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserStore>,
    pub products: Arc<dyn ProductStore>,
    pub carts: Arc<dyn CartStore>,
}

impl Stores {
    /// Stores backed by `PostgreSQL`.
    #[must_use]
    pub fn postgres(pool: &PgPool) -> Self {
        Self {
            users: Arc::new(PgUserRepository::new(pool.clone())),
            products: Arc::new(ProductRepository::new(pool.clone())),
            carts: Arc::new(CartRepository::new(pool.clone())),
        }
    }

    /// Stores backed by a single in-memory store.
    #[must_use]
    pub fn memory(store: &Arc<MemoryStore>) -> Self {
        Self {
            users: store.clone(),
            products: store.clone(),
            carts: store.clone(),
        }
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
