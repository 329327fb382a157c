//! Cart/order repository for database operations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use sqlx::types::Json;

use cornerstore_core::{CartOrderId, CartStatus, LineItems, UserId};

use super::{CartStore, RepositoryError, conflict_on_unique};
use crate::models::cart::CartOrder;

const CART_COLUMNS: &str = "id, user_id, status, items, total, version, payment_reference, \
                            created_at, updated_at, paid_at";

/// Database row for `cart_orders`.
#[derive(sqlx::FromRow)]
struct CartOrderRow {
    id: i32,
    user_id: i32,
    status: CartStatus,
    items: Json<LineItems>,
    total: Decimal,
    version: i64,
    payment_reference: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    paid_at: Option<DateTime<Utc>>,
}

impl From<CartOrderRow> for CartOrder {
    fn from(row: CartOrderRow) -> Self {
        Self {
            id: CartOrderId::new(row.id),
            user_id: UserId::new(row.user_id),
            status: row.status,
            items: row.items.0,
            total: row.total,
            version: row.version,
            payment_reference: row.payment_reference,
            created_at: row.created_at,
            updated_at: row.updated_at,
            paid_at: row.paid_at,
        }
    }
}

/// `PostgreSQL`-backed [`CartStore`].
#[derive(Clone)]
pub struct CartRepository {
    pool: PgPool,
}

impl CartRepository {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CartStore for CartRepository {
    async fn find_open_cart(&self, user_id: UserId) -> Result<Option<CartOrder>, RepositoryError> {
        let row = sqlx::query_as::<_, CartOrderRow>(&format!(
            "SELECT {CART_COLUMNS} FROM cart_orders WHERE user_id = $1 AND status = 'cart'"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(CartOrder::from))
    }

    async fn create_cart(
        &self,
        user_id: UserId,
        items: &LineItems,
        total: Decimal,
    ) -> Result<CartOrder, RepositoryError> {
        // `cart_orders_one_open_per_user` rejects a second open cart.
        let row = sqlx::query_as::<_, CartOrderRow>(&format!(
            r"
            INSERT INTO cart_orders (user_id, status, items, total)
            VALUES ($1, 'cart', $2, $3)
            RETURNING {CART_COLUMNS}
            "
        ))
        .bind(user_id)
        .bind(Json(items))
        .bind(total)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "user already has an open cart"))?;

        Ok(row.into())
    }

    async fn save_cart(&self, cart: &CartOrder) -> Result<CartOrder, RepositoryError> {
        let row = sqlx::query_as::<_, CartOrderRow>(&format!(
            r"
            UPDATE cart_orders SET
                status = $3,
                items = $4,
                total = $5,
                payment_reference = $6,
                paid_at = $7,
                version = version + 1,
                updated_at = NOW()
            WHERE id = $1 AND version = $2 AND status = 'cart'
            RETURNING {CART_COLUMNS}
            "
        ))
        .bind(cart.id)
        .bind(cart.version)
        .bind(cart.status)
        .bind(Json(&cart.items))
        .bind(cart.total)
        .bind(cart.payment_reference.as_deref())
        .bind(cart.paid_at)
        .fetch_optional(&self.pool)
        .await?;

        row.map(CartOrder::from).ok_or_else(|| {
            RepositoryError::Conflict(format!("cart {} changed concurrently", cart.id))
        })
    }

    async fn list_orders(&self, user_id: UserId) -> Result<Vec<CartOrder>, RepositoryError> {
        let rows = sqlx::query_as::<_, CartOrderRow>(&format!(
            r"
            SELECT {CART_COLUMNS} FROM cart_orders
            WHERE user_id = $1 AND status = 'paid'
            ORDER BY paid_at DESC, id DESC
            "
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(CartOrder::from).collect())
    }
}
