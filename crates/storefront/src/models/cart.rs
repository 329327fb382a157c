//! Cart/order records and their display projections.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use cornerstore_core::{
    CartOrderId, CartStatus, LineItemError, LineItems, Price, ProductId, UserId, with_cents,
};

use super::product::Product;

/// A cart (`status = cart`) or a finalized order (`status = paid`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartOrder {
    pub id: CartOrderId,
    pub user_id: UserId,
    pub status: CartStatus,
    pub items: LineItems,
    /// Total as of the last mutation (frozen once paid).
    pub total: Decimal,
    /// Optimistic concurrency token, bumped on every write.
    pub version: i64,
    /// Payment intent that settled this order, if one was supplied.
    pub payment_reference: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
}

/// Catalog rows keyed by id, used to resolve line items.
pub type Catalog = HashMap<ProductId, Product>;

/// Index a product list by id.
#[must_use]
pub fn index_catalog(products: Vec<Product>) -> Catalog {
    products.into_iter().map(|p| (p.id, p)).collect()
}

/// A resolved line item in the cart view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartProductView {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    pub price: Price,
    pub image_url: Option<String>,
    pub quantity: u32,
}

/// `GET /cart` response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartView {
    pub products: Vec<CartProductView>,
    pub total: Decimal,
}

impl CartView {
    /// The projection of a user with no cart.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            products: Vec::new(),
            total: with_cents(Decimal::ZERO),
        }
    }

    /// Project line items against the current catalog.
    ///
    /// Items whose product is gone are dropped and the total is recomputed
    /// from live prices.
    ///
    /// # Errors
    ///
    /// Returns `LineItemError::TotalTooLarge` if the total is out of range.
    pub fn project(items: &LineItems, catalog: &Catalog) -> Result<Self, LineItemError> {
        let products = items
            .iter()
            .filter_map(|item| {
                let product = catalog.get(&item.product_id)?;
                Some(CartProductView {
                    id: product.id,
                    name: product.name.clone(),
                    description: product.description.clone(),
                    price: product.price,
                    image_url: product.image_url.clone(),
                    quantity: item.quantity.get(),
                })
            })
            .collect();
        let total = items.total(|id| catalog.get(&id).map(|p| p.price))?;

        Ok(Self {
            products,
            total: with_cents(total),
        })
    }
}

/// A resolved line item in an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderProductView {
    pub id: ProductId,
    pub name: String,
    /// Price paid per unit (live price if the order predates price capture).
    pub price: Price,
    pub image_url: Option<String>,
    pub quantity: u32,
}

/// One entry of `GET /orders`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderView {
    pub id: CartOrderId,
    pub date: DateTime<Utc>,
    pub total: Decimal,
    pub products: Vec<OrderProductView>,
}

impl OrderView {
    /// Project a paid order against the current catalog.
    ///
    /// Products deleted since the order was placed are omitted; the stored
    /// total is reported unchanged.
    #[must_use]
    pub fn project(order: &CartOrder, catalog: &Catalog) -> Self {
        let products = order
            .items
            .iter()
            .filter_map(|item| {
                let product = catalog.get(&item.product_id)?;
                Some(OrderProductView {
                    id: product.id,
                    name: product.name.clone(),
                    price: item.unit_price.unwrap_or(product.price),
                    image_url: product.image_url.clone(),
                    quantity: item.quantity.get(),
                })
            })
            .collect();

        Self {
            id: order.id,
            date: order.paid_at.unwrap_or(order.updated_at),
            total: with_cents(order.total),
            products,
        }
    }
}
