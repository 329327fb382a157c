//! Cart line items and total computation.
//!
//! A cart is an ordered list of `(product, quantity)` pairs. Products are weak
//! references: a line item may point at a product that has since been deleted
//! from the catalog. Such items stay in the list until explicitly removed, but
//! contribute nothing to the total and are hidden from projections.
//!
//! Everything here is pure. Callers supply price lookups as closures so the
//! same logic runs against Postgres rows, an in-memory catalog, or a test map.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{MAX_TOTAL, Price, ProductId, Quantity, QuantityError};

/// Errors from mutating a [`LineItems`] list.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineItemError {
    /// The product is not a line item of this cart.
    #[error("product {0} is not in the cart")]
    NotInCart(ProductId),
    /// The resulting quantity is out of range.
    #[error(transparent)]
    Quantity(#[from] QuantityError),
    /// The cart total is larger than an order can record.
    #[error("cart total cannot exceed {MAX_TOTAL}")]
    TotalTooLarge,
}

/// A single `(product, quantity)` entry.
///
/// `unit_price` is empty while the item sits in an open cart (prices are
/// always resolved live) and is filled in once at checkout, freezing what the
/// customer paid per unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Referenced product (weak reference).
    pub product_id: ProductId,
    /// Number of units.
    pub quantity: Quantity,
    /// Price per unit captured at checkout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<Price>,
}

impl LineItem {
    /// Create an unpriced line item.
    #[must_use]
    pub const fn new(product_id: ProductId, quantity: Quantity) -> Self {
        Self {
            product_id,
            quantity,
            unit_price: None,
        }
    }

    /// `price × quantity`, exact. `None` on overflow.
    #[must_use]
    pub fn subtotal(&self, price: Price) -> Option<Decimal> {
        price
            .amount()
            .checked_mul(Decimal::from(self.quantity.get()))
    }
}

/// Ordered, de-duplicated list of line items.
///
/// Each product appears at most once; adding a product that is already
/// present accumulates its quantity instead of appending a duplicate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineItems(Vec<LineItem>);

impl LineItems {
    /// An empty list.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Whether the list has no items (resolvable or not).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of stored items, including ones whose product no longer exists.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate over stored items in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, LineItem> {
        self.0.iter()
    }

    /// Find the item for a product.
    #[must_use]
    pub fn get(&self, product_id: ProductId) -> Option<&LineItem> {
        self.0.iter().find(|item| item.product_id == product_id)
    }

    /// Add `quantity` units of a product.
    ///
    /// Accumulates onto an existing item for the same product, otherwise
    /// appends a new item at the end.
    ///
    /// # Errors
    ///
    /// Returns `LineItemError::Quantity` if the accumulated quantity overflows.
    pub fn add(&mut self, product_id: ProductId, quantity: Quantity) -> Result<(), LineItemError> {
        match self.0.iter_mut().find(|item| item.product_id == product_id) {
            Some(item) => item.quantity = item.quantity.checked_add(quantity)?,
            None => self.0.push(LineItem::new(product_id, quantity)),
        }
        Ok(())
    }

    /// Replace the quantity of an existing item.
    ///
    /// # Errors
    ///
    /// Returns `LineItemError::NotInCart` if the product is not present.
    pub fn set_quantity(
        &mut self,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<(), LineItemError> {
        let item = self
            .0
            .iter_mut()
            .find(|item| item.product_id == product_id)
            .ok_or(LineItemError::NotInCart(product_id))?;
        item.quantity = quantity;
        Ok(())
    }

    /// Remove the item for a product, returning it.
    ///
    /// # Errors
    ///
    /// Returns `LineItemError::NotInCart` if the product is not present.
    pub fn remove(&mut self, product_id: ProductId) -> Result<LineItem, LineItemError> {
        let index = self
            .0
            .iter()
            .position(|item| item.product_id == product_id)
            .ok_or(LineItemError::NotInCart(product_id))?;
        Ok(self.0.remove(index))
    }

    /// Sum of `price × quantity` over items whose product resolves.
    ///
    /// `price_of` returns `None` for products that no longer exist; those
    /// items are skipped without error.
    ///
    /// # Errors
    ///
    /// Returns `LineItemError::TotalTooLarge` if the sum overflows or exceeds
    /// [`MAX_TOTAL`].
    pub fn total(
        &self,
        price_of: impl Fn(ProductId) -> Option<Price>,
    ) -> Result<Decimal, LineItemError> {
        let mut total = Decimal::ZERO;
        for item in &self.0 {
            let Some(price) = price_of(item.product_id) else {
                continue;
            };
            total = item
                .subtotal(price)
                .and_then(|subtotal| total.checked_add(subtotal))
                .filter(|sum| *sum <= MAX_TOTAL)
                .ok_or(LineItemError::TotalTooLarge)?;
        }
        Ok(total)
    }

    /// Capture the current price of every resolvable item.
    ///
    /// Items whose product no longer exists keep `unit_price = None`.
    pub fn freeze_prices(&mut self, price_of: impl Fn(ProductId) -> Option<Price>) {
        for item in &mut self.0 {
            item.unit_price = price_of(item.product_id);
        }
    }

    /// Distinct product ids referenced by the list.
    #[must_use]
    pub fn product_ids(&self) -> Vec<ProductId> {
        self.0.iter().map(|item| item.product_id).collect()
    }
}

impl<'a> IntoIterator for &'a LineItems {
    type Item = &'a LineItem;
    type IntoIter = std::slice::Iter<'a, LineItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
