//! Product catalog management.

use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{info, instrument};

use cornerstore_core::{Price, PriceError, ProductId};

use crate::db::{ProductStore, RepositoryError};
use crate::models::product::{NewProduct, Product, ProductUpdate};

/// Maximum product name length.
const MAX_NAME_LENGTH: usize = 200;

/// Errors from catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Input failed validation.
    #[error("{0}")]
    Validation(String),

    /// No product with this id.
    #[error("Product not found")]
    NotFound,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<PriceError> for CatalogError {
    fn from(err: PriceError) -> Self {
        Self::Validation(err.to_string())
    }
}

/// Unvalidated product fields as submitted by a client.
#[derive(Debug, Clone, Default)]
pub struct ProductDraft {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub price: Option<Decimal>,
    pub image_url: Option<Option<String>>,
}

/// Catalog service.
pub struct CatalogService<'a> {
    products: &'a dyn ProductStore,
}

impl<'a> CatalogService<'a> {
    #[must_use]
    pub const fn new(products: &'a dyn ProductStore) -> Self {
        Self { products }
    }

    /// Every product.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the store fails.
    pub async fn list(&self) -> Result<Vec<Product>, CatalogError> {
        Ok(self.products.list_products().await?)
    }

    /// A single product.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if there is no such product.
    pub async fn get(&self, id: ProductId) -> Result<Product, CatalogError> {
        self.products
            .get_product(id)
            .await?
            .ok_or(CatalogError::NotFound)
    }

    /// Validate and insert a product.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Validation` for a missing/empty name or a
    /// missing/negative price.
    #[instrument(skip(self))]
    pub async fn create(&self, draft: ProductDraft) -> Result<Product, CatalogError> {
        let name = draft
            .name
            .as_deref()
            .ok_or_else(|| CatalogError::Validation("name is required".to_owned()))?;
        let price = draft
            .price
            .ok_or_else(|| CatalogError::Validation("price is required".to_owned()))?;

        let product = NewProduct {
            name: validate_name(name)?,
            description: normalize_optional(draft.description.flatten()),
            price: Price::new(price)?,
            image_url: normalize_optional(draft.image_url.flatten()),
        };

        let created = self.products.create_product(&product).await?;
        info!(product_id = %created.id, "product created");
        Ok(created)
    }

    /// Validate and insert an already-typed product (CLI seeding).
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Validation` for an empty name.
    pub async fn create_validated(&self, product: NewProduct) -> Result<Product, CatalogError> {
        let product = NewProduct {
            name: validate_name(&product.name)?,
            description: normalize_optional(product.description),
            image_url: normalize_optional(product.image_url),
            ..product
        };
        Ok(self.products.create_product(&product).await?)
    }

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Validation` for invalid fields and
    /// `CatalogError::NotFound` if there is no such product.
    #[instrument(skip(self))]
    pub async fn update(&self, id: ProductId, draft: ProductDraft) -> Result<Product, CatalogError> {
        let update = ProductUpdate {
            name: draft.name.as_deref().map(validate_name).transpose()?,
            description: draft.description.map(normalize_optional),
            price: draft.price.map(Price::new).transpose()?,
            image_url: draft.image_url.map(normalize_optional),
        };

        self.products
            .update_product(id, &update)
            .await?
            .ok_or(CatalogError::NotFound)
    }

    /// Delete a product. Carts and orders referencing it are left alone.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if there is no such product.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: ProductId) -> Result<(), CatalogError> {
        if self.products.delete_product(id).await? {
            info!(product_id = %id, "product deleted");
            Ok(())
        } else {
            Err(CatalogError::NotFound)
        }
    }
}

fn validate_name(name: &str) -> Result<String, CatalogError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CatalogError::Validation("name must not be empty".to_owned()));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(CatalogError::Validation(format!(
            "name must be at most {MAX_NAME_LENGTH} characters"
        )));
    }
    Ok(name.to_owned())
}

/// Blank strings are stored as absent.
fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}
