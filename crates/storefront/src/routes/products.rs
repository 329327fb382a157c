//! Product route handlers.
//!
//! Reads are public; writes require a bearer token.

use axum::{
    Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use tracing::instrument;

use cornerstore_core::ProductId;

use super::MessageResponse;
use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::Product;
use crate::services::catalog::{CatalogService, ProductDraft};
use crate::state::AppState;

/// Distinguish an absent field (`None`) from an explicit `null` (`Some(None)`).
fn double_option<'de, D, T>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Create/update body. All fields optional here; the service decides what
/// is required.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPayload {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default, deserialize_with = "double_option")]
    pub image_url: Option<Option<String>>,
}

impl From<ProductPayload> for ProductDraft {
    fn from(payload: ProductPayload) -> Self {
        Self {
            name: payload.name,
            description: payload.description,
            price: payload.price,
            image_url: payload.image_url,
        }
    }
}

/// List all products.
#[instrument(skip(state))]
pub async fn index(State(state): State<AppState>) -> Result<Json<Vec<Product>>> {
    let catalog = CatalogService::new(state.stores().products.as_ref());
    Ok(Json(catalog.list().await?))
}

/// Show a single product.
#[instrument(skip(state, id))]
pub async fn show(
    State(state): State<AppState>,
    id: std::result::Result<Path<ProductId>, PathRejection>,
) -> Result<Json<Product>> {
    let Path(id) = id?;
    let catalog = CatalogService::new(state.stores().products.as_ref());
    Ok(Json(catalog.get(id).await?))
}

/// Create a product.
#[instrument(skip(state, payload))]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    payload: std::result::Result<Json<ProductPayload>, JsonRejection>,
) -> Result<(StatusCode, Json<Product>)> {
    let Json(payload) = payload?;
    let catalog = CatalogService::new(state.stores().products.as_ref());

    let product = catalog.create(payload.into()).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// Apply a partial update to a product.
#[instrument(skip(state, id, payload))]
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    id: std::result::Result<Path<ProductId>, PathRejection>,
    payload: std::result::Result<Json<ProductPayload>, JsonRejection>,
) -> Result<Json<Product>> {
    let Path(id) = id?;
    let Json(payload) = payload?;
    let catalog = CatalogService::new(state.stores().products.as_ref());

    Ok(Json(catalog.update(id, payload.into()).await?))
}

/// Delete a product.
#[instrument(skip(state, id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAuth(_user): RequireAuth,
    id: std::result::Result<Path<ProductId>, PathRejection>,
) -> Result<Json<MessageResponse>> {
    let Path(id) = id?;
    let catalog = CatalogService::new(state.stores().products.as_ref());

    catalog.delete(id).await?;
    Ok(Json(MessageResponse::new("Product deleted successfully")))
}
