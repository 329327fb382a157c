//! Cart route handlers.
//!
//! All handlers act on the caller's own cart, identified by the bearer token.

use axum::{
    Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
};
use serde::Deserialize;
use tracing::instrument;

use cornerstore_core::ProductId;

use super::MessageResponse;
use crate::error::{Result, add_breadcrumb};
use crate::middleware::RequireAuth;
use crate::models::CartView;
use crate::services::cart::CartError;
use crate::state::AppState;

/// Add to cart body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequest {
    #[serde(default)]
    pub product_id: Option<ProductId>,
    #[serde(default)]
    pub quantity: Option<i64>,
}

/// Update quantity body.
#[derive(Debug, Deserialize)]
pub struct UpdateQuantityRequest {
    #[serde(default)]
    pub quantity: Option<i64>,
}

fn required<T>(value: Option<T>, field: &str) -> std::result::Result<T, CartError> {
    value.ok_or_else(|| CartError::Validation(format!("{field} is required")))
}

/// Show the cart.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<CartView>> {
    Ok(Json(state.cart_service().get_cart(user.id).await?))
}

/// Add an item to the cart.
#[instrument(skip(state, user, payload), fields(user_id = %user.id))]
pub async fn add(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    payload: std::result::Result<Json<AddToCartRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>> {
    let Json(form) = payload?;
    let product_id = required(form.product_id, "productId")?;
    let quantity = required(form.quantity, "quantity")?;

    state
        .cart_service()
        .add_item(user.id, product_id, quantity)
        .await?;

    add_breadcrumb(
        "cart",
        "Added to cart",
        &[
            ("product_id", product_id.to_string()),
            ("quantity", quantity.to_string()),
        ],
    );

    Ok(Json(MessageResponse::new("Item added to cart")))
}

/// Replace the quantity of a cart item.
#[instrument(skip(state, user, product_id, payload), fields(user_id = %user.id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    product_id: std::result::Result<Path<ProductId>, PathRejection>,
    payload: std::result::Result<Json<UpdateQuantityRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>> {
    let Path(product_id) = product_id?;
    let Json(form) = payload?;
    let quantity = required(form.quantity, "quantity")?;

    state
        .cart_service()
        .update_item(user.id, product_id, quantity)
        .await?;

    Ok(Json(MessageResponse::new("Quantity updated")))
}

/// Remove an item from the cart.
#[instrument(skip(state, user, product_id), fields(user_id = %user.id))]
pub async fn remove(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    product_id: std::result::Result<Path<ProductId>, PathRejection>,
) -> Result<Json<MessageResponse>> {
    let Path(product_id) = product_id?;

    state
        .cart_service()
        .remove_item(user.id, product_id)
        .await?;

    Ok(Json(MessageResponse::new("Product removed from cart")))
}
