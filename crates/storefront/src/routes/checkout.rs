//! Payment and checkout route handlers.

use axum::{
    Json,
    body::Bytes,
    extract::{State, rejection::JsonRejection},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use cornerstore_core::CartOrderId;

use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::RequireAuth;
use crate::services::cart::{CartError, initiate_payment};
use crate::state::AppState;

/// Payment intent request: amount in minor units (cents).
#[derive(Debug, Deserialize)]
pub struct PaymentIntentRequest {
    #[serde(default)]
    pub amount: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct PaymentIntentResponse {
    pub client_secret: String,
}

/// Checkout body. May be omitted entirely.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    #[serde(default)]
    pub payment_intent_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub message: &'static str,
    pub order_id: CartOrderId,
}

/// Start a payment with the processor.
#[instrument(skip(state, user, payload), fields(user_id = %user.id))]
pub async fn create_payment_intent(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    payload: std::result::Result<Json<PaymentIntentRequest>, JsonRejection>,
) -> Result<Json<PaymentIntentResponse>> {
    let Json(form) = payload?;
    let amount = form
        .amount
        .ok_or_else(|| CartError::Validation("amount is required".to_owned()))?;

    let client_secret = initiate_payment(state.payments(), amount).await?;
    Ok(Json(PaymentIntentResponse { client_secret }))
}

/// Seal the cart as an order.
#[instrument(skip(state, user, body), fields(user_id = %user.id))]
pub async fn checkout(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    body: Bytes,
) -> Result<Json<CheckoutResponse>> {
    let form = if body.iter().all(u8::is_ascii_whitespace) {
        CheckoutRequest::default()
    } else {
        serde_json::from_slice::<CheckoutRequest>(&body)
            .map_err(|e| AppError::BadRequest(format!("Invalid checkout body: {e}")))?
    };

    let order = state
        .cart_service()
        .checkout(user.id, form.payment_intent_id.as_deref())
        .await?;

    add_breadcrumb(
        "checkout",
        "Order placed",
        &[("order_id", order.id.to_string())],
    );

    Ok(Json(CheckoutResponse {
        message: "Order placed successfully",
        order_id: order.id,
    }))
}
