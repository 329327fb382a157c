//! HTTP route handlers for the storefront API.
//!
//! # Route Structure
//!
//! ```text
//! GET    /                       - Banner text
//! GET    /status                 - {status: "OK"}
//! GET    /info                   - Server information
//! GET    /health                 - Liveness
//! GET    /health/ready           - Readiness (database ping)
//!
//! # Auth (rate limited)
//! POST   /auth/register          - Create an account, returns a token
//! POST   /auth/login             - Exchange credentials for a token
//!
//! # Products
//! GET    /products               - Product listing
//! GET    /products/{id}          - Product detail
//! POST   /products               - Create (requires auth)
//! PUT    /products/{id}          - Partial update (requires auth)
//! DELETE /products/{id}          - Delete (requires auth)
//!
//! # Cart (requires auth)
//! GET    /cart                   - Cart contents and total
//! POST   /cart                   - Add item
//! PUT    /cart/{productId}       - Replace quantity
//! DELETE /cart/{productId}       - Remove item
//!
//! # Checkout & orders (requires auth)
//! POST   /create-payment-intent  - Start a payment, returns client secret
//! POST   /checkout               - Seal the cart as an order
//! GET    /orders                 - Order history
//! ```

pub mod auth;
pub mod cart;
pub mod checkout;
pub mod orders;
pub mod products;
pub mod service;

use axum::{
    Router,
    routing::{get, post, put},
};
use serde::Serialize;

use crate::middleware::auth_rate_limiter;
use crate::state::AppState;

/// `{"message": "..."}` acknowledgement body.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

impl MessageResponse {
    #[must_use]
    pub const fn new(message: &'static str) -> Self {
        Self { message }
    }
}

/// Create the auth routes router.
pub fn auth_routes(rate_limited: bool) -> Router<AppState> {
    let router = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    if rate_limited && let Some(limiter) = auth_rate_limiter() {
        router.layer(limiter)
    } else {
        router
    }
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index).post(products::create))
        .route(
            "/{id}",
            get(products::show)
                .put(products::update)
                .delete(products::delete),
        )
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show).post(cart::add))
        .route("/{product_id}", put(cart::update).delete(cart::remove))
}

/// Create the service routes router.
pub fn service_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(service::banner))
        .route("/status", get(service::status))
        .route("/info", get(service::info))
        .route("/health", get(service::health))
        .route("/health/ready", get(service::readiness))
}

/// Create all routes for the storefront.
pub fn routes(rate_limit_auth: bool) -> Router<AppState> {
    Router::new()
        .merge(service_routes())
        .nest("/auth", auth_routes(rate_limit_auth))
        .nest("/products", product_routes())
        .nest("/cart", cart_routes())
        .route(
            "/create-payment-intent",
            post(checkout::create_payment_intent),
        )
        .route("/checkout", post(checkout::checkout))
        .route("/orders", get(orders::index))
}
