//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server errors to Sentry
//! before responding. Every error reaches the client as `{"error": "..."}`.
//! All route handlers should return `Result<T, AppError>`.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::auth::AuthError;
use crate::services::cart::CartError;
use crate::services::catalog::CatalogError;
use crate::services::payments::PaymentError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Cart, checkout or order operation failed.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// Catalog operation failed.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

const INTERNAL: &str = "Internal server error";

fn payment_status(err: &PaymentError) -> (StatusCode, String) {
    match err {
        PaymentError::InvalidAmount => (StatusCode::BAD_REQUEST, "Invalid amount".to_owned()),
        PaymentError::Unverified(_) => (
            StatusCode::PAYMENT_REQUIRED,
            "Payment could not be verified".to_owned(),
        ),
        PaymentError::Rejected { .. } | PaymentError::Http(_) | PaymentError::Parse(_) => (
            StatusCode::BAD_GATEWAY,
            "Payment processor error".to_owned(),
        ),
    }
}

impl AppError {
    /// Status code and client-safe message.
    ///
    /// Storage and processor internals are never exposed.
    #[must_use]
    pub fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            Self::Database(_) | Self::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL.to_owned())
            }
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials => {
                    (StatusCode::BAD_REQUEST, "Invalid credentials".to_owned())
                }
                AuthError::UserAlreadyExists => {
                    (StatusCode::BAD_REQUEST, "Email already exists".to_owned())
                }
                AuthError::WeakPassword(msg) | AuthError::InvalidName(msg) => {
                    (StatusCode::BAD_REQUEST, msg.clone())
                }
                AuthError::InvalidEmail(_) => {
                    (StatusCode::BAD_REQUEST, "Invalid email address".to_owned())
                }
                AuthError::Token(_) => (
                    StatusCode::UNAUTHORIZED,
                    "Authentication required".to_owned(),
                ),
                AuthError::Repository(_) | AuthError::PasswordHash => {
                    (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL.to_owned())
                }
            },
            Self::Cart(err) => match err {
                CartError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
                CartError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
                CartError::Payment(err) => payment_status(err),
                CartError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL.to_owned()),
            },
            Self::Catalog(err) => match err {
                CatalogError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
                CatalogError::NotFound => (StatusCode::NOT_FOUND, err.to_string()),
                CatalogError::Repository(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL.to_owned())
                }
            },
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();

        // Capture server errors (and upstream failures) to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Called once a bearer token has been verified.
pub fn set_sentry_user(user_id: &impl ToString) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            ..Default::default()
        }));
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
pub fn add_breadcrumb(category: &str, message: &str, data: &[(&str, String)]) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    for (key, value) in data {
        breadcrumb
            .data
            .insert((*key).to_string(), serde_json::Value::String(value.clone()));
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::to_bytes;

    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("product-123".to_string());
        assert_eq!(err.to_string(), "Not found: product-123");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_cart_error_status_codes() {
        assert_eq!(
            get_status(CartError::Validation("bad".into()).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(CartError::NotFound("Cart not found".into()).into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(CartError::Payment(PaymentError::InvalidAmount).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(CartError::Payment(PaymentError::Unverified("x".into())).into()),
            StatusCode::PAYMENT_REQUIRED
        );
        assert_eq!(
            get_status(
                CartError::Payment(PaymentError::Rejected {
                    status: 500,
                    message: "down".into()
                })
                .into()
            ),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            get_status(CartError::Storage(RepositoryError::NotFound).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_auth_error_messages() {
        let (status, message) = AppError::from(AuthError::UserAlreadyExists).status_and_message();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(message, "Email already exists");

        let (status, message) = AppError::from(AuthError::InvalidCredentials).status_and_message();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(message, "Invalid credentials");
    }

    #[tokio::test]
    async fn test_internals_are_hidden() {
        let err = AppError::Cart(CartError::Storage(RepositoryError::DataCorruption(
            "row 7 has a bad email".to_owned(),
        )));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json, json!({ "error": "Internal server error" }));
    }
}
