//! Integration tests for Cornerstore.
//!
//! # Running Tests
//!
//! ```bash
//! # In-process tests (memory stores, fake payment processor)
//! cargo test -p cornerstore-integration-tests
//!
//! # Live tests against a running server and database
//! STOREFRONT_BASE_URL=http://localhost:3000 \
//!     cargo test -p cornerstore-integration-tests -- --ignored
//! ```
//!
//! [`TestApp`] drives the real router with `tower::ServiceExt::oneshot`, so
//! every request passes through the same middleware stack as production.

#![allow(clippy::missing_panics_doc)]

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use secrecy::SecretString;
use serde_json::{Value, json};
use tower::ServiceExt;

use cornerstore_core::UserId;
use cornerstore_storefront::build_app;
use cornerstore_storefront::config::{AuthConfig, PaymentConfig, StorefrontConfig};
use cornerstore_storefront::db::{MemoryStore, Stores};
use cornerstore_storefront::services::payments::{
    PaymentError, PaymentIntent, PaymentIntentStatus, PaymentProcessor,
};
use cornerstore_storefront::state::AppState;

const BODY_LIMIT: usize = 1024 * 1024;

/// Configuration suitable for in-process tests.
#[must_use]
pub fn test_config(require_verified_payment: bool) -> StorefrontConfig {
    StorefrontConfig {
        database_url: SecretString::from("postgres://unused"),
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 3000,
        environment: "test".to_owned(),
        auth: AuthConfig {
            jwt_secret: SecretString::from("Kq8#vLz2!pW9sRt4@mXc7&nB5hJd3$Fg"),
            token_ttl: Duration::from_secs(3600),
        },
        payments: PaymentConfig {
            api_base: "http://127.0.0.1:9".to_owned(),
            secret_key: SecretString::from("sk_test_unused"),
            currency: "usd".to_owned(),
        },
        require_verified_payment,
        auth_rate_limit: false,
        cors_origin: None,
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 1.0,
        sentry_traces_sample_rate: 0.0,
    }
}

/// In-memory stand-in for the payment processor.
///
/// Intents start as `requires_payment_method`; [`FakeProcessor::settle`]
/// marks one as succeeded, as the browser confirmation would.
#[derive(Default)]
pub struct FakeProcessor {
    intents: Mutex<HashMap<String, PaymentIntent>>,
    next_id: AtomicU32,
}

impl FakeProcessor {
    /// Mark an intent as succeeded.
    pub fn settle(&self, id: &str) {
        if let Some(intent) = self.lock().get_mut(id) {
            intent.status = PaymentIntentStatus::Succeeded;
        }
    }

    /// Register an already settled intent for `amount` minor units.
    pub fn insert_succeeded(&self, id: &str, amount: i64) {
        self.lock().insert(
            id.to_owned(),
            PaymentIntent {
                id: id.to_owned(),
                client_secret: Some(format!("{id}_secret")),
                amount,
                currency: "usd".to_owned(),
                status: PaymentIntentStatus::Succeeded,
            },
        );
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, PaymentIntent>> {
        self.intents
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl PaymentProcessor for FakeProcessor {
    fn currency(&self) -> &str {
        "usd"
    }

    async fn create_payment_intent(&self, amount: i64) -> Result<PaymentIntent, PaymentError> {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let id = format!("pi_fake_{n}");
        let intent = PaymentIntent {
            id: id.clone(),
            client_secret: Some(format!("{id}_secret_{n}")),
            amount,
            currency: "usd".to_owned(),
            status: PaymentIntentStatus::RequiresPaymentMethod,
        };
        self.lock().insert(id, intent.clone());
        Ok(intent)
    }

    async fn retrieve_payment_intent(&self, id: &str) -> Result<PaymentIntent, PaymentError> {
        self.lock()
            .get(id)
            .cloned()
            .ok_or_else(|| PaymentError::Rejected {
                status: 404,
                message: format!("No such payment_intent: '{id}'"),
            })
    }
}

/// A response with its body parsed as JSON (or `Value::String` for text).
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: Value,
}

/// The storefront router over memory stores and a fake processor.
pub struct TestApp {
    router: Router,
    state: AppState,
    pub store: Arc<MemoryStore>,
    pub payments: Arc<FakeProcessor>,
}

impl TestApp {
    /// App that requires a settled payment at checkout.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(test_config(true))
    }

    /// App that seals carts without consulting the processor.
    #[must_use]
    pub fn lenient() -> Self {
        Self::with_config(test_config(false))
    }

    #[must_use]
    pub fn with_config(config: StorefrontConfig) -> Self {
        let store = Arc::new(MemoryStore::default());
        let payments = Arc::new(FakeProcessor::default());
        let state = AppState::from_parts(config, Stores::memory(&store), payments.clone());
        Self {
            router: build_app(state.clone()),
            state,
            store,
            payments,
        }
    }

    /// A valid bearer token for `user_id`, without registering.
    #[must_use]
    pub fn token_for(&self, user_id: i32) -> String {
        self.state
            .tokens()
            .issue(UserId::new(user_id))
            .expect("Failed to issue token")
    }

    /// Send a request and collect the response.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(value) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };
        let request = builder.body(body).expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Router is infallible");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), BODY_LIMIT)
            .await
            .expect("Failed to read body");
        let body = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));

        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> TestResponse {
        self.request(Method::GET, path, token, None).await
    }

    pub async fn post(&self, path: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.request(Method::POST, path, token, Some(body)).await
    }

    pub async fn put(&self, path: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.request(Method::PUT, path, token, Some(body)).await
    }

    pub async fn delete(&self, path: &str, token: Option<&str>) -> TestResponse {
        self.request(Method::DELETE, path, token, None).await
    }

    /// Create a product and return its id.
    pub async fn create_product(&self, token: &str, name: &str, price: &str) -> i64 {
        let response = self
            .post(
                "/products",
                Some(token),
                json!({ "name": name, "price": price }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
        response.body["id"]
            .as_i64()
            .expect("Product id should be a number")
    }

    /// Add `quantity` of `product_id` to the caller's cart.
    pub async fn add_to_cart(&self, token: &str, product_id: i64, quantity: i64) -> TestResponse {
        self.post(
            "/cart",
            Some(token),
            json!({ "productId": product_id, "quantity": quantity }),
        )
        .await
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

/// Base URL for live tests (configurable via environment).
#[must_use]
pub fn storefront_base_url() -> String {
    std::env::var("STOREFRONT_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_owned())
}
