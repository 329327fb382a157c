//! Payment processor client (Stripe payment intents).
//!
//! The cart only ever talks to the [`PaymentProcessor`] trait: it asks for a
//! new intent when the shopper starts paying and reads an intent back at
//! checkout to confirm the money actually arrived.

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::config::PaymentConfig;

/// Errors that can occur when talking to the payment processor.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// Amount was zero, negative or not representable in minor units.
    #[error("amount must be a positive number of minor units")]
    InvalidAmount,

    /// Checkout attempted without a settled, matching payment.
    #[error("payment not verified: {0}")]
    Unverified(String),

    /// The processor refused the request.
    #[error("payment processor rejected the request: {status} - {message}")]
    Rejected { status: u16, message: String },

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Lifecycle state of a payment intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentIntentStatus {
    RequiresPaymentMethod,
    RequiresConfirmation,
    RequiresAction,
    Processing,
    RequiresCapture,
    Canceled,
    Succeeded,
    #[serde(other)]
    Unknown,
}

/// A payment intent as reported by the processor.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    /// Secret handed to the browser to confirm the payment.
    pub client_secret: Option<String>,
    /// Amount in minor units.
    pub amount: i64,
    pub currency: String,
    pub status: PaymentIntentStatus,
}

/// An external payment processor.
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    /// Currency every intent is created in (lowercase ISO code).
    fn currency(&self) -> &str;

    /// Create an intent for `amount` minor units.
    async fn create_payment_intent(&self, amount: i64) -> Result<PaymentIntent, PaymentError>;

    /// Fetch an existing intent.
    async fn retrieve_payment_intent(&self, id: &str) -> Result<PaymentIntent, PaymentError>;
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Stripe REST client.
#[derive(Clone)]
pub struct StripeClient {
    client: reqwest::Client,
    config: PaymentConfig,
}

impl StripeClient {
    /// Create a new Stripe client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: PaymentConfig) -> Result<Self, PaymentError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(20))
            .build()?;

        Ok(Self { client, config })
    }

    fn intents_url(&self) -> String {
        format!(
            "{}/v1/payment_intents",
            self.config.api_base.trim_end_matches('/')
        )
    }

    async fn read_intent(response: reqwest::Response) -> Result<PaymentIntent, PaymentError> {
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .ok()
                .and_then(|e| e.error.message)
                .unwrap_or(body);
            return Err(PaymentError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| PaymentError::Parse(e.to_string()))
    }
}

#[async_trait]
impl PaymentProcessor for StripeClient {
    fn currency(&self) -> &str {
        &self.config.currency
    }

    #[instrument(skip(self))]
    async fn create_payment_intent(&self, amount: i64) -> Result<PaymentIntent, PaymentError> {
        if amount <= 0 {
            return Err(PaymentError::InvalidAmount);
        }

        let form = [
            ("amount", amount.to_string()),
            ("currency", self.config.currency.clone()),
            ("automatic_payment_methods[enabled]", "true".to_owned()),
        ];

        let response = self
            .client
            .post(self.intents_url())
            .bearer_auth(self.config.secret_key.expose_secret())
            .form(&form)
            .send()
            .await?;

        let intent = Self::read_intent(response).await?;
        debug!(intent_id = %intent.id, "created payment intent");
        Ok(intent)
    }

    #[instrument(skip(self))]
    async fn retrieve_payment_intent(&self, id: &str) -> Result<PaymentIntent, PaymentError> {
        if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(PaymentError::Unverified("malformed payment intent id".to_owned()));
        }

        let response = self
            .client
            .get(format!("{}/{id}", self.intents_url()))
            .bearer_auth(self.config.secret_key.expose_secret())
            .send()
            .await?;

        Self::read_intent(response).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_intent_deserializes_from_processor_json() {
        let intent: PaymentIntent = serde_json::from_value(serde_json::json!({
            "id": "pi_123",
            "object": "payment_intent",
            "amount": 2198,
            "currency": "usd",
            "client_secret": "pi_123_secret_abc",
            "status": "succeeded",
        }))
        .unwrap();

        assert_eq!(intent.amount, 2198);
        assert_eq!(intent.status, PaymentIntentStatus::Succeeded);
        assert_eq!(intent.client_secret.as_deref(), Some("pi_123_secret_abc"));
    }

    #[test]
    fn test_unknown_status_is_tolerated() {
        let intent: PaymentIntent = serde_json::from_value(serde_json::json!({
            "id": "pi_1",
            "amount": 1,
            "currency": "usd",
            "client_secret": null,
            "status": "something_new",
        }))
        .unwrap();

        assert_eq!(intent.status, PaymentIntentStatus::Unknown);
    }

    #[tokio::test]
    async fn test_non_positive_amount_is_rejected_locally() {
        let client = StripeClient::new(PaymentConfig {
            api_base: "http://127.0.0.1:9".to_owned(),
            secret_key: "sk_test_unused".to_owned().into(),
            currency: "usd".to_owned(),
        })
        .unwrap();

        assert!(matches!(
            client.create_payment_intent(0).await,
            Err(PaymentError::InvalidAmount)
        ));
        assert!(matches!(
            client.create_payment_intent(-5).await,
            Err(PaymentError::InvalidAmount)
        ));
    }

    #[tokio::test]
    async fn test_malformed_intent_id_is_unverified() {
        let client = StripeClient::new(PaymentConfig {
            api_base: "http://127.0.0.1:9".to_owned(),
            secret_key: "sk_test_unused".to_owned().into(),
            currency: "usd".to_owned(),
        })
        .unwrap();

        assert!(matches!(
            client.retrieve_payment_intent("../charges").await,
            Err(PaymentError::Unverified(_))
        ));
    }
}
