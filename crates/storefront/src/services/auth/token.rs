//! Signed bearer tokens.

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use cornerstore_core::UserId;

use super::AuthError;
use crate::config::AuthConfig;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    /// User id.
    sub: String,
    iat: i64,
    exp: i64,
}

/// Issues and verifies HS256 tokens.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenService {
    /// Build from the auth configuration.
    #[must_use]
    pub fn new(config: &AuthConfig) -> Self {
        let secret = config.jwt_secret.expose_secret().as_bytes();
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl: config.token_ttl,
        }
    }

    /// Sign a token for `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Token` if signing fails.
    pub fn issue(&self, user_id: UserId) -> Result<String, AuthError> {
        let now = Utc::now().timestamp();
        let ttl = i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX);
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now,
            exp: now.saturating_add(ttl),
        };

        Ok(jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.encoding,
        )?)
    }

    /// Verify a token and return the user it was issued for.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Token` for bad signatures, expired tokens and
    /// malformed input, `AuthError::InvalidCredentials` if the subject is
    /// not a user id.
    pub fn verify(&self, token: &str) -> Result<UserId, AuthError> {
        let data = jsonwebtoken::decode::<Claims>(
            token,
            &self.decoding,
            &Validation::new(Algorithm::HS256),
        )?;

        data.claims
            .sub
            .parse::<UserId>()
            .ok()
            .filter(UserId::is_assigned)
            .ok_or(AuthError::InvalidCredentials)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;

    use super::*;

    fn service(secret: &str) -> TokenService {
        TokenService::new(&AuthConfig {
            jwt_secret: SecretString::from(secret),
            token_ttl: Duration::from_secs(3600),
        })
    }

    #[test]
    fn test_issued_token_verifies() {
        let tokens = service("a-test-secret-that-is-long-enough-123");
        let token = tokens.issue(UserId::new(42)).unwrap();
        assert_eq!(tokens.verify(&token).unwrap(), UserId::new(42));
    }

    #[test]
    fn test_token_from_other_secret_is_rejected() {
        let token = service("first-secret-first-secret-first-secret")
            .issue(UserId::new(1))
            .unwrap();
        let result = service("second-secret-second-secret-second").verify(&token);
        assert!(matches!(result, Err(AuthError::Token(_))));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let tokens = service("a-test-secret-that-is-long-enough-123");
        let past = Utc::now().timestamp() - 7200;
        let claims = Claims {
            sub: "1".to_owned(),
            iat: past,
            exp: past + 60,
        };
        let token =
            jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &tokens.encoding)
                .unwrap();

        assert!(matches!(tokens.verify(&token), Err(AuthError::Token(_))));
    }

    #[test]
    fn test_garbage_is_rejected() {
        let tokens = service("a-test-secret-that-is-long-enough-123");
        assert!(tokens.verify("not.a.token").is_err());
        assert!(tokens.verify("").is_err());
    }
}
