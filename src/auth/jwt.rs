//! HS256 JWT validation for tokens minted by the identity provider.

use std::fmt;

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::IdentityProvider;
use crate::domain::Principal;

/// Claims the relay reads from an access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user id.
    pub sub: Uuid,
    /// Display name of the user.
    pub username: String,
    /// Expiration time (Unix timestamp).
    pub exp: i64,
}

/// Validates HS256 tokens signed with a shared secret.
pub struct JwtIdentity {
    key: DecodingKey,
    validation: Validation,
}

impl JwtIdentity {
    /// Creates a validator for tokens signed with `secret`.
    #[must_use]
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "sub"]);
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }
}

impl fmt::Debug for JwtIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtIdentity")
            .field("algorithms", &self.validation.algorithms)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl IdentityProvider for JwtIdentity {
    async fn resolve(&self, token: &str) -> Option<Principal> {
        match decode::<Claims>(token, &self.key, &self.validation) {
            Ok(data) => Some(Principal::new(data.claims.sub, data.claims.username)),
            Err(err) => {
                tracing::debug!(error = %err, "rejected bearer token");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};

    fn token(secret: &str, claims: &Claims) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap_or_default()
    }

    fn claims(exp_offset_secs: i64) -> Claims {
        Claims {
            sub: Uuid::new_v4(),
            username: "alice".to_string(),
            exp: chrono::Utc::now().timestamp() + exp_offset_secs,
        }
    }

    #[tokio::test]
    async fn valid_token_resolves_principal() {
        let identity = JwtIdentity::new("s3cret");
        let claims = claims(3600);
        let principal = identity.resolve(&token("s3cret", &claims)).await;
        assert_eq!(principal, Some(Principal::new(claims.sub, "alice")));
    }

    #[tokio::test]
    async fn wrong_secret_is_rejected() {
        let identity = JwtIdentity::new("s3cret");
        assert!(identity.resolve(&token("other", &claims(3600))).await.is_none());
    }

    #[tokio::test]
    async fn expired_token_is_rejected() {
        let identity = JwtIdentity::new("s3cret");
        assert!(identity.resolve(&token("s3cret", &claims(-3600))).await.is_none());
    }

    #[tokio::test]
    async fn garbage_is_rejected() {
        let identity = JwtIdentity::new("s3cret");
        assert!(identity.resolve("not.a.jwt").await.is_none());
    }
}
