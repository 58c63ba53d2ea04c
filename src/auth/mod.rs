//! Authentication boundary.
//!
//! Token issuance and account management belong to an external identity
//! provider. The relay only turns a presented bearer token into a
//! [`Principal`] via [`IdentityProvider`], in middleware that runs before
//! any handler. Handlers read the result with [`MaybePrincipal`].

pub mod jwt;
pub mod middleware;

use std::convert::Infallible;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::domain::Principal;

pub use jwt::JwtIdentity;
pub use middleware::resolve_principal;

/// Resolves bearer tokens to principals.
#[async_trait]
pub trait IdentityProvider: Send + Sync + std::fmt::Debug {
    /// Returns the principal for a valid token, `None` otherwise.
    async fn resolve(&self, token: &str) -> Option<Principal>;
}

/// Principal resolved by [`resolve_principal`], if any.
///
/// Never rejects: handlers decide what an anonymous request means.
#[derive(Debug, Clone)]
pub struct MaybePrincipal(pub Option<Principal>);

impl<S: Send + Sync> FromRequestParts<S> for MaybePrincipal {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(parts.extensions.get::<Principal>().cloned()))
    }
}
