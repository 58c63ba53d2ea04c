//! Middleware attaching the request's [`Principal`] to its extensions.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;

use super::IdentityProvider;

/// Resolves the bearer token, if any, and stores the principal in the
/// request extensions.
///
/// The token is read from `Authorization: Bearer <token>` or, for
/// WebSocket handshakes where browsers cannot set headers, from the
/// `token` query parameter. Invalid or missing tokens leave the request
/// anonymous.
pub async fn resolve_principal(
    State(identity): State<Arc<dyn IdentityProvider>>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(token) = bearer_token(&request)
        && let Some(principal) = identity.resolve(&token).await
    {
        request.extensions_mut().insert(principal);
    }
    next.run(request).await
}

fn bearer_token(request: &Request) -> Option<String> {
    let from_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty());
    if let Some(token) = from_header {
        return Some(token.to_string());
    }
    request
        .uri()
        .query()?
        .split('&')
        .find_map(|pair| pair.strip_prefix("token="))
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}
