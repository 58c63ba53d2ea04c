//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::auth::IdentityProvider;
use crate::service::RelayService;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Relay service for authorization and fan-out.
    pub relay: Arc<RelayService>,
    /// Identity provider used by the principal middleware.
    pub identity: Arc<dyn IdentityProvider>,
    /// Capacity of each session's group mailbox.
    pub session_outbound_capacity: usize,
}
