//! # robot-relay
//!
//! Real-time chat relay for robot instances, with a durable audit event
//! bus.
//!
//! Clients open a WebSocket per robot, are authorized against the robot's
//! owner, and join that robot's group. Every chat message a session sends
//! is fanned out to all sessions of the group and recorded as an audit
//! event. Other components can push robot status updates to the same
//! groups.
//!
//! ## Architecture
//!
//! ```text
//! Clients (WebSocket, HTTP)
//!     │
//!     ├── Principal middleware (auth/)
//!     ├── WS Handler + Session loop (ws/)
//!     ├── REST Handlers (api/)
//!     │
//!     ├── RelayService (service/)
//!     │     ├── AccessOracle (access/)
//!     │     ├── GroupRegistry (domain/)
//!     │     └── EventBus ──► EventSink (domain/)
//!     │
//!     └── Event log store (persistence/)
//! ```

use std::sync::Arc;

use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod access;
pub mod api;
pub mod app_state;
pub mod auth;
pub mod config;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod service;
pub mod ws;

use app_state::AppState;

/// Builds the full application router: REST, WebSocket, principal
/// middleware, tracing and CORS layers.
pub fn build_app(state: AppState) -> Router {
    let identity = Arc::clone(&state.identity);
    Router::new()
        .merge(api::build_router())
        .merge(ws::routes())
        .layer(axum::middleware::from_fn_with_state(
            identity,
            auth::resolve_principal,
        ))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
