//! Axum WebSocket upgrade handler with connect-time authorization.

use std::sync::Arc;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use super::connection::{SessionContext, run_session};
use crate::app_state::AppState;
use crate::auth::MaybePrincipal;
use crate::domain::{Principal, RobotId};
use crate::error::RelayError;

/// `GET /ws/robot/{robot_id}` — Upgrade to a robot session.
///
/// Identifiers that are not canonical UUIDs get a plain `404` before any
/// session logic runs. Anonymous, denied and unknown-robot handshakes all
/// get the same empty `403`, and no frame is ever sent to them.
pub async fn robot_ws_handler(
    ws: WebSocketUpgrade,
    Path(robot_id): Path<String>,
    MaybePrincipal(principal): MaybePrincipal,
    State(state): State<AppState>,
) -> Response {
    let Some(robot_id) = RobotId::parse_canonical(&robot_id) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    match authorize_connect(&state, principal, robot_id).await {
        Ok(principal) => {
            let ctx = SessionContext {
                principal,
                robot_id,
                service: Arc::clone(&state.relay),
                outbound_capacity: state.session_outbound_capacity,
            };
            ws.on_upgrade(move |socket| run_session(socket, ctx))
        }
        Err(err) => {
            if err.is_connect_rejection() {
                tracing::info!(%robot_id, reason = %err, "websocket connection rejected");
            } else {
                tracing::warn!(%robot_id, error = %err, "access check failed, rejecting connection");
            }
            reject_handshake()
        }
    }
}

async fn authorize_connect(
    state: &AppState,
    principal: Option<Principal>,
    robot_id: RobotId,
) -> Result<Principal, RelayError> {
    let principal = principal.ok_or(RelayError::Unauthenticated)?;
    state.relay.authorize(&principal, robot_id).await?;
    Ok(principal)
}

/// The single response used for every refused handshake.
fn reject_handshake() -> Response {
    StatusCode::FORBIDDEN.into_response()
}
