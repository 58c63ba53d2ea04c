//! WebSocket layer: handshake authorization, session loop, wire frames.
//!
//! Each robot has its own endpoint at `/ws/robot/{robot_id}`. A client
//! connects there, joins the robot's group, and then exchanges chat and
//! status frames with every other session of the same robot.

pub mod connection;
pub mod handler;
pub mod messages;

use axum::Router;
use axum::routing::get;

use crate::app_state::AppState;

/// Routes for the per-robot WebSocket endpoint.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/ws/robot/{robot_id}", get(handler::robot_ws_handler))
        .route("/ws/robot/{robot_id}/", get(handler::robot_ws_handler))
}
