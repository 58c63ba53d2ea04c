//! WebSocket session loop.
//!
//! Handles the read/write loop for a single authorized connection: joins
//! the robot's group, confirms the connection, then interleaves inbound
//! client frames with deliveries from the group until either side goes
//! away.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use chrono::Utc;
use futures_util::{SinkExt, StreamExt};

use super::messages::{ClientCommand, ClientFrame, ServerFrame};
use crate::domain::{GroupMembership, Principal, RobotId, SessionHandle};
use crate::error::RelayError;
use crate::service::RelayService;

/// Everything a session needs once its handshake has been authorized.
#[derive(Debug, Clone)]
pub struct SessionContext {
    /// Authenticated user behind the connection.
    pub principal: Principal,
    /// Robot whose group the session joins.
    pub robot_id: RobotId,
    /// Shared relay service.
    pub service: Arc<RelayService>,
    /// Capacity of the session's group mailbox.
    pub outbound_capacity: usize,
}

/// Runs one session to completion.
///
/// - Inbound frames are handled strictly one at a time; replies to the
///   client (errors) go straight down this connection.
/// - Group deliveries are forwarded as they arrive.
/// - The session leaves its group on every exit path, including
///   cancellation of this future.
pub async fn run_session(socket: WebSocket, ctx: SessionContext) {
    let (handle, mut group_rx) = SessionHandle::channel(ctx.outbound_capacity);
    let membership = GroupMembership::join(ctx.service.registry(), ctx.robot_id, handle);
    let session_id = membership.session_id();
    let (mut ws_tx, mut ws_rx) = socket.split();

    tracing::info!(
        robot_id = %ctx.robot_id,
        %session_id,
        user = %ctx.principal.username,
        "websocket session connected"
    );

    let established = ServerFrame::connection_established(ctx.robot_id);
    if ws_tx.send(Message::text(established.to_json())).await.is_ok() {
        loop {
            tokio::select! {
                // Incoming frame from the client
                inbound = ws_rx.next() => {
                    let reply = match inbound {
                        Some(Ok(Message::Text(text))) => handle_text_message(&ctx, text.as_str()),
                        Some(Ok(Message::Binary(_))) => Some(ServerFrame::error(
                            &RelayError::MalformedInput("binary frames are not supported".to_string()),
                        )),
                        Some(Ok(Message::Close(_))) | None => break,
                        Some(Ok(_)) => None,
                        Some(Err(err)) => {
                            tracing::debug!(%session_id, error = %err, "websocket read failed");
                            break;
                        }
                    };
                    if let Some(frame) = reply
                        && ws_tx.send(Message::text(frame.to_json())).await.is_err() {
                            break;
                        }
                }
                // Delivery from the robot's group
                delivery = group_rx.recv() => {
                    let Some(message) = delivery else {
                        break;
                    };
                    let frame = ServerFrame::from_group(&message, ctx.robot_id, Utc::now());
                    if ws_tx.send(Message::text(frame.to_json())).await.is_err() {
                        break;
                    }
                }
            }
        }
    }

    drop(membership);
    tracing::info!(robot_id = %ctx.robot_id, %session_id, "websocket session closed");
}

/// Handles a text frame from the client, returning an optional reply for
/// this connection only.
fn handle_text_message(ctx: &SessionContext, text: &str) -> Option<ServerFrame> {
    match dispatch(ctx, text) {
        Ok(()) => None,
        Err(err) => {
            tracing::debug!(robot_id = %ctx.robot_id, error = %err, "rejected client frame");
            Some(ServerFrame::error(&err))
        }
    }
}

fn dispatch(ctx: &SessionContext, text: &str) -> Result<(), RelayError> {
    match ClientFrame::parse(text)?.into_command()? {
        ClientCommand::ChatMessageToRobot { text } => {
            ctx.service.broadcast_chat(&ctx.principal, ctx.robot_id, text);
        }
    }
    Ok(())
}
