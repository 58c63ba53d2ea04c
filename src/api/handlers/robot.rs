//! Robot endpoints: status announcements to connected sessions.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};

use crate::api::dto::{StatusAnnouncementRequest, StatusAnnouncementResponse};
use crate::app_state::AppState;
use crate::auth::MaybePrincipal;
use crate::domain::{RobotId, StatusDetails};
use crate::error::{ErrorResponse, RelayError};

/// `POST /robots/{robot_id}/status` — Announce a robot status.
///
/// Robots the caller does not own answer `404`, exactly like robots that
/// do not exist.
///
/// # Errors
///
/// Returns [`RelayError::Unauthenticated`] without a principal,
/// [`RelayError::NotFound`] for malformed, unknown or foreign robots, and
/// [`RelayError::Persistence`] if the access check fails.
#[utoipa::path(
    post,
    path = "/api/v1/robots/{robot_id}/status",
    tag = "Robots",
    summary = "Announce robot status",
    description = "Pushes a `robot_status_update` frame to every live session of the robot and records a `robot.Status.Announced` event.",
    params(("robot_id" = String, Path, description = "Canonical robot UUID")),
    request_body = StatusAnnouncementRequest,
    responses(
        (status = 202, description = "Status announced", body = StatusAnnouncementResponse),
        (status = 401, description = "No valid bearer token", body = ErrorResponse),
        (status = 404, description = "Robot not found", body = ErrorResponse),
    )
)]
pub async fn announce_status(
    State(state): State<AppState>,
    MaybePrincipal(principal): MaybePrincipal,
    Path(robot_id): Path<String>,
    Json(req): Json<StatusAnnouncementRequest>,
) -> Result<impl IntoResponse, RelayError> {
    let robot_id = RobotId::parse_canonical(&robot_id).ok_or(RelayError::NotFound)?;
    let principal = principal.ok_or(RelayError::Unauthenticated)?;
    state
        .relay
        .authorize(&principal, robot_id)
        .await
        .map_err(|err| match err {
            RelayError::Forbidden => RelayError::NotFound,
            other => other,
        })?;

    let details = StatusDetails {
        robot_id: Some(robot_id),
        status: req.status.as_str().to_string(),
        message: req.message,
    };
    let delivered = state
        .relay
        .announce_status(robot_id, details, Some(&principal));

    let response = StatusAnnouncementResponse {
        robot_id,
        status: req.status,
        delivered,
    };
    Ok((StatusCode::ACCEPTED, Json(response)))
}

/// Robot routes mounted under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new().route("/robots/{robot_id}/status", post(announce_status))
}
