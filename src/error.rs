//! Relay error types with HTTP status code mapping.
//!
//! [`RelayError`] is the central error type for the relay. Each variant
//! maps to a specific HTTP status code and structured JSON error response.
//! Per-frame WebSocket failures reuse the display text as the `message`
//! of an `error_message` frame.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Structured JSON error response body.
///
/// All REST error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 2002,
///     "message": "robot not found",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// Numeric error code.
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category            | HTTP Status                 |
/// |-----------|---------------------|-----------------------------|
/// | 1000–1999 | Validation / frames | 400 Bad Request             |
/// | 2000–2999 | Auth / Not Found    | 401 / 403 / 404             |
/// | 3000–3999 | Server              | 500 Internal Server Error   |
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// No principal was resolved for the request.
    #[error("authentication required")]
    Unauthenticated,

    /// The principal may not operate on the robot.
    #[error("access to robot denied")]
    Forbidden,

    /// The robot does not exist (or is not visible to the principal).
    #[error("robot not found")]
    NotFound,

    /// An inbound frame could not be parsed.
    #[error("Invalid JSON received: {0}")]
    MalformedInput(String),

    /// A required payload field was missing or empty.
    #[error("Missing '{field}' in payload for {message_type}.")]
    MissingField {
        /// Name of the missing field.
        field: &'static str,
        /// Message type that requires the field.
        message_type: &'static str,
    },

    /// The inbound frame carried a `type` the relay does not handle.
    #[error("Unknown message type: {0}")]
    UnknownMessageType(String),

    /// REST request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Event log or access store failure.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl RelayError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::MalformedInput(_) => 1002,
            Self::MissingField { .. } => 1003,
            Self::UnknownMessageType(_) => 1004,
            Self::Unauthenticated => 2000,
            Self::Forbidden => 2001,
            Self::NotFound => 2002,
            Self::Internal(_) => 3000,
            Self::Persistence(_) => 3001,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_)
            | Self::MalformedInput(_)
            | Self::MissingField { .. }
            | Self::UnknownMessageType(_) => StatusCode::BAD_REQUEST,
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Persistence(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns `true` for failures that must end a connection attempt.
    #[must_use]
    pub const fn is_connect_rejection(&self) -> bool {
        matches!(self, Self::Unauthenticated | Self::Forbidden | Self::NotFound)
    }
}

impl From<sqlx::Error> for RelayError {
    fn from(err: sqlx::Error) -> Self {
        Self::Persistence(err.to_string())
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}
