//! Data Transfer Objects for REST request/response serialization.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::RobotId;

/// Lifecycle states a robot can announce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RobotStatus {
    /// Not running.
    Offline,
    /// Running and reachable.
    Online,
    /// Running a training job.
    Training,
    /// Failed.
    Error,
    /// Under maintenance.
    Maintenance,
}

impl RobotStatus {
    /// Returns the wire label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Offline => "OFFLINE",
            Self::Online => "ONLINE",
            Self::Training => "TRAINING",
            Self::Error => "ERROR",
            Self::Maintenance => "MAINTENANCE",
        }
    }
}

/// Body of `POST /api/v1/robots/{robot_id}/status`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct StatusAnnouncementRequest {
    /// New status of the robot.
    pub status: RobotStatus,
    /// Optional detail shown to connected clients.
    #[serde(default)]
    pub message: Option<String>,
}

/// Response of a status announcement.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StatusAnnouncementResponse {
    /// Robot the status was announced for.
    #[schema(value_type = String, format = Uuid)]
    pub robot_id: RobotId,
    /// Announced status.
    pub status: RobotStatus,
    /// Number of live sessions the update was queued for.
    pub delivered: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_labels_match_serde() {
        for status in [
            RobotStatus::Offline,
            RobotStatus::Online,
            RobotStatus::Training,
            RobotStatus::Error,
            RobotStatus::Maintenance,
        ] {
            let json = serde_json::to_string(&status).unwrap_or_default();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
    }

    #[test]
    fn request_message_is_optional() {
        let req: Result<StatusAnnouncementRequest, _> =
            serde_json::from_str(r#"{"status":"ONLINE"}"#);
        assert!(req.is_ok_and(|r| r.status == RobotStatus::Online && r.message.is_none()));
        let bad: Result<StatusAnnouncementRequest, _> =
            serde_json::from_str(r#"{"status":"DANCING"}"#);
        assert!(bad.is_err());
    }
}
