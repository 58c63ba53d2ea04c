//! Chat and status messages fanned out to a robot's group.
//!
//! A [`ChatMessage`] lives only for the duration of one inbound frame: it is
//! rendered into a [`ChatPayload`] for live delivery and into an event
//! record payload for the audit log. [`GroupMessage`] is what actually
//! travels through [`super::GroupRegistry`] to each session.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Principal, RobotId};

/// A chat message sent by a principal to a robot's group.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    /// Who sent the message.
    pub sender: Principal,
    /// Message body. Never empty.
    pub text: String,
    /// Target robot.
    pub robot_id: RobotId,
    /// Server-side stamp taken when the message was accepted.
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    /// Creates a message stamped with the current time.
    #[must_use]
    pub fn new(sender: Principal, robot_id: RobotId, text: String) -> Self {
        Self {
            sender,
            text,
            robot_id,
            timestamp: Utc::now(),
        }
    }

    /// Renders the client-facing body of the message.
    #[must_use]
    pub fn to_payload(&self) -> ChatPayload {
        ChatPayload {
            sender_username: self.sender.username.clone(),
            text: self.text.clone(),
            robot_id: self.robot_id,
            timestamp: self.timestamp,
        }
    }
}

/// Body of a `chat_message_from_robot` frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatPayload {
    /// Username of the sender.
    pub sender_username: String,
    /// Message body.
    pub text: String,
    /// Robot the message was addressed to.
    pub robot_id: RobotId,
    /// ISO-8601 acceptance time.
    pub timestamp: DateTime<Utc>,
}

/// Status information announced for a robot.
///
/// Carries no timestamp: each recipient stamps the update at delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusDetails {
    /// Robot the status refers to; recipients fall back to their own robot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub robot_id: Option<RobotId>,
    /// Status label (e.g. `"ONLINE"`).
    pub status: String,
    /// Optional human-readable detail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Item delivered to every member of a group.
///
/// Bodies are reference counted so fan-out only clones pointers.
#[derive(Debug, Clone)]
pub enum GroupMessage {
    /// A chat message to relay verbatim.
    Chat(Arc<ChatPayload>),
    /// A robot status update to stamp and relay.
    Status(Arc<StatusDetails>),
}
