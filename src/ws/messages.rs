//! WebSocket message types: inbound client frames and outbound server frames.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{ChatPayload, GroupMessage, RobotId};
use crate::error::RelayError;

/// `type` of the only client frame the relay handles.
pub const CHAT_MESSAGE_TO_ROBOT: &str = "chat_message_to_robot";

/// Raw inbound frame: a `type` discriminator and a `payload` object.
///
/// `type` is kept as an arbitrary JSON value so that any unknown value,
/// including non-strings, is reported back rather than failing the parse.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientFrame {
    /// Message type discriminator.
    #[serde(rename = "type", default)]
    pub msg_type: Value,
    /// Type-specific payload. Defaults to an empty object.
    #[serde(default)]
    pub payload: Value,
}

/// A validated client command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCommand {
    /// Relay `text` to the robot's group.
    ChatMessageToRobot {
        /// Non-empty message body.
        text: String,
    },
}

impl ClientFrame {
    /// Parses a text frame.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::MalformedInput`] if the text is not JSON or is
    /// not a JSON object.
    pub fn parse(text: &str) -> Result<Self, RelayError> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| RelayError::MalformedInput(e.to_string()))?;
        if !value.is_object() {
            return Err(RelayError::MalformedInput(
                "expected a JSON object".to_string(),
            ));
        }
        serde_json::from_value(value).map_err(|e| RelayError::MalformedInput(e.to_string()))
    }

    /// Validates the frame into a command.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::MissingField`] if a chat frame has no usable
    /// `payload.text`, or [`RelayError::UnknownMessageType`] for any other
    /// `type`.
    pub fn into_command(self) -> Result<ClientCommand, RelayError> {
        match self.msg_type.as_str() {
            Some(CHAT_MESSAGE_TO_ROBOT) => {
                let text = self
                    .payload
                    .get("text")
                    .and_then(Value::as_str)
                    .filter(|text| !text.is_empty())
                    .ok_or(RelayError::MissingField {
                        field: "text",
                        message_type: CHAT_MESSAGE_TO_ROBOT,
                    })?;
                Ok(ClientCommand::ChatMessageToRobot {
                    text: text.to_string(),
                })
            }
            Some(other) => Err(RelayError::UnknownMessageType(other.to_string())),
            None => Err(RelayError::UnknownMessageType(self.msg_type.to_string())),
        }
    }
}

/// Body of a `robot_status_update` frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusPayload {
    /// Robot the status refers to.
    pub robot_id: RobotId,
    /// Status label.
    pub status: String,
    /// Human-readable detail, empty when none was given.
    pub message: String,
    /// Delivery time at this session.
    pub timestamp: DateTime<Utc>,
}

/// Body of an `error_message` frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    /// What went wrong with the client's frame.
    pub message: String,
    /// When the error was reported.
    pub timestamp: DateTime<Utc>,
}

/// Frames sent from the relay to a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    /// First frame of every accepted session.
    ConnectionEstablished {
        /// Confirmation text naming the robot.
        message: String,
    },
    /// A chat message relayed from the robot's group.
    ChatMessageFromRobot {
        /// Message body.
        payload: ChatPayload,
    },
    /// A robot status update.
    RobotStatusUpdate {
        /// Status body.
        payload: StatusPayload,
    },
    /// A per-frame error; the connection stays open.
    ErrorMessage {
        /// Error body.
        payload: ErrorPayload,
    },
}

impl ServerFrame {
    /// Confirmation sent once a session has joined its group.
    #[must_use]
    pub fn connection_established(robot_id: RobotId) -> Self {
        Self::ConnectionEstablished {
            message: format!("Successfully connected to robot {robot_id}"),
        }
    }

    /// Error frame describing `err`.
    #[must_use]
    pub fn error(err: &RelayError) -> Self {
        Self::ErrorMessage {
            payload: ErrorPayload {
                message: err.to_string(),
                timestamp: Utc::now(),
            },
        }
    }

    /// Renders a group delivery for a session of `session_robot`.
    ///
    /// Chat bodies pass through unchanged. Status updates are stamped with
    /// `now` and fall back to the session's robot when they name none.
    #[must_use]
    pub fn from_group(message: &GroupMessage, session_robot: RobotId, now: DateTime<Utc>) -> Self {
        match message {
            GroupMessage::Chat(payload) => Self::ChatMessageFromRobot {
                payload: ChatPayload::clone(payload),
            },
            GroupMessage::Status(details) => Self::RobotStatusUpdate {
                payload: StatusPayload {
                    robot_id: details.robot_id.unwrap_or(session_robot),
                    status: details.status.clone(),
                    message: details.message.clone().unwrap_or_default(),
                    timestamp: now,
                },
            },
        }
    }

    /// Serializes the frame to its JSON text.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::domain::StatusDetails;

    fn command(text: &str) -> Result<ClientCommand, RelayError> {
        ClientFrame::parse(text)?.into_command()
    }

    #[test]
    fn chat_frame_parses() {
        let cmd = command(r#"{"type":"chat_message_to_robot","payload":{"text":"hello"}}"#);
        assert!(matches!(
            cmd,
            Ok(ClientCommand::ChatMessageToRobot { text }) if text == "hello"
        ));
    }

    #[test]
    fn non_json_is_malformed() {
        assert!(matches!(command("hello?"), Err(RelayError::MalformedInput(_))));
        assert!(matches!(command("[1, 2]"), Err(RelayError::MalformedInput(_))));
    }

    #[test]
    fn empty_or_missing_text_is_rejected() {
        for frame in [
            r#"{"type":"chat_message_to_robot","payload":{}}"#,
            r#"{"type":"chat_message_to_robot","payload":{"text":""}}"#,
            r#"{"type":"chat_message_to_robot","payload":{"text":7}}"#,
            r#"{"type":"chat_message_to_robot"}"#,
        ] {
            assert!(
                matches!(command(frame), Err(RelayError::MissingField { field: "text", .. })),
                "{frame}"
            );
        }
    }

    #[test]
    fn unknown_types_are_named() {
        let Err(RelayError::UnknownMessageType(name)) = command(r#"{"type":"dance"}"#) else {
            panic!("expected unknown type");
        };
        assert_eq!(name, "dance");

        let Err(RelayError::UnknownMessageType(name)) = command(r#"{"payload":{}}"#) else {
            panic!("expected unknown type");
        };
        assert_eq!(name, "null");

        let Err(RelayError::UnknownMessageType(name)) = command(r#"{"type":5}"#) else {
            panic!("expected unknown type");
        };
        assert_eq!(name, "5");
    }

    #[test]
    fn connection_established_shape() {
        let robot = RobotId::new();
        let value: Value =
            serde_json::from_str(&ServerFrame::connection_established(robot).to_json())
                .unwrap_or_default();
        assert_eq!(value["type"], "connection_established");
        assert_eq!(
            value["message"],
            format!("Successfully connected to robot {robot}")
        );
    }

    #[test]
    fn error_frame_shape() {
        let frame = ServerFrame::error(&RelayError::UnknownMessageType("x".to_string()));
        let value: Value = serde_json::from_str(&frame.to_json()).unwrap_or_default();
        assert_eq!(value["type"], "error_message");
        assert_eq!(value["payload"]["message"], "Unknown message type: x");
        assert!(value["payload"]["timestamp"].is_string());
    }

    #[test]
    fn status_is_stamped_at_delivery() {
        let session_robot = RobotId::new();
        let details = GroupMessage::Status(Arc::new(StatusDetails {
            robot_id: None,
            status: "ONLINE".to_string(),
            message: None,
        }));
        let now = Utc::now();
        let ServerFrame::RobotStatusUpdate { payload } =
            ServerFrame::from_group(&details, session_robot, now)
        else {
            panic!("expected status frame");
        };
        assert_eq!(payload.robot_id, session_robot);
        assert_eq!(payload.message, "");
        assert_eq!(payload.timestamp, now);
    }

    #[test]
    fn chat_passes_through_unchanged() {
        let payload = ChatPayload {
            sender_username: "alice".to_string(),
            text: "hi".to_string(),
            robot_id: RobotId::new(),
            timestamp: Utc::now(),
        };
        let message = GroupMessage::Chat(Arc::new(payload.clone()));
        assert_eq!(
            ServerFrame::from_group(&message, RobotId::new(), Utc::now()),
            ServerFrame::ChatMessageFromRobot { payload }
        );
    }
}
