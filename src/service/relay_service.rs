//! Relay service: authorizes sessions and fans messages out with audit.

use std::sync::Arc;

use crate::access::AccessOracle;
use crate::domain::event_record::{CHAT_MESSAGE_BROADCASTED, ROBOT_STATUS_ANNOUNCED};
use crate::domain::{
    ChatMessage, EventBus, EventDraft, GroupMessage, GroupRegistry, Principal, RobotId,
    SourceType, StatusDetails, Visibility,
};
use crate::error::RelayError;

/// Orchestration layer shared by the WebSocket and REST surfaces.
///
/// Every fan-out follows the same pattern: build the message, broadcast
/// it to the robot's group, then publish the audit event. The broadcast
/// never waits for the audit write.
#[derive(Debug, Clone)]
pub struct RelayService {
    registry: Arc<GroupRegistry>,
    event_bus: EventBus,
    oracle: Arc<dyn AccessOracle>,
}

impl RelayService {
    /// Creates a new `RelayService`.
    #[must_use]
    pub fn new(
        registry: Arc<GroupRegistry>,
        event_bus: EventBus,
        oracle: Arc<dyn AccessOracle>,
    ) -> Self {
        Self {
            registry,
            event_bus,
            oracle,
        }
    }

    /// Returns a reference to the inner [`GroupRegistry`].
    #[must_use]
    pub fn registry(&self) -> &Arc<GroupRegistry> {
        &self.registry
    }

    /// Returns a reference to the inner [`EventBus`].
    #[must_use]
    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Checks that `principal` may operate on `robot_id`.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Forbidden`] if the oracle denies access (which
    /// includes unknown robots), or the oracle's own error if it fails.
    pub async fn authorize(&self, principal: &Principal, robot_id: RobotId) -> Result<(), RelayError> {
        if self.oracle.can_access(principal, robot_id).await? {
            Ok(())
        } else {
            Err(RelayError::Forbidden)
        }
    }

    /// Relays a chat message to every session of the robot, the sender
    /// included, and publishes `chat.Message.Broadcasted`.
    ///
    /// Returns the number of sessions the message was queued for.
    pub fn broadcast_chat(&self, sender: &Principal, robot_id: RobotId, text: String) -> usize {
        let message = ChatMessage::new(sender.clone(), robot_id, text);
        let payload = Arc::new(message.to_payload());
        let delivered = self
            .registry
            .broadcast(robot_id, &GroupMessage::Chat(Arc::clone(&payload)));

        let draft = EventDraft::new(CHAT_MESSAGE_BROADCASTED, SourceType::UserClient)
            .source_id(sender.user_id)
            .robot_id(robot_id)
            .user_id(sender.user_id)
            .visibility(Visibility::UserVisible)
            .payload(serde_json::to_value(&*payload).unwrap_or_default())
            .occurred_at(message.timestamp);
        self.event_bus.publish(draft);

        tracing::debug!(
            %robot_id,
            sender = %sender.username,
            delivered,
            "chat message broadcast"
        );
        delivered
    }

    /// Announces a robot status to every session of the robot and
    /// publishes `robot.Status.Announced`.
    ///
    /// Returns the number of sessions the update was queued for.
    pub fn announce_status(
        &self,
        robot_id: RobotId,
        details: StatusDetails,
        announced_by: Option<&Principal>,
    ) -> usize {
        let details = StatusDetails {
            robot_id: details.robot_id.or(Some(robot_id)),
            ..details
        };
        let payload = serde_json::to_value(&details).unwrap_or_default();
        let delivered = self
            .registry
            .broadcast(robot_id, &GroupMessage::Status(Arc::new(details)));

        let mut draft = EventDraft::new(ROBOT_STATUS_ANNOUNCED, SourceType::System)
            .robot_id(robot_id)
            .visibility(Visibility::UserVisible)
            .payload(payload);
        if let Some(principal) = announced_by {
            draft = draft.user_id(principal.user_id);
        }
        self.event_bus.publish(draft);

        tracing::info!(%robot_id, delivered, "robot status announced");
        delivered
    }
}
