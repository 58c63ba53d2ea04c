//! Domain layer: identifiers, chat messages, group fan-out and audit events.
//!
//! This module holds the server-side model of the relay: robot and
//! session identity, the per-robot group registry that fans messages out
//! to live sessions, and the event bus that records what happened.

pub mod chat;
pub mod event_bus;
pub mod event_record;
pub mod group_registry;
pub mod principal;
pub mod robot_id;

pub use chat::{ChatMessage, ChatPayload, GroupMessage, StatusDetails};
pub use event_bus::{EventBus, EventSink};
pub use event_record::{EventDraft, EventRecord, EventTimestamp, SourceType, Visibility};
pub use group_registry::{GroupMembership, GroupRegistry, SessionHandle, SessionId};
pub use principal::Principal;
pub use robot_id::{InvalidRobotId, RobotId};
