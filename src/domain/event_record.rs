//! Audit event records and the drafts publishers hand to the bus.
//!
//! Publishers build an [`EventDraft`] and pass it to
//! [`super::EventBus::publish`]. Only the sink turns a draft into an
//! [`EventRecord`]: it assigns the event id, resolves the occurrence time,
//! normalizes identifiers and stamps the log time.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Event type emitted for every relayed chat message.
pub const CHAT_MESSAGE_BROADCASTED: &str = "chat.Message.Broadcasted";

/// Event type emitted when a robot status is announced to its group.
pub const ROBOT_STATUS_ANNOUNCED: &str = "robot.Status.Announced";

/// Which part of the system produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceType {
    /// The relay or another backend component.
    System,
    /// A connected user client.
    UserClient,
    /// Robot core logic.
    RobotCore,
    /// A plugin attached to a robot.
    Plugin,
}

impl SourceType {
    /// Returns the stored string form.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::System => "SYSTEM",
            Self::UserClient => "USER_CLIENT",
            Self::RobotCore => "ROBOT_CORE",
            Self::Plugin => "PLUGIN",
        }
    }
}

/// Who may see an event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Visibility {
    /// Backend only.
    #[default]
    Internal,
    /// Visible to user clients.
    UserVisible,
    /// Visible to plugins.
    PluginVisible,
}

impl Visibility {
    /// Returns the stored string form.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Internal => "INTERNAL",
            Self::UserVisible => "USER_VISIBLE",
            Self::PluginVisible => "PLUGIN_VISIBLE",
        }
    }
}

/// Occurrence time as supplied by a publisher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventTimestamp {
    /// An already structured instant.
    At(DateTime<Utc>),
    /// A textual instant to be parsed by the sink.
    Raw(String),
}

impl EventTimestamp {
    /// Resolves to a concrete instant, falling back to `now` when the raw
    /// form cannot be parsed.
    ///
    /// Accepted raw forms: RFC 3339 with offset, naive ISO date-times
    /// (`T` or space separated, optional fraction) taken as UTC, and bare
    /// dates taken as midnight UTC.
    #[must_use]
    pub fn resolve(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            Self::At(at) => *at,
            Self::Raw(raw) => parse_timestamp(raw).unwrap_or(now),
        }
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Some(at.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Fields of an event as handed to the bus by a publisher.
#[derive(Debug, Clone, PartialEq)]
pub struct EventDraft {
    /// Dotted event type, e.g. `chat.Message.Broadcasted`.
    pub event_type: String,
    /// Producing component.
    pub source_type: SourceType,
    /// Identifier of the producer within its type.
    pub source_id: Option<String>,
    /// Robot the event concerns.
    pub robot_id: Option<String>,
    /// User the event concerns.
    pub user_id: Option<String>,
    /// Audience of the event.
    pub visibility: Visibility,
    /// Event specific data.
    pub payload: serde_json::Value,
    /// When the event happened, if the publisher knows.
    pub timestamp: Option<EventTimestamp>,
}

impl EventDraft {
    /// Starts a draft with the required fields and all defaults.
    #[must_use]
    pub fn new(event_type: impl Into<String>, source_type: SourceType) -> Self {
        Self {
            event_type: event_type.into(),
            source_type,
            source_id: None,
            robot_id: None,
            user_id: None,
            visibility: Visibility::default(),
            payload: serde_json::Value::Object(serde_json::Map::new()),
            timestamp: None,
        }
    }

    /// Sets the source identifier.
    #[must_use]
    pub fn source_id(mut self, id: impl ToString) -> Self {
        self.source_id = Some(id.to_string());
        self
    }

    /// Sets the robot identifier.
    #[must_use]
    pub fn robot_id(mut self, id: impl ToString) -> Self {
        self.robot_id = Some(id.to_string());
        self
    }

    /// Sets the user identifier.
    #[must_use]
    pub fn user_id(mut self, id: impl ToString) -> Self {
        self.user_id = Some(id.to_string());
        self
    }

    /// Sets the visibility.
    #[must_use]
    pub const fn visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    /// Sets the payload.
    #[must_use]
    pub fn payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    /// Sets a structured occurrence time.
    #[must_use]
    pub fn occurred_at(mut self, at: DateTime<Utc>) -> Self {
        self.timestamp = Some(EventTimestamp::At(at));
        self
    }

    /// Sets a textual occurrence time, parsed later by the sink.
    #[must_use]
    pub fn occurred_at_raw(mut self, raw: impl Into<String>) -> Self {
        self.timestamp = Some(EventTimestamp::Raw(raw.into()));
        self
    }

    /// Turns the draft into an immutable record.
    ///
    /// `logged_at` is the sink's log time; it also serves as the fallback
    /// occurrence time.
    #[must_use]
    pub fn into_record(self, logged_at: DateTime<Utc>) -> EventRecord {
        let timestamp = self
            .timestamp
            .as_ref()
            .map_or(logged_at, |ts| ts.resolve(logged_at));
        EventRecord {
            event_id: Uuid::new_v4(),
            event_type: self.event_type,
            timestamp,
            source_type: self.source_type,
            source_id: normalize_id(self.source_id),
            robot_id: normalize_id(self.robot_id),
            user_id: normalize_id(self.user_id),
            visibility: self.visibility,
            payload: self.payload,
            logged_at,
        }
    }
}

/// Canonical string form of an optional identifier.
///
/// Blank values become `None`; UUIDs in any accepted spelling become the
/// lowercase hyphenated form; anything else is kept trimmed.
fn normalize_id(id: Option<String>) -> Option<String> {
    let id = id?;
    let trimmed = id.trim();
    if trimmed.is_empty() {
        return None;
    }
    match Uuid::parse_str(trimmed) {
        Ok(uuid) => Some(uuid.hyphenated().to_string()),
        Err(_) => Some(trimmed.to_string()),
    }
}

/// Immutable audit log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Identifier assigned by the sink. Unique across the log.
    pub event_id: Uuid,
    /// Dotted event type.
    pub event_type: String,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// Producing component.
    pub source_type: SourceType,
    /// Identifier of the producer.
    pub source_id: Option<String>,
    /// Robot the event concerns (soft reference).
    pub robot_id: Option<String>,
    /// User the event concerns (soft reference).
    pub user_id: Option<String>,
    /// Audience of the event.
    pub visibility: Visibility,
    /// Event specific data.
    pub payload: serde_json::Value,
    /// When the sink logged the event.
    pub logged_at: DateTime<Utc>,
}
