//! Fire-and-forget audit event bus.
//!
//! [`EventBus`] is the publisher side: a cloneable handle around a bounded
//! [`tokio::sync::mpsc`] queue. [`EventSink`] is the single consumer that
//! turns each [`EventDraft`] into an [`EventRecord`], appends it to an
//! [`EventLogStore`], and re-broadcasts appended records on a
//! [`tokio::sync::broadcast`] channel for in-process observers.
//!
//! Publishing never blocks and never fails from the caller's point of
//! view. A full queue drops the event; a failed append is logged and the
//! event is lost.

use std::sync::Arc;

use chrono::{DateTime, SubsecRound, Utc};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use super::{EventDraft, EventRecord};
use crate::persistence::EventLogStore;

/// Capacity of the appended-record broadcast channel.
const LOGGED_CHANNEL_CAPACITY: usize = 1024;

/// Publisher handle for audit events.
///
/// Constructed once at startup and cloned into every publisher.
#[derive(Debug, Clone)]
pub struct EventBus {
    queue: mpsc::Sender<EventDraft>,
    logged: broadcast::Sender<EventRecord>,
}

impl EventBus {
    /// Creates the bus and its sink. The sink must be driven with
    /// [`EventSink::run`] for events to reach the store.
    ///
    /// `capacity` bounds the number of queued drafts (clamped to at least 1).
    #[must_use]
    pub fn new(capacity: usize, store: Arc<dyn EventLogStore>) -> (Self, EventSink) {
        let (queue, drafts) = mpsc::channel(capacity.max(1));
        let (logged, _) = broadcast::channel(LOGGED_CHANNEL_CAPACITY);
        let sink = EventSink {
            drafts,
            store,
            logged: logged.clone(),
            last_logged_at: None,
        };
        (Self { queue, logged }, sink)
    }

    /// Creates the bus and spawns its sink on the current runtime.
    ///
    /// The sink task finishes once every clone of the bus is dropped and the
    /// queue has drained.
    #[must_use]
    pub fn spawn(capacity: usize, store: Arc<dyn EventLogStore>) -> (Self, JoinHandle<()>) {
        let (bus, sink) = Self::new(capacity, store);
        let handle = tokio::spawn(sink.run());
        (bus, handle)
    }

    /// Hands an event to the sink.
    ///
    /// Returns `true` if the event was queued. A `false` return is
    /// informational only; the event has already been dropped and logged.
    pub fn publish(&self, draft: EventDraft) -> bool {
        match self.queue.try_send(draft) {
            Ok(()) => true,
            Err(TrySendError::Full(draft)) => {
                tracing::warn!(event_type = %draft.event_type, "event bus queue full, dropping event");
                false
            }
            Err(TrySendError::Closed(draft)) => {
                tracing::warn!(event_type = %draft.event_type, "event sink stopped, dropping event");
                false
            }
        }
    }

    /// Creates a receiver for records appended after this call.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<EventRecord> {
        self.logged.subscribe()
    }
}

/// Consumer half of the bus: owns the store and assigns log times.
#[derive(Debug)]
pub struct EventSink {
    drafts: mpsc::Receiver<EventDraft>,
    store: Arc<dyn EventLogStore>,
    logged: broadcast::Sender<EventRecord>,
    last_logged_at: Option<DateTime<Utc>>,
}

impl EventSink {
    /// Processes drafts until every publisher is gone.
    pub async fn run(mut self) {
        while let Some(draft) = self.drafts.recv().await {
            self.log(draft).await;
        }
        tracing::debug!("event sink stopped");
    }

    async fn log(&mut self, draft: EventDraft) {
        let logged_at = self.next_log_time();
        let record = draft.into_record(logged_at);
        match self.store.append(&record).await {
            Ok(()) => {
                tracing::debug!(
                    event_id = %record.event_id,
                    event_type = %record.event_type,
                    source_type = record.source_type.as_str(),
                    robot_id = record.robot_id.as_deref(),
                    visibility = record.visibility.as_str(),
                    "event logged"
                );
                let _ = self.logged.send(record);
            }
            Err(err) => {
                tracing::error!(
                    event_id = %record.event_id,
                    event_type = %record.event_type,
                    error = %err,
                    "failed to log event"
                );
            }
        }
    }

    /// Returns a log time strictly later than the previous one, at the
    /// microsecond resolution of the store.
    fn next_log_time(&mut self) -> DateTime<Utc> {
        let now = Utc::now().trunc_subsecs(6);
        let at = match self.last_logged_at {
            Some(last) if now <= last => last + chrono::Duration::microseconds(1),
            _ => now,
        };
        self.last_logged_at = Some(at);
        at
    }
}
