//! Live session membership per robot, with fan-out.
//!
//! [`GroupRegistry`] maps each [`RobotId`] to the set of sessions currently
//! connected to that robot. The outer map sits behind a `RwLock` and each
//! group behind its own `Mutex`, so broadcasts to different robots run in
//! parallel while broadcasts to the same robot are serialized.
//!
//! # Concurrency
//!
//! - `join` / `leave` take the outer write lock, then the group lock.
//! - `broadcast` clones the group `Arc` under the outer read lock, releases
//!   it, then holds only the group lock while it enqueues.
//! - Enqueueing uses `try_send`, so no lock is ever held across an await
//!   and a slow session can never stall a broadcast.
//! - Members are never removed during a broadcast. Closed or full mailboxes
//!   are skipped; removal happens only through `leave`.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use super::{GroupMessage, RobotId};

/// Unique identifier of one live connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(uuid::Uuid);

impl SessionId {
    /// Creates a new random `SessionId`.
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Sending half of a session's group mailbox.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    id: SessionId,
    sender: mpsc::Sender<GroupMessage>,
}

impl SessionHandle {
    /// Creates a handle for a fresh session together with its mailbox.
    ///
    /// `capacity` is clamped to at least 1.
    #[must_use]
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<GroupMessage>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let handle = Self {
            id: SessionId::new(),
            sender,
        };
        (handle, receiver)
    }

    /// Returns the session identifier.
    #[must_use]
    pub const fn id(&self) -> SessionId {
        self.id
    }
}

#[derive(Debug, Default)]
struct Group {
    members: HashMap<SessionId, SessionHandle>,
}

/// Concurrency-safe map from robot to connected sessions.
#[derive(Debug, Default)]
pub struct GroupRegistry {
    groups: RwLock<HashMap<RobotId, Arc<Mutex<Group>>>>,
}

impl GroupRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a session to the robot's group.
    ///
    /// Re-joining with the same session id replaces the previous handle.
    /// Returns `true` if the session was not already a member.
    pub fn join(&self, robot_id: RobotId, handle: SessionHandle) -> bool {
        let mut groups = write(&self.groups);
        let group = groups.entry(robot_id).or_default();
        let mut group = lock(group);
        let session_id = handle.id;
        let inserted = group.members.insert(session_id, handle).is_none();
        tracing::debug!(
            %robot_id,
            %session_id,
            members = group.members.len(),
            "session joined group"
        );
        inserted
    }

    /// Removes a session from the robot's group.
    ///
    /// Idempotent: removing an absent session is a no-op returning `false`.
    /// Empty groups are dropped from the registry.
    pub fn leave(&self, robot_id: RobotId, session_id: SessionId) -> bool {
        let mut groups = write(&self.groups);
        let Some(group) = groups.get(&robot_id) else {
            return false;
        };
        let (removed, now_empty) = {
            let mut group = lock(group);
            let removed = group.members.remove(&session_id).is_some();
            (removed, group.members.is_empty())
        };
        if now_empty {
            groups.remove(&robot_id);
        }
        if removed {
            tracing::debug!(%robot_id, %session_id, "session left group");
        }
        removed
    }

    /// Enqueues `message` for every session in the robot's group.
    ///
    /// Delivers to the members present when the group lock is taken;
    /// sessions joining afterwards do not receive it. Returns the number of
    /// mailboxes that accepted the message.
    pub fn broadcast(&self, robot_id: RobotId, message: &GroupMessage) -> usize {
        let group = {
            let groups = read(&self.groups);
            match groups.get(&robot_id) {
                Some(group) => Arc::clone(group),
                None => return 0,
            }
        };

        let group = lock(&group);
        let mut delivered = 0;
        for (session_id, handle) in &group.members {
            match handle.sender.try_send(message.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(%robot_id, %session_id, "session mailbox full, dropping message");
                }
                Err(TrySendError::Closed(_)) => {
                    tracing::debug!(%robot_id, %session_id, "session mailbox closed, skipping");
                }
            }
        }
        delivered
    }

    /// Returns the number of sessions in the robot's group.
    #[must_use]
    pub fn member_count(&self, robot_id: RobotId) -> usize {
        read(&self.groups)
            .get(&robot_id)
            .map_or(0, |group| lock(group).members.len())
    }

    /// Returns `true` if the session is currently in the robot's group.
    #[must_use]
    pub fn contains(&self, robot_id: RobotId, session_id: SessionId) -> bool {
        read(&self.groups)
            .get(&robot_id)
            .is_some_and(|group| lock(group).members.contains_key(&session_id))
    }

    /// Returns the total number of sessions across all groups.
    #[must_use]
    pub fn session_count(&self) -> usize {
        read(&self.groups)
            .values()
            .map(|group| lock(group).members.len())
            .sum()
    }

    /// Returns the number of non-empty groups.
    #[must_use]
    pub fn group_count(&self) -> usize {
        read(&self.groups).len()
    }
}

/// Group membership that ends when dropped.
///
/// Owned by a session task so that any exit path, including task
/// cancellation, removes the session from its group.
#[derive(Debug)]
pub struct GroupMembership {
    registry: Arc<GroupRegistry>,
    robot_id: RobotId,
    session_id: SessionId,
}

impl GroupMembership {
    /// Joins `handle` to the robot's group and returns the guard.
    #[must_use]
    pub fn join(registry: &Arc<GroupRegistry>, robot_id: RobotId, handle: SessionHandle) -> Self {
        let session_id = handle.id();
        registry.join(robot_id, handle);
        Self {
            registry: Arc::clone(registry),
            robot_id,
            session_id,
        }
    }

    /// Returns the member's session id.
    #[must_use]
    pub const fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Returns the robot whose group this membership belongs to.
    #[must_use]
    pub const fn robot_id(&self) -> RobotId {
        self.robot_id
    }
}

impl Drop for GroupMembership {
    fn drop(&mut self) {
        self.registry.leave(self.robot_id, self.session_id);
    }
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{ChatPayload, StatusDetails};
    use chrono::Utc;

    fn chat(text: &str, robot_id: RobotId) -> GroupMessage {
        GroupMessage::Chat(Arc::new(ChatPayload {
            sender_username: "alice".to_string(),
            text: text.to_string(),
            robot_id,
            timestamp: Utc::now(),
        }))
    }

    fn text_of(message: Option<GroupMessage>) -> String {
        match message {
            Some(GroupMessage::Chat(payload)) => payload.text.clone(),
            other => panic!("expected chat message, got {other:?}"),
        }
    }

    #[test]
    fn broadcast_to_unknown_group_delivers_nothing() {
        let registry = GroupRegistry::new();
        assert_eq!(registry.broadcast(RobotId::new(), &chat("x", RobotId::new())), 0);
    }

    #[tokio::test]
    async fn broadcast_reaches_every_member() {
        let registry = GroupRegistry::new();
        let robot = RobotId::new();
        let (a, mut rx_a) = SessionHandle::channel(8);
        let (b, mut rx_b) = SessionHandle::channel(8);
        assert!(registry.join(robot, a));
        assert!(registry.join(robot, b));

        assert_eq!(registry.broadcast(robot, &chat("hello", robot)), 2);
        assert_eq!(text_of(rx_a.recv().await), "hello");
        assert_eq!(text_of(rx_b.recv().await), "hello");
    }

    #[tokio::test]
    async fn groups_are_isolated() {
        let registry = GroupRegistry::new();
        let r1 = RobotId::new();
        let r2 = RobotId::new();
        let (a, mut rx_a) = SessionHandle::channel(8);
        let (b, mut rx_b) = SessionHandle::channel(8);
        registry.join(r1, a);
        registry.join(r2, b);

        assert_eq!(registry.broadcast(r1, &chat("only r1", r1)), 1);
        assert_eq!(text_of(rx_a.recv().await), "only r1");
        assert!(rx_b.try_recv().is_err());
    }

    #[test]
    fn leave_is_idempotent_and_drops_empty_groups() {
        let registry = GroupRegistry::new();
        let robot = RobotId::new();
        let (a, _rx) = SessionHandle::channel(8);
        let id = a.id();
        registry.join(robot, a);
        assert_eq!(registry.group_count(), 1);

        assert!(registry.leave(robot, id));
        assert!(!registry.leave(robot, id));
        assert!(!registry.leave(RobotId::new(), id));
        assert_eq!(registry.group_count(), 0);
        assert_eq!(registry.broadcast(robot, &chat("late", robot)), 0);
    }

    #[test]
    fn join_then_leave_leaves_session_absent() {
        let registry = GroupRegistry::new();
        let robot = RobotId::new();
        let (a, _rx) = SessionHandle::channel(8);
        let id = a.id();
        registry.join(robot, a);
        registry.leave(robot, id);
        assert!(!registry.contains(robot, id));
        assert_eq!(registry.member_count(robot), 0);
    }

    #[test]
    fn rejoin_replaces_existing_handle() {
        let registry = GroupRegistry::new();
        let robot = RobotId::new();
        let (a, _rx) = SessionHandle::channel(8);
        assert!(registry.join(robot, a.clone()));
        assert!(!registry.join(robot, a));
        assert_eq!(registry.member_count(robot), 1);
    }

    #[tokio::test]
    async fn closed_mailboxes_are_skipped_without_removal() {
        let registry = GroupRegistry::new();
        let robot = RobotId::new();
        let (a, rx_a) = SessionHandle::channel(8);
        let (b, mut rx_b) = SessionHandle::channel(8);
        registry.join(robot, a);
        registry.join(robot, b);
        drop(rx_a);

        assert_eq!(registry.broadcast(robot, &chat("still here", robot)), 1);
        assert_eq!(registry.member_count(robot), 2);
        assert_eq!(text_of(rx_b.recv().await), "still here");
    }

    #[test]
    fn full_mailbox_drops_message_only_for_that_session() {
        let registry = GroupRegistry::new();
        let robot = RobotId::new();
        let (slow, _rx_slow) = SessionHandle::channel(1);
        let (fast, _rx_fast) = SessionHandle::channel(8);
        registry.join(robot, slow);
        registry.join(robot, fast);

        assert_eq!(registry.broadcast(robot, &chat("1", robot)), 2);
        assert_eq!(registry.broadcast(robot, &chat("2", robot)), 1);
    }

    #[tokio::test]
    async fn members_observe_broadcast_order() {
        let registry = GroupRegistry::new();
        let robot = RobotId::new();
        let (a, mut rx_a) = SessionHandle::channel(64);
        let (b, mut rx_b) = SessionHandle::channel(64);
        registry.join(robot, a);
        registry.join(robot, b);

        for i in 0..20 {
            registry.broadcast(robot, &chat(&i.to_string(), robot));
        }
        for i in 0..20 {
            assert_eq!(text_of(rx_a.recv().await), i.to_string());
            assert_eq!(text_of(rx_b.recv().await), i.to_string());
        }
    }

    #[tokio::test]
    async fn concurrent_joins_are_not_lost() {
        let registry = Arc::new(GroupRegistry::new());
        let robot = RobotId::new();
        let mut tasks = Vec::new();
        for _ in 0..32 {
            let registry = Arc::clone(&registry);
            tasks.push(tokio::spawn(async move {
                let (handle, rx) = SessionHandle::channel(4);
                registry.join(robot, handle);
                rx
            }));
        }
        let mut receivers = Vec::new();
        for task in tasks {
            let Ok(rx) = task.await else {
                panic!("join task failed");
            };
            receivers.push(rx);
        }
        assert_eq!(registry.member_count(robot), 32);
        assert_eq!(registry.session_count(), 32);
        assert_eq!(registry.broadcast(robot, &chat("all", robot)), 32);
    }

    #[tokio::test]
    async fn status_messages_fan_out_like_chat() {
        let registry = GroupRegistry::new();
        let robot = RobotId::new();
        let (a, mut rx) = SessionHandle::channel(4);
        registry.join(robot, a);
        let status = GroupMessage::Status(Arc::new(StatusDetails {
            robot_id: Some(robot),
            status: "ONLINE".to_string(),
            message: None,
        }));
        assert_eq!(registry.broadcast(robot, &status), 1);
        let Some(GroupMessage::Status(details)) = rx.recv().await else {
            panic!("expected status message");
        };
        assert_eq!(details.status, "ONLINE");
    }

    #[test]
    fn membership_guard_leaves_on_drop() {
        let registry = Arc::new(GroupRegistry::new());
        let robot = RobotId::new();
        let (handle, _rx) = SessionHandle::channel(4);
        let membership = GroupMembership::join(&registry, robot, handle);
        let id = membership.session_id();
        assert!(registry.contains(robot, id));
        drop(membership);
        assert!(!registry.contains(robot, id));
        assert_eq!(registry.group_count(), 0);
    }
}
