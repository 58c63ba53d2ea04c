//! Bounded in-memory event log.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use super::EventLogStore;
use crate::domain::EventRecord;
use crate::error::RelayError;

/// Keeps the most recent `capacity` records in insertion order.
///
/// Used when persistence is disabled and in tests.
#[derive(Debug)]
pub struct InMemoryEventLog {
    records: Mutex<VecDeque<EventRecord>>,
    capacity: usize,
}

impl InMemoryEventLog {
    /// Creates a log retaining at most `capacity` records (at least 1).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            records: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity,
        }
    }

    /// Returns a snapshot of the retained records, oldest first.
    #[must_use]
    pub fn records(&self) -> Vec<EventRecord> {
        self.lock().iter().cloned().collect()
    }

    /// Returns the retained records that reference the given robot.
    #[must_use]
    pub fn records_for_robot(&self, robot_id: &str) -> Vec<EventRecord> {
        self.lock()
            .iter()
            .filter(|record| record.robot_id.as_deref() == Some(robot_id))
            .cloned()
            .collect()
    }

    /// Returns the number of retained records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` if no records are retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<EventRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl EventLogStore for InMemoryEventLog {
    async fn append(&self, record: &EventRecord) -> Result<(), RelayError> {
        let mut records = self.lock();
        if records.len() == self.capacity {
            records.pop_front();
        }
        records.push_back(record.clone());
        Ok(())
    }
}
