//! Persistence layer: the append-only audit event log.
//!
//! [`EventLogStore`] is the seam between the event sink and storage.
//! [`PostgresEventLog`] is the production store; [`InMemoryEventLog`]
//! keeps a bounded window of records for development and tests.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::domain::EventRecord;
use crate::error::RelayError;

pub use memory::InMemoryEventLog;
pub use postgres::PostgresEventLog;

/// Append-only storage for [`EventRecord`]s.
///
/// Implementations must tolerate concurrent callers.
#[async_trait]
pub trait EventLogStore: Send + Sync + std::fmt::Debug {
    /// Appends one record. Records are never updated or deleted.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Persistence`] if the record cannot be stored.
    async fn append(&self, record: &EventRecord) -> Result<(), RelayError>;
}
