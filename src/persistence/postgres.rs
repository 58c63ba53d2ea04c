//! PostgreSQL implementation of the event log.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::EventLogStore;
use crate::domain::EventRecord;
use crate::error::RelayError;

/// PostgreSQL-backed event log using `sqlx::PgPool`.
///
/// Rows go to the `event_log` table created by the bundled migrations.
/// `robot_id` and `user_id` are UUID columns without foreign keys: they
/// are soft references that outlive the entities they name.
#[derive(Debug, Clone)]
pub struct PostgresEventLog {
    pool: PgPool,
}

impl PostgresEventLog {
    /// Creates an event log over the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns the number of stored events.
    ///
    /// # Errors
    ///
    /// Returns a [`RelayError::Persistence`] on database failure.
    pub async fn count(&self) -> Result<i64, RelayError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM event_log")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

/// Parses a soft-reference column value.
fn uuid_column(column: &str, value: Option<&str>) -> Result<Option<Uuid>, RelayError> {
    value
        .map(|raw| {
            Uuid::parse_str(raw)
                .map_err(|_| RelayError::Persistence(format!("{column} is not a UUID: {raw}")))
        })
        .transpose()
}

#[async_trait]
impl EventLogStore for PostgresEventLog {
    async fn append(&self, record: &EventRecord) -> Result<(), RelayError> {
        let robot_id = uuid_column("robot_id", record.robot_id.as_deref())?;
        let user_id = uuid_column("user_id", record.user_id.as_deref())?;

        sqlx::query(
            "INSERT INTO event_log \
             (event_id, event_type, occurred_at, source_type, source_id, robot_id, user_id, visibility, payload, logged_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(record.event_id)
        .bind(&record.event_type)
        .bind(record.timestamp)
        .bind(record.source_type.as_str())
        .bind(record.source_id.as_deref())
        .bind(robot_id)
        .bind(user_id)
        .bind(record.visibility.as_str())
        .bind(&record.payload)
        .bind(record.logged_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
