//! Ownership lookup against the CRUD layer's `robots` table.

use async_trait::async_trait;
use sqlx::PgPool;

use super::AccessOracle;
use crate::domain::{Principal, RobotId};
use crate::error::RelayError;

/// Grants access to the owner of a robot.
#[derive(Debug, Clone)]
pub struct PostgresAccessOracle {
    pool: PgPool,
}

impl PostgresAccessOracle {
    /// Creates an oracle over the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccessOracle for PostgresAccessOracle {
    async fn can_access(&self, principal: &Principal, robot_id: RobotId) -> Result<bool, RelayError> {
        let owned = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM robots WHERE id = $1 AND owner_id = $2)",
        )
        .bind(*robot_id.as_uuid())
        .bind(principal.user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(owned)
    }
}
