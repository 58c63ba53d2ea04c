//! Access Oracle: may a principal operate on a robot?
//!
//! Robot ownership lives with the CRUD layer. The relay only asks the
//! question through [`AccessOracle`] and never distinguishes "denied" from
//! "no such robot".

pub mod grants;
pub mod postgres;

use async_trait::async_trait;

use crate::domain::{Principal, RobotId};
use crate::error::RelayError;

pub use grants::StaticAccessOracle;
pub use postgres::PostgresAccessOracle;

/// Authorization decision for robot access.
#[async_trait]
pub trait AccessOracle: Send + Sync + std::fmt::Debug {
    /// Returns `true` if `principal` may operate on `robot_id`.
    ///
    /// `false` covers both a robot owned by someone else and a robot that
    /// does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Persistence`] if the backing store fails.
    async fn can_access(&self, principal: &Principal, robot_id: RobotId) -> Result<bool, RelayError>;
}
