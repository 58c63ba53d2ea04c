//! Static, in-memory access grants.

use std::collections::HashSet;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use uuid::Uuid;

use super::AccessOracle;
use crate::domain::{Principal, RobotId};
use crate::error::RelayError;

/// Oracle backed by a fixed set of `(user, robot)` pairs.
///
/// Used when persistence is disabled and in tests. Grants can be added at
/// runtime.
#[derive(Debug, Default)]
pub struct StaticAccessOracle {
    grants: RwLock<HashSet<(Uuid, RobotId)>>,
}

impl StaticAccessOracle {
    /// Creates an oracle that denies everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an oracle from pre-existing grants.
    #[must_use]
    pub fn with_grants(grants: impl IntoIterator<Item = (Uuid, RobotId)>) -> Self {
        Self {
            grants: RwLock::new(grants.into_iter().collect()),
        }
    }

    /// Parses `user_uuid:robot_uuid` pairs separated by commas.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::InvalidRequest`] naming the first malformed pair.
    pub fn parse(spec: &str) -> Result<Self, RelayError> {
        let mut grants = HashSet::new();
        for pair in spec.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let parsed = pair.split_once(':').and_then(|(user, robot)| {
                let user = Uuid::parse_str(user.trim()).ok()?;
                let robot = RobotId::parse_canonical(robot.trim())?;
                Some((user, robot))
            });
            let Some(grant) = parsed else {
                return Err(RelayError::InvalidRequest(format!(
                    "malformed access grant: {pair}"
                )));
            };
            grants.insert(grant);
        }
        Ok(Self::with_grants(grants))
    }

    /// Lets `user_id` operate on `robot_id`.
    pub fn grant(&self, user_id: Uuid, robot_id: RobotId) {
        self.grants
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((user_id, robot_id));
    }

    /// Returns the number of grants.
    #[must_use]
    pub fn len(&self) -> usize {
        self.grants.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Returns `true` if there are no grants.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl AccessOracle for StaticAccessOracle {
    async fn can_access(&self, principal: &Principal, robot_id: RobotId) -> Result<bool, RelayError> {
        Ok(self
            .grants
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&(principal.user_id, robot_id)))
    }
}
