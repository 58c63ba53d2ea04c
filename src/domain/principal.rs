//! Authenticated principal attached to requests by the auth middleware.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An authenticated user as resolved by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Principal {
    /// Stable user identifier.
    pub user_id: Uuid,
    /// Display name shown to other participants.
    pub username: String,
}

impl Principal {
    /// Creates a principal from its parts.
    #[must_use]
    pub fn new(user_id: Uuid, username: impl Into<String>) -> Self {
        Self {
            user_id,
            username: username.into(),
        }
    }
}
