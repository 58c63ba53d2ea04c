//! Type-safe robot identifier.
//!
//! [`RobotId`] is a newtype wrapper around [`uuid::Uuid`] so that robot
//! identifiers cannot be confused with user or event UUIDs. It is the key
//! of a robot's group in [`super::GroupRegistry`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Byte offsets of the hyphens in a canonical 8-4-4-4-12 UUID string.
const HYPHEN_POSITIONS: [usize; 4] = [8, 13, 18, 23];

/// Length of a canonical hyphenated UUID string.
const CANONICAL_LEN: usize = 36;

/// Identifier of a robot instance.
///
/// Only the canonical hyphenated form (`8-4-4-4-12` hex groups, either
/// case) is accepted when parsing from text; simple, braced and URN
/// spellings are rejected. Display always renders lowercase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RobotId(uuid::Uuid);

impl RobotId {
    /// Creates a new random `RobotId` (UUID v4).
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Creates a `RobotId` from an existing [`uuid::Uuid`].
    #[must_use]
    pub const fn from_uuid(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner [`uuid::Uuid`].
    #[must_use]
    pub const fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }

    /// Parses the canonical `8-4-4-4-12` hexadecimal form.
    ///
    /// Returns `None` for any other shape.
    #[must_use]
    pub fn parse_canonical(s: &str) -> Option<Self> {
        if s.len() != CANONICAL_LEN {
            return None;
        }
        let well_formed = s.char_indices().all(|(i, c)| {
            if HYPHEN_POSITIONS.contains(&i) {
                c == '-'
            } else {
                c.is_ascii_hexdigit()
            }
        });
        if !well_formed {
            return None;
        }
        uuid::Uuid::parse_str(s).ok().map(Self)
    }
}

impl Default for RobotId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RobotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error returned when a string is not a canonical robot identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("not a canonical robot identifier: {0}")]
pub struct InvalidRobotId(pub String);

impl FromStr for RobotId {
    type Err = InvalidRobotId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_canonical(s).ok_or_else(|| InvalidRobotId(s.to_string()))
    }
}

impl From<uuid::Uuid> for RobotId {
    fn from(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }
}

impl From<RobotId> for uuid::Uuid {
    fn from(id: RobotId) -> Self {
        id.0
    }
}
