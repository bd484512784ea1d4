use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Opaque identity assigned to one relay connection.
///
/// Backed by a ULID and rendered in its canonical 26-character form.
///
/// # Examples
/// ```
/// let id = relay_common::PeerId::generate();
/// assert_eq!(id.to_string().len(), 26);
/// assert!(!id.is_system());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerId(Ulid);

impl PeerId {
    /// The nil identity. Used as the sender of relay-originated messages so
    /// that no connected peer is excluded from a broadcast.
    pub const SYSTEM: PeerId = PeerId(Ulid(0));

    /// Generates a fresh identity.
    pub fn generate() -> Self {
        Self(Ulid::new())
    }

    pub fn is_system(&self) -> bool {
        *self == Self::SYSTEM
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Returned when a string is not a valid peer identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidPeerId(pub String);

impl fmt::Display for InvalidPeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid peer id: {:?}", self.0)
    }
}

impl std::error::Error for InvalidPeerId {}

impl FromStr for PeerId {
    type Err = InvalidPeerId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ulid::from_string(s.trim())
            .map(PeerId)
            .map_err(|_| InvalidPeerId(s.to_string()))
    }
}
