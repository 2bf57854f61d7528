//! Space and instance identifiers.
//!
//! Space ids are UUIDs. Random ids use v4; seeded ids use v5 under
//! [`SPACE_SEED_NAMESPACE`] so the same seed always names the same space.
//! Instance ids assigned by the hub use v7, which sorts by creation time.

use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Namespace for seed-derived space ids.
pub const SPACE_SEED_NAMESPACE: Uuid = Uuid::from_u128(0x6875_6273_7061_4365_8000_0000_7370_6163);

/// Identifier of a space (a logical database on the hub).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpaceId(Uuid);

impl SpaceId {
    /// Creates a fresh random space id.
    #[must_use]
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Derives a space id from a caller-chosen seed.
    ///
    /// Equal seeds always produce equal ids.
    #[must_use]
    pub fn from_seed(seed: &[u8]) -> Self {
        Self(Uuid::new_v5(&SPACE_SEED_NAMESPACE, seed))
    }

    /// Creates a space id from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }

    /// Returns true if this id was derived from a seed.
    #[must_use]
    pub fn is_seeded(&self) -> bool {
        self.0.get_version_num() == 5
    }

    /// Parses a space id from its canonical string form.
    pub fn parse(s: &str) -> crate::Result<Self> {
        s.parse()
    }
}

impl fmt::Display for SpaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for SpaceId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(Error::InvalidSpaceId)
    }
}

/// Identifier of a document instance inside a collection.
///
/// Callers may choose any non-empty string as `_id`; ids minted by
/// [`InstanceId::new`] are UUID v7 strings.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceId(String);

impl InstanceId {
    /// Mints a new time-ordered instance id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the id, returning the inner string.
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl Default for InstanceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for InstanceId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(Error::InvalidInstanceId("instance id is empty".to_string()));
        }
        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for InstanceId {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        if s.is_empty() {
            return Err(Error::InvalidInstanceId("instance id is empty".to_string()));
        }
        Ok(Self(s))
    }
}

impl From<InstanceId> for String {
    fn from(id: InstanceId) -> Self {
        id.0
    }
}
