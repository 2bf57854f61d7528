//! Identifier types shared across the hubspace crates.
//!
//! - [`SpaceId`]: addresses one logical database ("space") on the hub
//! - [`InstanceId`]: the `_id` the hub assigns to a document
//!
//! Both have a canonical string form (`Display`) that parses back with
//! `FromStr`, so identifiers can be handed between clients as plain text.

mod ids;

pub use ids::{InstanceId, SpaceId, SPACE_SEED_NAMESPACE};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when handling identifiers.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid space id: {0}")]
    InvalidSpaceId(#[source] uuid::Error),

    #[error("invalid instance id: {0}")]
    InvalidInstanceId(String),
}
