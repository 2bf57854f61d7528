//! Error types for identities and credentials.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Result type for crypto operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors that can occur while handling identities and credentials.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Serialized identity or public key could not be decoded.
    #[error("malformed identity: {0}")]
    MalformedIdentity(String),

    /// A required credential input was empty or absent.
    #[error("missing credential: {0} is required")]
    MissingCredential(&'static str),

    /// A signed credential was used after its expiration.
    #[error("credential expired at {expired_at}")]
    CredentialExpired { expired_at: DateTime<Utc> },

    /// Signature did not verify.
    #[error("signature verification failed")]
    InvalidSignature,

    /// Time-to-live could not be represented.
    #[error("invalid credential ttl: {0}")]
    InvalidTtl(String),
}
