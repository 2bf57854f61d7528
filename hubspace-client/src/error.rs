//! Client error types.

use hubspace_crypto::CryptoError;
use hubspace_model::ModelError;
use thiserror::Error;

/// Result type for hub operations.
pub type HubResult<T> = Result<T, HubError>;

/// Errors surfaced by sessions, spaces, collections and transports.
#[derive(Debug, Error)]
pub enum HubError {
    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    #[error("instance {instance:?} violates schema: {}", .reasons.join("; "))]
    SchemaViolation {
        instance: String,
        reasons: Vec<String>,
    },

    /// The hub answered with something this client cannot interpret.
    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("crypto error: {0}")]
    Crypto(#[source] CryptoError),

    #[error("model error: {0}")]
    Model(#[source] ModelError),
}

impl HubError {
    /// Returns true for transient failures a caller may retry.
    ///
    /// The client itself never retries these.
    pub fn is_retryable(&self) -> bool {
        matches!(self, HubError::Network(_))
    }

    /// Returns true if the hub rejected the credential or token.
    pub fn is_auth(&self) -> bool {
        matches!(self, HubError::Authentication(_))
    }
}

impl From<CryptoError> for HubError {
    fn from(e: CryptoError) -> Self {
        match e {
            CryptoError::CredentialExpired { .. } | CryptoError::InvalidSignature => {
                HubError::Authentication(e.to_string())
            }
            other => HubError::Crypto(other),
        }
    }
}

impl From<ModelError> for HubError {
    fn from(e: ModelError) -> Self {
        match e {
            ModelError::InvalidSchema(msg) => HubError::InvalidSchema(msg),
            ModelError::SchemaViolation { instance, reasons } => {
                HubError::SchemaViolation { instance, reasons }
            }
            ModelError::Serialization(e) => HubError::Serialization(e),
            other => HubError::Model(other),
        }
    }
}
