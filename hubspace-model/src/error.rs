//! Error types for the data model.

use thiserror::Error;

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised while building or checking schemas and documents.
#[derive(Debug, Error)]
pub enum ModelError {
    /// The schema itself is not acceptable for a collection.
    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    /// A document does not conform to its collection's schema.
    #[error("instance {instance} violates schema: {}", .reasons.join("; "))]
    SchemaViolation {
        instance: String,
        reasons: Vec<String>,
    },

    /// A value that should be a JSON object is not one.
    #[error("invalid document: {0}")]
    InvalidDocument(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
