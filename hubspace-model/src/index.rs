//! Index declarations and the collection configuration that carries them.

use crate::schema::CollectionSchema;
use serde::{Deserialize, Serialize};

/// Index over one field path of a collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexSpec {
    /// Field name or dotted path the index covers.
    #[serde(rename = "path")]
    pub field: String,
    /// No two instances may share a value at this path.
    #[serde(default)]
    pub unique: bool,
}

impl IndexSpec {
    /// A non-unique index on `field`.
    #[must_use]
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            unique: false,
        }
    }

    /// A unique index on `field`.
    #[must_use]
    pub fn unique(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            unique: true,
        }
    }
}

/// Name, schema and indexes of a collection.
///
/// Used both to create or update a collection and to describe an existing one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionConfig {
    pub name: String,
    pub schema: CollectionSchema,
    #[serde(default)]
    pub indexes: Vec<IndexSpec>,
}

impl CollectionConfig {
    /// A configuration with no indexes.
    #[must_use]
    pub fn new(name: impl Into<String>, schema: CollectionSchema) -> Self {
        Self {
            name: name.into(),
            schema,
            indexes: Vec::new(),
        }
    }

    /// Adds an index declaration.
    #[must_use]
    pub fn index(mut self, index: IndexSpec) -> Self {
        self.indexes.push(index);
        self
    }

    /// Unique indexes, in declaration order.
    pub fn unique_indexes(&self) -> impl Iterator<Item = &IndexSpec> {
        self.indexes.iter().filter(|i| i.unique)
    }
}
