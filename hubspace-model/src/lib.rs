//! Data model for hubspace collections.
//!
//! - [`CollectionSchema`] / [`FieldSchema`] / [`FieldType`]: the JSON-Schema
//!   subset a collection is declared with, plus inference from a sample
//!   document and instance validation
//! - [`IndexSpec`] / [`CollectionConfig`]: secondary index declarations and
//!   the full collection definition sent to a hub
//! - [`Document`]: one JSON object instance, keyed by `_id`
//! - [`Query`]: a composable filter expression, built with [`field`]
//!
//! These types are transport-agnostic: they serialize to the same JSON the
//! hub accepts and are evaluated identically by in-process hubs.

mod document;
mod error;
mod index;
mod query;
mod schema;

pub use document::{Document, ID_FIELD};
pub use error::{ModelError, ModelResult};
pub use index::{CollectionConfig, IndexSpec};
pub use query::{Comparison, FieldPredicate, Query, field, values_equal};
pub use schema::{CollectionSchema, FieldSchema, FieldType};
