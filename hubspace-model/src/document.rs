//! JSON documents stored as collection instances.

use crate::error::{ModelError, ModelResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Name of the identifier field every instance carries.
pub const ID_FIELD: &str = "_id";

/// A JSON object stored in a collection.
///
/// An empty or missing `_id` asks the hub to assign one on create.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(Map<String, Value>);

impl Document {
    /// Creates an empty document.
    #[must_use]
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Wraps a JSON value, which must be an object.
    pub fn from_value(value: Value) -> ModelResult<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(ModelError::InvalidDocument(format!(
                "expected a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }

    /// Serializes any `Serialize` type into a document.
    pub fn from_serializable<T: Serialize>(value: &T) -> ModelResult<Self> {
        Self::from_value(serde_json::to_value(value)?)
    }

    /// Deserializes the document into `T`.
    pub fn to_typed<T: DeserializeOwned>(&self) -> ModelResult<T> {
        Ok(serde_json::from_value(Value::Object(self.0.clone()))?)
    }

    /// Returns the `_id` when it is present and a string.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.0.get(ID_FIELD).and_then(Value::as_str)
    }

    /// Returns true if the hub should assign an `_id` (missing or empty).
    #[must_use]
    pub fn needs_id(&self) -> bool {
        match self.0.get(ID_FIELD) {
            None => true,
            Some(Value::String(s)) => s.is_empty(),
            Some(_) => false,
        }
    }

    /// Sets the `_id`.
    pub fn set_id(&mut self, id: impl Into<String>) {
        self.0.insert(ID_FIELD.to_string(), Value::String(id.into()));
    }

    /// Looks up a field by name, or by dotted path such as `address.city`.
    ///
    /// A top-level key equal to `path` wins over the dotted walk, so field
    /// names containing `.` stay addressable.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&Value> {
        if let Some(value) = self.0.get(path) {
            return Some(value);
        }
        let mut parts = path.split('.');
        let mut current = self.0.get(parts.next()?)?;
        for part in parts {
            current = current.as_object()?.get(part)?;
        }
        Some(current)
    }

    /// Inserts a top-level field, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    /// Returns true if the top-level field exists.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Number of top-level fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrows the underlying JSON object.
    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Unwraps into the underlying JSON object.
    #[must_use]
    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    /// Converts into a `Value::Object`.
    #[must_use]
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl TryFrom<Value> for Document {
    type Error = ModelError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(value)
    }
}

impl From<Map<String, Value>> for Document {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl From<Document> for Value {
    fn from(doc: Document) -> Self {
        doc.into_value()
    }
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
