use crate::document::{Document, ID_FIELD, json_kind};
use crate::error::{ModelError, ModelResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// The JSON type a schema field accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    /// A number without a fractional part.
    Integer,
    Number,
    Boolean,
    Object,
    Array,
}

impl FieldType {
    /// Returns true if `value` is of this type.
    ///
    /// `Integer` accepts any number with no fractional part, so `3.0` is an integer.
    pub fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (Self::String, Value::String(_)) => true,
            (Self::Number, Value::Number(_)) => true,
            (Self::Integer, Value::Number(n)) => {
                n.is_i64()
                    || n.is_u64()
                    || n.as_f64().is_some_and(|f| f.is_finite() && f.fract() == 0.0)
            }
            (Self::Boolean, Value::Bool(_)) => true,
            (Self::Object, Value::Object(_)) => true,
            (Self::Array, Value::Array(_)) => true,
            _ => false,
        }
    }
}

/// Schema of one field.
///
/// Serializes to the JSON-Schema keywords the hub understands:
/// `type`, `description`, `minimum`, `maximum`, `minLength`, `maxLength`,
/// `properties`, `required` and `items`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSchema {
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    /// Nested fields. Only meaningful for `Object`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, FieldSchema>,
    /// Required nested fields. Only meaningful for `Object`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    /// Element schema. Only meaningful for `Array`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<FieldSchema>>,
}

impl FieldSchema {
    pub fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            description: None,
            minimum: None,
            maximum: None,
            min_length: None,
            max_length: None,
            properties: BTreeMap::new(),
            required: Vec::new(),
            items: None,
        }
    }

    pub fn string() -> Self {
        Self::new(FieldType::String)
    }

    pub fn integer() -> Self {
        Self::new(FieldType::Integer)
    }

    pub fn number() -> Self {
        Self::new(FieldType::Number)
    }

    pub fn boolean() -> Self {
        Self::new(FieldType::Boolean)
    }

    pub fn object() -> Self {
        Self::new(FieldType::Object)
    }

    pub fn array(items: FieldSchema) -> Self {
        let mut schema = Self::new(FieldType::Array);
        schema.items = Some(Box::new(items));
        schema
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn minimum(mut self, min: f64) -> Self {
        self.minimum = Some(min);
        self
    }

    pub fn maximum(mut self, max: f64) -> Self {
        self.maximum = Some(max);
        self
    }

    pub fn min_length(mut self, len: usize) -> Self {
        self.min_length = Some(len);
        self
    }

    pub fn max_length(mut self, len: usize) -> Self {
        self.max_length = Some(len);
        self
    }

    /// Adds a nested field to an object schema.
    pub fn property(mut self, name: impl Into<String>, schema: FieldSchema) -> Self {
        self.properties.insert(name.into(), schema);
        self
    }

    /// Marks a nested field as required.
    pub fn require(mut self, name: impl Into<String>) -> Self {
        self.required.push(name.into());
        self
    }

    /// Infers a schema from an example value. Returns `None` for `null`.
    ///
    /// Only types are inferred; no bounds are read from the sample.
    pub fn infer(value: &Value) -> Option<Self> {
        let schema = match value {
            Value::Null => return None,
            Value::Bool(_) => Self::boolean(),
            Value::Number(n) if n.is_i64() || n.is_u64() => Self::integer(),
            Value::Number(_) => Self::number(),
            Value::String(_) => Self::string(),
            Value::Array(items) => {
                let mut schema = Self::new(FieldType::Array);
                schema.items = items.iter().find_map(Self::infer).map(Box::new);
                schema
            }
            Value::Object(map) => {
                let mut schema = Self::object();
                for (name, value) in map {
                    if let Some(field) = Self::infer(value) {
                        schema.properties.insert(name.clone(), field);
                    }
                }
                schema
            }
        };
        Some(schema)
    }

    fn check_definition(&self, path: &str) -> ModelResult<()> {
        if let (Some(min), Some(max)) = (self.minimum, self.maximum) {
            if min > max {
                return Err(ModelError::InvalidSchema(format!(
                    "{path}: minimum {min} exceeds maximum {max}"
                )));
            }
        }
        if let (Some(min), Some(max)) = (self.min_length, self.max_length) {
            if min > max {
                return Err(ModelError::InvalidSchema(format!(
                    "{path}: minLength {min} exceeds maxLength {max}"
                )));
            }
        }
        if (self.minimum.is_some() || self.maximum.is_some())
            && !matches!(self.field_type, FieldType::Integer | FieldType::Number)
        {
            return Err(ModelError::InvalidSchema(format!(
                "{path}: minimum/maximum only apply to numeric fields"
            )));
        }
        if (self.min_length.is_some() || self.max_length.is_some())
            && !matches!(self.field_type, FieldType::String | FieldType::Array)
        {
            return Err(ModelError::InvalidSchema(format!(
                "{path}: minLength/maxLength only apply to strings and arrays"
            )));
        }
        if self.field_type != FieldType::Object
            && (!self.properties.is_empty() || !self.required.is_empty())
        {
            return Err(ModelError::InvalidSchema(format!(
                "{path}: properties are only allowed on objects"
            )));
        }
        if self.field_type != FieldType::Array && self.items.is_some() {
            return Err(ModelError::InvalidSchema(format!(
                "{path}: items are only allowed on arrays"
            )));
        }

        for (name, nested) in &self.properties {
            nested.check_definition(&format!("{path}.{name}"))?;
        }
        if let Some(items) = &self.items {
            items.check_definition(&format!("{path}[]"))?;
        }
        Ok(())
    }

    fn validate_value(&self, path: &str, value: &Value, reasons: &mut Vec<String>) {
        if !self.field_type.matches(value) {
            reasons.push(format!(
                "{path}: expected {}, got {}",
                type_name(self.field_type),
                json_kind(value)
            ));
            return;
        }

        match value {
            Value::Number(n) => {
                let Some(n) = n.as_f64() else { return };
                if let Some(min) = self.minimum.filter(|min| n < *min) {
                    reasons.push(format!("{path}: {n} is less than minimum {min}"));
                }
                if let Some(max) = self.maximum.filter(|max| n > *max) {
                    reasons.push(format!("{path}: {n} is greater than maximum {max}"));
                }
            }
            Value::String(s) => {
                self.validate_length(path, s.chars().count(), reasons);
            }
            Value::Array(items) => {
                self.validate_length(path, items.len(), reasons);
                if let Some(item_schema) = &self.items {
                    for (i, item) in items.iter().enumerate() {
                        item_schema.validate_value(&format!("{path}[{i}]"), item, reasons);
                    }
                }
            }
            Value::Object(map) => {
                for name in &self.required {
                    if !map.contains_key(name) {
                        reasons.push(format!("{path}.{name}: required field is missing"));
                    }
                }
                for (name, nested) in &self.properties {
                    if let Some(v) = map.get(name) {
                        nested.validate_value(&format!("{path}.{name}"), v, reasons);
                    }
                }
            }
            Value::Bool(_) | Value::Null => {}
        }
    }

    fn validate_length(&self, path: &str, len: usize, reasons: &mut Vec<String>) {
        if let Some(min) = self.min_length.filter(|min| len < *min) {
            reasons.push(format!("{path}: length {len} is less than minLength {min}"));
        }
        if let Some(max) = self.max_length.filter(|max| len > *max) {
            reasons.push(format!("{path}: length {len} is greater than maxLength {max}"));
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum RootType {
    #[default]
    Object,
}

/// Schema of a collection's instances.
///
/// Every collection schema must declare `_id` as a string property.
/// Field names are stored exactly as given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionSchema {
    #[serde(rename = "$id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "$schema", default, skip_serializing_if = "Option::is_none")]
    pub dialect: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type", default)]
    root: RootType,
    #[serde(default)]
    pub required: Vec<String>,
    #[serde(default)]
    pub properties: BTreeMap<String, FieldSchema>,
}

impl Default for CollectionSchema {
    fn default() -> Self {
        Self::new()
    }
}

impl CollectionSchema {
    /// Creates an empty object schema. Add `_id` before using it.
    pub fn new() -> Self {
        Self {
            id: None,
            dialect: None,
            title: None,
            description: None,
            root: RootType::Object,
            required: Vec::new(),
            properties: BTreeMap::new(),
        }
    }

    /// Creates a schema that already declares a required string `_id`.
    pub fn with_instance_id() -> Self {
        Self::new()
            .property(ID_FIELD, FieldSchema::string().describe("The instance's id."))
            .require(ID_FIELD)
    }

    /// Parses a JSON-Schema document.
    pub fn from_json(value: Value) -> ModelResult<Self> {
        serde_json::from_value(value).map_err(|e| ModelError::InvalidSchema(e.to_string()))
    }

    /// Renders the schema as a JSON-Schema document.
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn property(mut self, name: impl Into<String>, schema: FieldSchema) -> Self {
        self.properties.insert(name.into(), schema);
        self
    }

    pub fn require(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !self.required.contains(&name) {
            self.required.push(name);
        }
        self
    }

    /// Infers a schema from a representative instance.
    ///
    /// Each non-null field maps to its JSON type; `_id` is always a required
    /// string whatever the sample holds. No bounds are inferred.
    pub fn infer(title: impl Into<String>, sample: &Value) -> ModelResult<Self> {
        let Value::Object(map) = sample else {
            return Err(ModelError::InvalidDocument(format!(
                "sample must be a JSON object, got {}",
                json_kind(sample)
            )));
        };

        let mut schema = Self::new().title(title);
        for (name, value) in map {
            if name == ID_FIELD {
                continue;
            }
            if let Some(field) = FieldSchema::infer(value) {
                schema.properties.insert(name.clone(), field);
            }
        }
        schema
            .properties
            .insert(ID_FIELD.to_string(), FieldSchema::string());
        Ok(schema.require(ID_FIELD))
    }

    /// Checks that this schema can back a collection.
    ///
    /// `_id` must be declared with type string, and every bound must be
    /// consistent with its field type.
    pub fn check_definition(&self) -> ModelResult<()> {
        match self.properties.get(ID_FIELD) {
            None => {
                return Err(ModelError::InvalidSchema(
                    "schema must declare an `_id` property".to_string(),
                ));
            }
            Some(id) if id.field_type != FieldType::String => {
                return Err(ModelError::InvalidSchema(format!(
                    "`_id` must be a string, not {}",
                    type_name(id.field_type)
                )));
            }
            Some(_) => {}
        }

        for (name, field) in &self.properties {
            field.check_definition(name)?;
        }
        Ok(())
    }

    /// Returns a copy with `_id` listed as required.
    pub fn with_required_id(self) -> Self {
        self.require(ID_FIELD)
    }

    /// Validates an instance, collecting every violation.
    pub fn validate(&self, doc: &Document) -> ModelResult<()> {
        let mut reasons = Vec::new();

        for name in &self.required {
            if !doc.contains(name) {
                reasons.push(format!("{name}: required field is missing"));
            }
        }
        for (name, field) in &self.properties {
            if let Some(value) = doc.as_map().get(name) {
                field.validate_value(name, value, &mut reasons);
            }
        }

        if reasons.is_empty() {
            Ok(())
        } else {
            Err(ModelError::SchemaViolation {
                instance: doc.id().unwrap_or_default().to_string(),
                reasons,
            })
        }
    }
}

fn type_name(t: FieldType) -> &'static str {
    match t {
        FieldType::String => "string",
        FieldType::Integer => "integer",
        FieldType::Number => "number",
        FieldType::Boolean => "boolean",
        FieldType::Object => "object",
        FieldType::Array => "array",
    }
}
