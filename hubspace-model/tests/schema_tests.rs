use hubspace_model::{CollectionSchema, Document, FieldSchema, FieldType, ModelError};
use pretty_assertions::assert_eq;
use serde_json::json;

fn doc(value: serde_json::Value) -> Document {
    Document::from_value(value).unwrap()
}

fn post_schema() -> CollectionSchema {
    CollectionSchema::with_instance_id()
        .title("Post")
        .property("title", FieldSchema::string().min_length(1).max_length(120))
        .property("score", FieldSchema::integer().minimum(0.0).maximum(100.0))
        .property("tags", FieldSchema::array(FieldSchema::string()))
        .require("title")
}

// ── FieldType ────────────────────────────────────────────────────

#[test]
fn field_type_matches_json_kinds() {
    assert!(FieldType::String.matches(&json!("x")));
    assert!(FieldType::Number.matches(&json!(1.5)));
    assert!(FieldType::Number.matches(&json!(2)));
    assert!(FieldType::Boolean.matches(&json!(false)));
    assert!(FieldType::Object.matches(&json!({})));
    assert!(FieldType::Array.matches(&json!([])));
    assert!(!FieldType::String.matches(&json!(null)));
}

#[test]
fn integer_accepts_whole_floats_only() {
    assert!(FieldType::Integer.matches(&json!(3)));
    assert!(FieldType::Integer.matches(&json!(-3)));
    assert!(FieldType::Integer.matches(&json!(3.0)));
    assert!(!FieldType::Integer.matches(&json!(3.5)));
    assert!(!FieldType::Integer.matches(&json!("3")));
}

#[test]
fn field_type_serializes_lowercase() {
    assert_eq!(serde_json::to_value(FieldType::Integer).unwrap(), json!("integer"));
    assert_eq!(
        serde_json::from_value::<FieldType>(json!("boolean")).unwrap(),
        FieldType::Boolean
    );
}

// ── Definition checks ────────────────────────────────────────────

#[test]
fn schema_without_id_is_invalid() {
    let schema = CollectionSchema::new().property("name", FieldSchema::string());
    assert!(matches!(
        schema.check_definition(),
        Err(ModelError::InvalidSchema(_))
    ));
}

#[test]
fn schema_with_non_string_id_is_invalid() {
    let schema = CollectionSchema::new().property("_id", FieldSchema::integer());
    let err = schema.check_definition().unwrap_err();
    assert!(err.to_string().contains("`_id` must be a string"));
}

#[test]
fn inverted_bounds_are_invalid() {
    let schema = CollectionSchema::with_instance_id()
        .property("age", FieldSchema::integer().minimum(10.0).maximum(1.0));
    assert!(matches!(
        schema.check_definition(),
        Err(ModelError::InvalidSchema(_))
    ));

    let schema = CollectionSchema::with_instance_id()
        .property("name", FieldSchema::string().min_length(5).max_length(2));
    assert!(schema.check_definition().is_err());
}

#[test]
fn bounds_must_fit_field_type() {
    let schema =
        CollectionSchema::with_instance_id().property("name", FieldSchema::string().minimum(0.0));
    assert!(schema.check_definition().is_err());

    let schema =
        CollectionSchema::with_instance_id().property("flag", FieldSchema::boolean().max_length(3));
    assert!(schema.check_definition().is_err());
}

#[test]
fn nested_definitions_are_checked() {
    let address = FieldSchema::object()
        .property("zip", FieldSchema::integer().minimum(9.0).maximum(0.0));
    let schema = CollectionSchema::with_instance_id().property("address", address);
    let err = schema.check_definition().unwrap_err();
    assert!(err.to_string().contains("address.zip"));
}

#[test]
fn well_formed_schema_passes_definition_check() {
    assert!(post_schema().check_definition().is_ok());
}

#[test]
fn require_does_not_duplicate() {
    let schema = CollectionSchema::with_instance_id().require("_id").with_required_id();
    assert_eq!(schema.required, vec!["_id".to_string()]);
}

// ── JSON form ────────────────────────────────────────────────────

#[test]
fn schema_renders_json_schema_keywords() {
    let schema = CollectionSchema::with_instance_id()
        .title("Person")
        .property("name", FieldSchema::string().max_length(40))
        .property("age", FieldSchema::integer().minimum(0.0));

    let json = schema.to_json();
    assert_eq!(json["type"], json!("object"));
    assert_eq!(json["title"], json!("Person"));
    assert_eq!(json["required"], json!(["_id"]));
    assert_eq!(json["properties"]["name"]["maxLength"], json!(40));
    assert_eq!(json["properties"]["age"]["minimum"], json!(0.0));
    assert!(json["properties"]["age"].get("maximum").is_none());
}

#[test]
fn schema_parses_from_json() {
    let schema = CollectionSchema::from_json(json!({
        "$id": "https://example.com/person.schema.json",
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": "Person",
        "type": "object",
        "required": ["_id"],
        "properties": {
            "_id": { "type": "string" },
            "createdAd": { "type": "string", "description": "kept as written" },
            "age": { "type": "integer", "minimum": 0 }
        }
    }))
    .unwrap();

    assert_eq!(schema.id.as_deref(), Some("https://example.com/person.schema.json"));
    assert!(schema.properties.contains_key("createdAd"));
    assert!(!schema.properties.contains_key("createdAt"));
    assert_eq!(schema.properties["age"].minimum, Some(0.0));
    assert!(schema.check_definition().is_ok());
}

#[test]
fn schema_with_non_object_root_is_rejected() {
    let err =
        CollectionSchema::from_json(json!({ "type": "array", "properties": {} })).unwrap_err();
    assert!(matches!(err, ModelError::InvalidSchema(_)));
}

// ── Validation ───────────────────────────────────────────────────

#[test]
fn valid_instance_passes() {
    let post = doc(json!({ "_id": "p1", "title": "Hello", "score": 10, "tags": ["a", "b"] }));
    assert!(post_schema().validate(&post).is_ok());
}

#[test]
fn missing_required_field_is_reported() {
    let post = doc(json!({ "_id": "p1" }));
    let err = post_schema().validate(&post).unwrap_err();
    match err {
        ModelError::SchemaViolation { instance, reasons } => {
            assert_eq!(instance, "p1");
            assert_eq!(reasons, vec!["title: required field is missing".to_string()]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn every_violation_is_collected() {
    let post = doc(json!({ "_id": "p2", "title": "", "score": 101, "tags": ["ok", 7] }));
    let err = post_schema().validate(&post).unwrap_err();
    let ModelError::SchemaViolation { reasons, .. } = err else {
        panic!("expected schema violation");
    };
    assert_eq!(reasons.len(), 3);
    assert!(reasons.iter().any(|r| r.starts_with("title: length 0")));
    assert!(reasons.iter().any(|r| r.starts_with("score: 101")));
    assert!(reasons.iter().any(|r| r.starts_with("tags[1]: expected string")));
}

#[test]
fn wrong_type_is_reported() {
    let post = doc(json!({ "_id": "p3", "title": 42 }));
    let err = post_schema().validate(&post).unwrap_err();
    assert!(err.to_string().contains("title: expected string, got number"));
}

#[test]
fn non_string_id_violates_schema() {
    let post = doc(json!({ "_id": 7, "title": "x" }));
    assert!(matches!(
        post_schema().validate(&post),
        Err(ModelError::SchemaViolation { .. })
    ));
}

#[test]
fn undeclared_fields_are_allowed() {
    let post = doc(json!({ "_id": "p4", "title": "x", "extra": { "anything": true } }));
    assert!(post_schema().validate(&post).is_ok());
}

#[test]
fn negative_age_violates_minimum() {
    let schema = CollectionSchema::with_instance_id()
        .property("age", FieldSchema::integer().minimum(0.0));
    let person = doc(json!({ "_id": "", "age": -1 }));
    let err = schema.validate(&person).unwrap_err();
    assert!(err.to_string().contains("less than minimum 0"));
}

#[test]
fn nested_object_validation_uses_dotted_paths() {
    let schema = CollectionSchema::with_instance_id().property(
        "author",
        FieldSchema::object()
            .property("name", FieldSchema::string())
            .require("name"),
    );
    let post = doc(json!({ "_id": "p5", "author": {} }));
    let err = schema.validate(&post).unwrap_err();
    assert!(err.to_string().contains("author.name: required field is missing"));
}

// ── Inference ────────────────────────────────────────────────────

#[test]
fn infer_from_sample_document() {
    let sample = json!({
        "_id": "",
        "name": "Madonna",
        "age": 65,
        "height": 1.63,
        "active": true,
        "albums": ["Like a Virgin"],
        "label": { "name": "Sire", "founded": 1966 },
        "agent": null
    });
    let schema = CollectionSchema::infer("Person", &sample).unwrap();

    assert_eq!(schema.title.as_deref(), Some("Person"));
    assert_eq!(schema.required, vec!["_id".to_string()]);
    assert_eq!(schema.properties["_id"].field_type, FieldType::String);
    assert_eq!(schema.properties["name"].field_type, FieldType::String);
    assert_eq!(schema.properties["age"].field_type, FieldType::Integer);
    assert_eq!(schema.properties["age"].minimum, None);
    assert_eq!(schema.properties["height"].field_type, FieldType::Number);
    assert_eq!(schema.properties["active"].field_type, FieldType::Boolean);
    assert_eq!(
        schema.properties["albums"].items.as_deref().map(|i| i.field_type),
        Some(FieldType::String)
    );
    assert_eq!(
        schema.properties["label"].properties["founded"].field_type,
        FieldType::Integer
    );
    assert!(!schema.properties.contains_key("agent"));
    assert!(schema.check_definition().is_ok());
}

#[test]
fn inferred_schema_accepts_its_sample() {
    let sample = json!({ "_id": "", "name": "Madonna", "age": 65 });
    let schema = CollectionSchema::infer("Person", &sample).unwrap();
    assert!(schema.validate(&doc(sample)).is_ok());
}

#[test]
fn infer_forces_string_id() {
    let schema = CollectionSchema::infer("Thing", &json!({ "_id": 12 })).unwrap();
    assert_eq!(schema.properties["_id"].field_type, FieldType::String);
}

#[test]
fn infer_rejects_non_object_sample() {
    assert!(matches!(
        CollectionSchema::infer("Bad", &json!([1, 2])),
        Err(ModelError::InvalidDocument(_))
    ));
}
