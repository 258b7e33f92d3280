//! Generic validator for [`Schema`] descriptors

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{FieldSpec, FieldType, Schema};

/// First failing field found while validating a value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{field}: expected {expected}, got {actual}")]
pub struct ValidationError {
    /// Field path (e.g. `symptoms[1]`, `$` for the value itself)
    pub field: String,

    /// What the schema declares
    pub expected: String,

    /// What was found
    pub actual: String,
}

impl ValidationError {
    pub fn new(
        field: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}

/// Validate `value` against `schema`, handing the value back untouched on
/// success.
pub fn validate(schema: &Schema, value: Value) -> Result<Value, ValidationError> {
    schema.check(&value)?;
    Ok(value)
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn join(path: &str, name: &str) -> String {
    if path.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", path, name)
    }
}

pub(super) fn check_object(
    schema: &Schema,
    path: &str,
    value: &Value,
) -> Result<(), ValidationError> {
    let here = if path.is_empty() { "$" } else { path };
    let Some(object) = value.as_object() else {
        return Err(ValidationError::new(
            here,
            format!("object<{}>", schema.name()),
            kind_of(value),
        ));
    };

    for (name, spec) in schema.fields() {
        let field_path = join(path, name);
        match object.get(name) {
            None if spec.required => {
                return Err(ValidationError::new(
                    field_path,
                    spec.field_type.type_name(),
                    "missing",
                ));
            }
            Some(Value::Null) if spec.required => {
                return Err(ValidationError::new(
                    field_path,
                    spec.field_type.type_name(),
                    "null",
                ));
            }
            None | Some(Value::Null) => {}
            Some(field_value) => check_field(spec, &field_path, field_value)?,
        }
    }

    if schema.is_strict() {
        if let Some(unknown) = object.keys().find(|key| schema.get(key).is_none()) {
            return Err(ValidationError::new(
                join(path, unknown),
                "no such field",
                kind_of(&object[unknown]),
            ));
        }
    }

    Ok(())
}

fn check_field(spec: &FieldSpec, path: &str, value: &Value) -> Result<(), ValidationError> {
    check_type(&spec.field_type, path, value)?;

    if let Value::String(s) = value {
        if let Some(min) = spec.min_length {
            let len = s.chars().count();
            if len < min {
                return Err(ValidationError::new(
                    path,
                    format!("string of at least {} characters", min),
                    format!("string of {} characters", len),
                ));
            }
        }
        if spec.non_blank && s.trim().is_empty() {
            return Err(ValidationError::new(
                path,
                "non-blank string",
                "blank string",
            ));
        }
    }

    Ok(())
}

fn check_type(field_type: &FieldType, path: &str, value: &Value) -> Result<(), ValidationError> {
    let matches = match (field_type, value) {
        (FieldType::String, Value::String(_)) => true,
        (FieldType::Number, Value::Number(_)) => true,
        (FieldType::Boolean, Value::Bool(_)) => true,
        (FieldType::Array(element), Value::Array(items)) => {
            for (i, item) in items.iter().enumerate() {
                check_type(element, &format!("{}[{}]", path, i), item)?;
            }
            true
        }
        (FieldType::Object(schema), Value::Object(_)) => {
            check_object(schema, path, value)?;
            true
        }
        _ => false,
    };

    if matches {
        Ok(())
    } else {
        Err(ValidationError::new(path, field_type.type_name(), kind_of(value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn analysis_schema() -> Schema {
        Schema::object("SymptomAnalysisInput")
            .field("symptoms", FieldSpec::array(FieldType::String))
            .field("notes", FieldSpec::string())
    }

    #[test]
    fn test_accepts_matching_value_unchanged() {
        let value = json!({ "symptoms": ["Dizziness"], "notes": "", "extra": 1 });
        let validated = validate(&analysis_schema(), value.clone()).unwrap();
        assert_eq!(validated, value);
    }

    #[test]
    fn test_missing_field() {
        let err = analysis_schema().check(&json!({ "symptoms": [] })).unwrap_err();
        assert_eq!(err, ValidationError::new("notes", "string", "missing"));
    }

    #[test]
    fn test_null_required_field() {
        let err = analysis_schema()
            .check(&json!({ "symptoms": null, "notes": "" }))
            .unwrap_err();
        assert_eq!(err.field, "symptoms");
        assert_eq!(err.actual, "null");
    }

    #[test]
    fn test_wrong_element_type_reports_index() {
        let err = analysis_schema()
            .check(&json!({ "symptoms": ["Fatigue", 3], "notes": "" }))
            .unwrap_err();
        assert_eq!(err, ValidationError::new("symptoms[1]", "string", "number"));
    }

    #[test]
    fn test_first_failing_field_only() {
        let err = analysis_schema().check(&json!({})).unwrap_err();
        assert_eq!(err.field, "symptoms");
    }

    #[test]
    fn test_not_an_object() {
        let err = analysis_schema().check(&json!("text")).unwrap_err();
        assert_eq!(err.field, "$");
        assert_eq!(err.actual, "string");
    }

    #[test]
    fn test_min_length_counts_characters() {
        let schema = Schema::object("Form").field("term", FieldSpec::string().min_length(2));
        assert!(schema.check(&json!({ "term": "é" })).is_err());
        assert!(schema.check(&json!({ "term": "éa" })).is_ok());
    }

    #[test]
    fn test_non_blank() {
        let schema = Schema::object("Out").field("explanation", FieldSpec::string().non_blank());
        let err = schema.check(&json!({ "explanation": " \n " })).unwrap_err();
        assert_eq!(err.expected, "non-blank string");
        assert!(schema.check(&json!({ "explanation": "A fast heart rate." })).is_ok());
    }

    #[test]
    fn test_optional_field() {
        let schema = Schema::object("SpeechOutput").field("media", FieldSpec::string().optional());
        assert!(schema.check(&json!({})).is_ok());
        assert!(schema.check(&json!({ "media": null })).is_ok());
        assert!(schema.check(&json!({ "media": 7 })).is_err());
    }

    #[test]
    fn test_strict_rejects_unknown_fields() {
        let schema = Schema::object("Strict").field("a", FieldSpec::boolean()).strict();
        let err = schema.check(&json!({ "a": true, "b": 1 })).unwrap_err();
        assert_eq!(err, ValidationError::new("b", "no such field", "number"));
    }

    #[test]
    fn test_nested_object_path() {
        let inner = Schema::object("Reading").field("bpm", FieldSpec::number());
        let schema = Schema::object("Outer").field("reading", FieldSpec::object(inner));
        let err = schema.check(&json!({ "reading": { "bpm": "fast" } })).unwrap_err();
        assert_eq!(err.field, "reading.bpm");
        assert_eq!(err.expected, "number");
    }
}
