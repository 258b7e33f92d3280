//! Schema descriptors for flow requests and responses
//!
//! A [`Schema`] is an explicit, ordered description of an object shape:
//! field name → [`FieldSpec`] (type plus constraints). One generic validator
//! ([`validate`]) consumes every schema, so flows never carry ad hoc shape
//! checks of their own.
//!
//! # Example
//!
//! ```rust
//! use medflow_core::schema::{FieldSpec, Schema};
//!
//! let schema = Schema::object("ExplainMedicalTermInput")
//!     .field("term", FieldSpec::string().non_blank().describe("The medical term to explain."));
//!
//! assert!(schema.check(&serde_json::json!({ "term": "Tachycardia" })).is_ok());
//! assert!(schema.check(&serde_json::json!({ "term": "  " })).is_err());
//! ```

mod validate;

pub use validate::{validate, ValidationError};

use indexmap::IndexMap;
use serde_json::{json, Map, Value};

/// Declared type of a field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    String,
    Number,
    Boolean,
    /// Homogeneous array with the given element type
    Array(Box<FieldType>),
    /// Nested object
    Object(Schema),
}

impl FieldType {
    /// Human-readable type name used in validation errors
    pub fn type_name(&self) -> String {
        match self {
            FieldType::String => "string".to_string(),
            FieldType::Number => "number".to_string(),
            FieldType::Boolean => "boolean".to_string(),
            FieldType::Array(element) => format!("array<{}>", element.type_name()),
            FieldType::Object(schema) => format!("object<{}>", schema.name()),
        }
    }

    fn to_json_schema(&self) -> Value {
        match self {
            FieldType::String => json!({ "type": "string" }),
            FieldType::Number => json!({ "type": "number" }),
            FieldType::Boolean => json!({ "type": "boolean" }),
            FieldType::Array(element) => json!({
                "type": "array",
                "items": element.to_json_schema(),
            }),
            FieldType::Object(schema) => schema.to_json_schema(),
        }
    }
}

/// A field declaration: type plus constraints
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    /// Declared type
    pub field_type: FieldType,

    /// Whether the field must be present (and non-null)
    pub required: bool,

    /// Minimum length in characters (strings only)
    pub min_length: Option<usize>,

    /// Reject strings that are empty after trimming
    pub non_blank: bool,

    /// Description forwarded to the model as part of the output schema
    pub description: Option<String>,
}

impl FieldSpec {
    fn of(field_type: FieldType) -> Self {
        Self {
            field_type,
            required: true,
            min_length: None,
            non_blank: false,
            description: None,
        }
    }

    pub fn string() -> Self {
        Self::of(FieldType::String)
    }

    pub fn number() -> Self {
        Self::of(FieldType::Number)
    }

    pub fn boolean() -> Self {
        Self::of(FieldType::Boolean)
    }

    /// Array field with the given element type
    pub fn array(element: FieldType) -> Self {
        Self::of(FieldType::Array(Box::new(element)))
    }

    pub fn object(schema: Schema) -> Self {
        Self::of(FieldType::Object(schema))
    }

    /// Mark the field as optional
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Require at least `min` characters
    pub fn min_length(mut self, min: usize) -> Self {
        self.min_length = Some(min);
        self
    }

    /// Require at least one non-whitespace character
    pub fn non_blank(mut self) -> Self {
        self.non_blank = true;
        self
    }

    /// Attach a description
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    fn to_json_schema(&self) -> Value {
        let mut schema = self.field_type.to_json_schema();
        if let Value::Object(ref mut map) = schema {
            let min = match (self.min_length, self.non_blank) {
                (Some(min), true) => Some(min.max(1)),
                (Some(min), false) => Some(min),
                (None, true) => Some(1),
                (None, false) => None,
            };
            if let Some(min) = min {
                map.insert("minLength".to_string(), json!(min));
            }
            if let Some(ref description) = self.description {
                map.insert("description".to_string(), json!(description));
            }
        }
        schema
    }
}

/// An object schema: an ordered set of named fields
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    name: String,
    fields: IndexMap<String, FieldSpec>,
    strict: bool,
}

impl Schema {
    /// Create an empty object schema
    pub fn object(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: IndexMap::new(),
            strict: false,
        }
    }

    /// Declare a field (redeclaring a name replaces it in place)
    pub fn field(mut self, name: impl Into<String>, spec: FieldSpec) -> Self {
        self.fields.insert(name.into(), spec);
        self
    }

    /// Reject fields that are not declared
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Look up a field declaration
    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.get(name)
    }

    /// Declared fields in declaration order
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldSpec)> {
        self.fields.iter().map(|(name, spec)| (name.as_str(), spec))
    }

    /// Check a value against this schema without consuming it
    pub fn check(&self, value: &Value) -> Result<(), ValidationError> {
        validate::check_object(self, "", value)
    }

    /// Render as a JSON Schema document (sent to providers that support
    /// constrained decoding, and listed by `medflow flows`).
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for (name, spec) in &self.fields {
            properties.insert(name.clone(), spec.to_json_schema());
            if spec.required {
                required.push(Value::String(name.clone()));
            }
        }

        json!({
            "title": self.name,
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": !self.strict,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analysis_schema() -> Schema {
        Schema::object("SymptomAnalysisOutput")
            .field("summary", FieldSpec::string().describe("A brief summary."))
            .field("potentialTriggers", FieldSpec::array(FieldType::String))
            .field("questionsForDoctor", FieldSpec::array(FieldType::String))
    }

    #[test]
    fn test_fields_keep_declaration_order() {
        let schema = analysis_schema();
        let names: Vec<&str> = schema.fields().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["summary", "potentialTriggers", "questionsForDoctor"]);
    }

    #[test]
    fn test_type_names() {
        assert_eq!(FieldType::Array(Box::new(FieldType::String)).type_name(), "array<string>");
        assert_eq!(
            FieldType::Object(Schema::object("Inner")).type_name(),
            "object<Inner>"
        );
    }

    #[test]
    fn test_json_schema_rendering() {
        let schema = Schema::object("SpeechOutput")
            .field("media", FieldSpec::string().optional())
            .field("term", FieldSpec::string().non_blank().describe("Term"))
            .strict();

        let rendered = schema.to_json_schema();
        assert_eq!(rendered["type"], "object");
        assert_eq!(rendered["additionalProperties"], false);
        assert_eq!(rendered["required"], json!(["term"]));
        assert_eq!(rendered["properties"]["term"]["minLength"], 1);
        assert_eq!(rendered["properties"]["term"]["description"], "Term");
        assert!(rendered["properties"]["media"].get("minLength").is_none());
    }

    #[test]
    fn test_array_items_rendered() {
        let rendered = analysis_schema().to_json_schema();
        assert_eq!(rendered["properties"]["potentialTriggers"]["items"]["type"], "string");
    }
}
