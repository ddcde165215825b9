//! Declarative schema sources.
//!
//! A schema source is a JSON document:
//!
//! ```json
//! {
//!   "schema_name": "book",
//!   "version": "2.0.0",
//!   "status": "published",
//!   "title": "Book",
//!   "properties": {
//!     "title": {"type": "text", "required": true},
//!     "author": {
//!       "type": "object",
//!       "repeatable": true,
//!       "properties": {"name": {"type": "text", "required": true}}
//!     }
//!   }
//! }
//! ```
//!
//! `properties` keeps declaration order. Keys a declaration does not use
//! (`title`, `help`, ...) are ignored.

use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as Json};

use crate::error::{Error, SchemaError};
use crate::fields::{
    BooleanField, CompositeField, DateField, DateTimeField, EmailField, Field, FieldType,
    MultipleField, Number, NumericField, NumericKind, SchemaField, TextField, TimeField, UrlField,
    is_path_segment,
};
use crate::value::Value;

/// Top-level keys every source must carry.
pub const REQUIRED_KEYS: [&str; 5] = ["schema_name", "version", "status", "title", "properties"];

/// The only status a schema may have to be applied.
pub const PUBLISHED: &str = "published";

/// A parsed schema source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaSource {
    pub schema_name: String,
    pub version: String,
    pub status: String,
    pub title: String,
    pub properties: JsonMap<String, Json>,
}

impl SchemaSource {
    /// Parses a source from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self, Error> {
        let json: Json = serde_json::from_str(text)?;
        Self::from_json_value(json)
    }

    /// Parses a source from a JSON value, reporting all missing top-level
    /// keys at once.
    pub fn from_json_value(json: Json) -> Result<Self, Error> {
        let missing: Vec<String> = REQUIRED_KEYS
            .iter()
            .filter(|key| json.get(**key).is_none())
            .map(|key| key.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(SchemaError::MissingKeys(missing).into());
        }
        Ok(serde_json::from_value(json)?)
    }

    pub fn is_published(&self) -> bool {
        self.status == PUBLISHED
    }

    /// Builds the top-level fields in declaration order.
    pub fn fields(&self) -> Result<Vec<SchemaField>, SchemaError> {
        build_fields(&self.properties, &self.schema_name)
    }
}

/// Declaration of a single field inside `properties`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldDeclaration {
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Json>,
    #[serde(default)]
    pub repeatable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<serde_json::Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<serde_json::Number>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(default)]
    pub multiple: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<Json>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<JsonMap<String, Json>>,
}

impl FieldDeclaration {
    /// Builds the field named `name`.
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaError`] for unsupported types, missing choices or
    /// subfields, invalid patterns and defaults a composite cannot take.
    pub fn build(&self, name: &str) -> Result<SchemaField, SchemaError> {
        self.build_at(name, name)
    }

    fn build_at(&self, name: &str, path: &str) -> Result<SchemaField, SchemaError> {
        let kind = FieldType::parse(&self.field_type).ok_or_else(|| SchemaError::UnsupportedType {
            field: path.to_string(),
            field_type: self.field_type.clone(),
        })?;
        let with_pattern = |e: SchemaError| match e {
            SchemaError::InvalidPattern { reason, .. } => SchemaError::InvalidPattern {
                field: path.to_string(),
                reason,
            },
            other => other,
        };

        let mut field: SchemaField = match kind {
            FieldType::Text | FieldType::Textarea => {
                let mut text = if kind == FieldType::Textarea {
                    TextField::textarea(name)
                } else {
                    TextField::new(name)
                };
                if let Some(max) = self.max_length {
                    text = text.with_max_length(max);
                }
                if let Some(pattern) = &self.pattern {
                    text = text.with_pattern(pattern).map_err(with_pattern)?;
                }
                text.into()
            }
            FieldType::Email => {
                let mut email = EmailField::new(name);
                if let Some(max) = self.max_length {
                    email = email.with_max_length(max);
                }
                if let Some(pattern) = &self.pattern {
                    email = email.with_pattern(pattern).map_err(with_pattern)?;
                }
                email.into()
            }
            FieldType::Url => {
                let mut url = UrlField::new(name);
                if let Some(max) = self.max_length {
                    url = url.with_max_length(max);
                }
                if let Some(pattern) = &self.pattern {
                    url = url.with_pattern(pattern).map_err(with_pattern)?;
                }
                url.into()
            }
            FieldType::Date => DateField::new(name).into(),
            FieldType::Time => TimeField::new(name).into(),
            FieldType::DateTime => DateTimeField::new(name).into(),
            FieldType::Integer | FieldType::Float => {
                let numeric_kind = if kind == FieldType::Integer {
                    NumericKind::Integer
                } else {
                    NumericKind::Float
                };
                let mut numeric = NumericField::new(name, numeric_kind);
                if let Some(min) = &self.minimum {
                    numeric = numeric.with_minimum(json_number(min));
                }
                if let Some(max) = &self.maximum {
                    numeric = numeric.with_maximum(json_number(max));
                }
                numeric.into()
            }
            FieldType::Checkbox => BooleanField::new(name).into(),
            FieldType::Select => {
                let choices = self
                    .values
                    .iter()
                    .flatten()
                    .map(|v| {
                        Value::from(v.clone()).to_storage_string().ok_or_else(|| {
                            SchemaError::InvalidDeclaration {
                                field: path.to_string(),
                                reason: format!("choice {v} is not a scalar"),
                            }
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                let select = MultipleField::new(name, choices)
                    .map_err(|_| SchemaError::EmptyChoices(path.to_string()))?;
                if self.multiple {
                    select.allow_multiple().into()
                } else {
                    select.into()
                }
            }
            FieldType::Object => {
                let properties = self
                    .properties
                    .as_ref()
                    .filter(|p| !p.is_empty())
                    .ok_or_else(|| SchemaError::EmptyComposite(path.to_string()))?;
                let fields = build_fields(properties, path)?;
                CompositeField::new(name, fields)
                    .map_err(|e| match e {
                        SchemaError::DuplicateField { child, .. } => SchemaError::DuplicateField {
                            field: path.to_string(),
                            child,
                        },
                        other => other,
                    })?
                    .into()
            }
        };

        if self.required {
            field.set_required(true);
        }
        if let Some(default) = &self.default {
            field
                .set_default(Some(Value::from(default.clone())))
                .map_err(|e| match e {
                    SchemaError::UnknownDefaultKey { child, .. } => SchemaError::UnknownDefaultKey {
                        field: path.to_string(),
                        child,
                    },
                    other => other,
                })?;
        }
        if self.repeatable {
            field = field.into_repeatable();
        }
        Ok(field)
    }
}

fn json_number(n: &serde_json::Number) -> Number {
    match n.as_i64() {
        Some(i) => Number::Integer(i),
        None => Number::Float(n.as_f64().unwrap_or(f64::NAN)),
    }
}

/// Builds the fields declared in `properties`; `namespace` qualifies error
/// messages.
pub(crate) fn build_fields(
    properties: &JsonMap<String, Json>,
    namespace: &str,
) -> Result<Vec<SchemaField>, SchemaError> {
    properties
        .iter()
        .map(|(name, declaration)| {
            if !is_path_segment(name) {
                return Err(SchemaError::InvalidFieldName {
                    field: namespace.to_string(),
                    child: name.clone(),
                });
            }
            let path = format!("{namespace}.{name}");
            let declaration: FieldDeclaration =
                serde_json::from_value(declaration.clone()).map_err(|e| {
                    SchemaError::InvalidDeclaration {
                        field: path.clone(),
                        reason: e.to_string(),
                    }
                })?;
            declaration.build_at(name, &path)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn declaration(json: Json) -> FieldDeclaration {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_missing_keys_reported_together() {
        let err = SchemaSource::from_json_value(json!({"schema_name": "book", "title": "Book"}))
            .unwrap_err();
        match err {
            Error::Schema(SchemaError::MissingKeys(keys)) => {
                assert_eq!(keys, vec!["version", "status", "properties"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_properties_keep_declaration_order() {
        let source = SchemaSource::from_json_value(json!({
            "schema_name": "s", "version": "1.0.0", "status": "draft", "title": "",
            "properties": {"z": {"type": "text"}, "a": {"type": "integer"}, "m": {"type": "checkbox"}}
        }))
        .unwrap();
        assert!(!source.is_published());
        let names: Vec<String> = source
            .fields()
            .unwrap()
            .iter()
            .map(|f| f.name().to_string())
            .collect();
        assert_eq!(names, vec!["z", "a", "m"]);
    }

    #[test]
    fn test_unsupported_type() {
        let err = declaration(json!({"type": "markdown"})).build("notes").unwrap_err();
        assert_eq!(
            err,
            SchemaError::UnsupportedType {
                field: "notes".into(),
                field_type: "markdown".into()
            }
        );
    }

    #[test]
    fn test_select_declarations() {
        let field = declaration(json!({
            "type": "select", "multiple": true, "values": ["red", "blue", 3],
            "default": "red", "title": "Colors"
        }))
        .build("colors")
        .unwrap();
        let SchemaField::Multiple(select) = &field else {
            panic!("expected select");
        };
        assert!(select.is_multiple());
        assert_eq!(select.choices(), ["red", "blue", "3"]);
        assert_eq!(field.default_value(), Some(Value::from(vec!["red"])));

        let err = declaration(json!({"type": "select", "values": []})).build("c").unwrap_err();
        assert_eq!(err, SchemaError::EmptyChoices("c".into()));
    }

    #[test]
    fn test_repeatable_object_with_nested_errors() {
        let field = declaration(json!({
            "type": "object",
            "repeatable": true,
            "properties": {
                "name": {"type": "text", "required": true},
                "age": {"type": "integer", "minimum": 12, "maximum": 99.5}
            }
        }))
        .build("author")
        .unwrap();
        assert!(field.is_repeatable());
        assert!(field.is_required());
        assert_eq!(field.index_depth(), 1);

        let err = declaration(json!({
            "type": "object",
            "properties": {"name": {"type": "text", "pattern": "[a-"}}
        }))
        .build("author")
        .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidPattern { ref field, .. } if field == "author.name"));

        let err = declaration(json!({"type": "object", "properties": {}})).build("o").unwrap_err();
        assert_eq!(err, SchemaError::EmptyComposite("o".into()));
    }

    #[test]
    fn test_object_default_overrides_children() {
        let field = declaration(json!({
            "type": "object",
            "default": {"b": 5},
            "properties": {"a": {"type": "text"}, "b": {"type": "integer", "default": 1}}
        }))
        .build("o")
        .unwrap();
        assert_eq!(field.default_value(), Some(Value::from(json!({"b": 5}))));

        let err = declaration(json!({
            "type": "object",
            "default": {"z": 5},
            "properties": {"a": {"type": "text"}}
        }))
        .build("o")
        .unwrap_err();
        assert_eq!(
            err,
            SchemaError::UnknownDefaultKey {
                field: "o".into(),
                child: "z".into()
            }
        );
    }

    #[test]
    fn test_malformed_declaration_names_field() {
        let source = SchemaSource::from_json_value(json!({
            "schema_name": "s", "version": "1", "status": "published", "title": "S",
            "properties": {"x": {"required": true}}
        }))
        .unwrap();
        let err = source.fields().unwrap_err();
        assert!(matches!(err, SchemaError::InvalidDeclaration { ref field, .. } if field == "s.x"));
    }

    #[test]
    fn test_reserved_characters_in_names_rejected() {
        for name in ["a.b", "x[0]", "y]", ""] {
            let source = SchemaSource::from_json_value(json!({
                "schema_name": "s", "version": "1", "status": "published", "title": "S",
                "properties": {name: {"type": "text"}}
            }))
            .unwrap();
            assert_eq!(
                source.fields().unwrap_err(),
                SchemaError::InvalidFieldName {
                    field: "s".into(),
                    child: name.into()
                }
            );
        }

        let err = declaration(json!({
            "type": "object",
            "properties": {"ok": {"type": "text"}, "a.b": {"type": "text"}}
        }))
        .build("o")
        .unwrap_err();
        assert_eq!(
            err,
            SchemaError::InvalidFieldName {
                field: "o".into(),
                child: "a.b".into()
            }
        );
    }
}
