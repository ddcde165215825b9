//! Error types for schema construction, field validation and the triple codec.
//!
//! Field errors carry the qualified path of the offending field and an owned
//! copy of the rejected value. They propagate out of nested recursion
//! unchanged; the first invalid field aborts the whole operation.

use thiserror::Error;

use crate::value::Value;

/// A value was rejected by a field.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FieldError {
    /// The value cannot be coerced to the field's canonical type.
    #[error("cannot convert value of `{field}`: {message}")]
    Conversion {
        field: String,
        value: Value,
        message: String,
    },

    /// The value is structurally or semantically invalid after conversion.
    #[error("invalid value for `{field}`: {message}")]
    Validation {
        field: String,
        value: Value,
        message: String,
    },
}

impl FieldError {
    pub fn conversion(field: impl Into<String>, value: &Value, message: impl Into<String>) -> Self {
        FieldError::Conversion {
            field: field.into(),
            value: value.clone(),
            message: message.into(),
        }
    }

    pub fn validation(field: impl Into<String>, value: &Value, message: impl Into<String>) -> Self {
        FieldError::Validation {
            field: field.into(),
            value: value.clone(),
            message: message.into(),
        }
    }

    /// Qualified path of the field that rejected the value.
    pub fn field(&self) -> &str {
        match self {
            FieldError::Conversion { field, .. } | FieldError::Validation { field, .. } => field,
        }
    }

    /// The rejected value.
    pub fn value(&self) -> &Value {
        match self {
            FieldError::Conversion { value, .. } | FieldError::Validation { value, .. } => value,
        }
    }

    pub fn is_conversion(&self) -> bool {
        matches!(self, FieldError::Conversion { .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, FieldError::Validation { .. })
    }
}

/// A schema source or field declaration cannot be turned into a schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// Top-level keys required by every schema source are absent.
    #[error("the following keys are missing from the schema: {}", .0.join(", "))]
    MissingKeys(Vec<String>),

    /// Only published schemas may be used to apply metadata.
    #[error("schema '{name}' has status '{status}': only published schemas can be used")]
    NotPublished { name: String, status: String },

    /// Declared field type is not one of the supported types.
    #[error("field `{field}` has unsupported type '{field_type}'")]
    UnsupportedType { field: String, field_type: String },

    /// A field declaration is malformed.
    #[error("invalid declaration for field `{field}`: {reason}")]
    InvalidDeclaration { field: String, reason: String },

    /// A text field pattern does not compile.
    #[error("invalid pattern for field `{field}`: {reason}")]
    InvalidPattern { field: String, reason: String },

    /// A composite field was declared without subfields.
    #[error("composite field `{0}` must have at least one subfield")]
    EmptyComposite(String),

    /// A select field was declared without choices.
    #[error("select field `{0}` must have a non-empty list of values")]
    EmptyChoices(String),

    /// Two subfields of a composite share a name.
    #[error("duplicate subfield `{child}` in `{field}`")]
    DuplicateField { field: String, child: String },

    /// A composite default names a subfield that does not exist.
    #[error("unknown subfield `{child}` in default of `{field}`")]
    UnknownDefaultKey { field: String, child: String },

    /// A subfield name is empty or holds a character reserved by flat paths.
    #[error("invalid subfield name `{child}` in `{field}`: names must not be empty or contain '.', '[' or ']'")]
    InvalidFieldName { field: String, child: String },
}

/// A flat path or storage triple cannot be encoded or decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Path syntax is malformed (unbalanced brackets, empty segment, ...).
    #[error("invalid path '{0}'")]
    InvalidPath(String),

    /// Two entries disagree about the shape at a path.
    #[error("conflicting structure at '{path}': {reason}")]
    PathConflict { path: String, reason: String },

    /// A unit string is not a dot-separated list of positive integers.
    #[error("invalid unit '{unit}' on '{name}'")]
    InvalidUnit { name: String, unit: String },

    /// The number of unit components does not match the field structure.
    #[error("unit '{unit}' does not match the structure of '{name}'")]
    UnitMismatch { name: String, unit: String },

    /// A unit component points past any list the decoded triples can fill.
    #[error("unit '{unit}' on '{name}' exceeds {limit} stored triples")]
    IndexOutOfRange { name: String, unit: String, limit: usize },

    /// The path cannot be represented in the selected unit layout.
    #[error("path '{0}' cannot be encoded in this unit layout")]
    UnsupportedPath(String),

    /// A leaf value has no string form (list or map where a scalar belongs).
    #[error("value at '{0}' is not a scalar")]
    NotScalar(String),
}

/// Any error raised by the schema orchestrator.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Field(#[from] FieldError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    /// JSON parsing of a schema source failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The storage collaborator reported a failure.
    #[error("storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    /// Wraps a storage collaborator error.
    pub fn storage<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Storage(Box::new(err))
    }
}

/// Convenience alias for results with [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_error_accessors() {
        let err = FieldError::validation("book.title", &Value::from(""), "value required");
        assert_eq!(err.field(), "book.title");
        assert_eq!(err.value(), &Value::from(""));
        assert!(err.is_validation());
        assert_eq!(err.to_string(), "invalid value for `book.title`: value required");
    }

    #[test]
    fn test_missing_keys_message() {
        let err = SchemaError::MissingKeys(vec!["version".into(), "status".into()]);
        assert_eq!(
            err.to_string(),
            "the following keys are missing from the schema: version, status"
        );
    }
}
