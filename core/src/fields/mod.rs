//! Field type hierarchy.
//!
//! Every kind of field implements the [`Field`] contract:
//!
//! - [`convert`](Field::convert) coerces a value to the canonical type of the
//!   field, failing with [`FieldError::Conversion`].
//! - [`assert_valid`](Field::assert_valid) checks a converted value, failing
//!   with [`FieldError::Validation`].
//! - [`apply_default`](Field::apply_default) substitutes the (converted)
//!   default for an empty value.
//! - [`validate`](Field::validate) chains the three, in that order, so an
//!   empty input receives a typed default before any range or shape check.
//!
//! Concrete kinds are gathered in the tagged enum [`SchemaField`].
//! [`CompositeField`] and [`RepeatableField`] aggregate other fields and
//! recurse into them.

mod boolean;
mod composite;
mod multiple;
mod numeric;
mod repeatable;
mod temporal;
mod text;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use boolean::BooleanField;
pub use composite::CompositeField;
pub(crate) use composite::is_path_segment;
pub use multiple::MultipleField;
pub use numeric::{Number, NumericField, NumericKind};
pub use repeatable::RepeatableField;
pub use temporal::{DateField, DateTimeField, TimeField};
pub use text::{EmailField, TextField, UrlField};

use crate::diagnostics::{Context, DiagnosticKind};
use crate::error::{FieldError, SchemaError};
use crate::value::Value;

/// Declared type of a field, as spelled in schema sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Textarea,
    Email,
    Url,
    Date,
    Time,
    #[serde(rename = "datetime-local")]
    DateTime,
    Integer,
    Float,
    Checkbox,
    Select,
    Object,
}

impl FieldType {
    /// All supported types.
    pub const ALL: [FieldType; 12] = [
        FieldType::Text,
        FieldType::Textarea,
        FieldType::Email,
        FieldType::Url,
        FieldType::Date,
        FieldType::Time,
        FieldType::DateTime,
        FieldType::Integer,
        FieldType::Float,
        FieldType::Checkbox,
        FieldType::Select,
        FieldType::Object,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Textarea => "textarea",
            FieldType::Email => "email",
            FieldType::Url => "url",
            FieldType::Date => "date",
            FieldType::Time => "time",
            FieldType::DateTime => "datetime-local",
            FieldType::Integer => "integer",
            FieldType::Float => "float",
            FieldType::Checkbox => "checkbox",
            FieldType::Select => "select",
            FieldType::Object => "object",
        }
    }

    /// Parses a type name as found in a schema source.
    pub fn parse(name: &str) -> Option<FieldType> {
        FieldType::ALL.into_iter().find(|t| t.as_str() == name)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The contract shared by all field kinds.
///
/// Fields store their local name only; the [`Context`] supplies the
/// enclosing namespace, and errors report the qualified path.
pub trait Field {
    /// Local name of the field.
    fn name(&self) -> &str;

    /// Renames the field. Subfield paths follow automatically.
    fn set_name(&mut self, name: &str);

    fn field_type(&self) -> FieldType;

    fn is_required(&self) -> bool;

    /// Default value, if any (derived for composite fields).
    fn default_value(&self) -> Option<Value>;

    /// Replaces the default value.
    ///
    /// # Errors
    ///
    /// Composite fields reject defaults that are not mappings of their
    /// subfields.
    fn set_default(&mut self, default: Option<Value>) -> Result<(), SchemaError>;

    fn is_repeatable(&self) -> bool {
        false
    }

    /// Coerces `value` to the canonical type of the field.
    fn convert(&self, value: Value, ctx: &mut Context<'_>) -> Result<Value, FieldError>;

    /// Checks an already converted value.
    ///
    /// The base check rejects an empty value for a required field.
    fn assert_valid(&self, value: &Value, ctx: &mut Context<'_>) -> Result<(), FieldError> {
        check_required(self.is_required(), ctx.qualify(self.name()), value)
    }

    /// Returns the converted default when `value` is empty, `value` otherwise.
    fn apply_default(&self, value: Value, ctx: &mut Context<'_>) -> Result<Value, FieldError> {
        if value.is_empty() {
            if let Some(default) = self.default_value() {
                let path = ctx.qualify(self.name());
                ctx.note(
                    DiagnosticKind::DefaultApplied,
                    path,
                    format!("empty value replaced by default {default}"),
                );
                return self.convert(default, ctx);
            }
        }
        Ok(value)
    }

    /// Runs `apply_default → convert → assert_valid` and returns the clean value.
    fn validate(&self, value: Value, ctx: &mut Context<'_>) -> Result<Value, FieldError> {
        let options = ctx.options();
        let value = if options.apply_defaults {
            self.apply_default(value, ctx)?
        } else {
            value
        };
        let value = if options.convert {
            self.convert(value, ctx)?
        } else {
            value
        };
        self.assert_valid(&value, ctx)?;
        Ok(value)
    }

    /// Human-readable summary of the field's requirements.
    fn description(&self) -> String {
        describe_base(self)
    }
}

/// Fails when a required field holds an empty value.
pub(crate) fn check_required(required: bool, path: String, value: &Value) -> Result<(), FieldError> {
    if required && value.is_empty() {
        return Err(FieldError::validation(path, value, "value required"));
    }
    Ok(())
}

/// Type/required/repeatable lines shared by every description.
pub(crate) fn describe_base<F: Field + ?Sized>(field: &F) -> String {
    let mut required = format!("Required: {}.", field.is_required());
    if field.is_required() {
        if let Some(default) = field.default_value() {
            required.push_str(&format!(" Default: {default}."));
        }
    }
    [
        format!("Type: {}.", field.field_type()),
        required,
        format!("Repeatable: {}.", field.is_repeatable()),
    ]
    .join("\n")
}

/// Implements the name/required/default accessors over a `base: FieldBase`.
macro_rules! base_accessors {
    () => {
        fn name(&self) -> &str {
            &self.base.name
        }

        fn set_name(&mut self, name: &str) {
            self.base.name = name.to_string();
        }

        fn is_required(&self) -> bool {
            self.base.required
        }

        fn default_value(&self) -> Option<crate::value::Value> {
            self.base.default.clone()
        }

        fn set_default(
            &mut self,
            default: Option<crate::value::Value>,
        ) -> Result<(), crate::error::SchemaError> {
            self.base.default = default;
            Ok(())
        }
    };
}
pub(crate) use base_accessors;

/// Name, required flag and default shared by the scalar kinds.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FieldBase {
    pub(crate) name: String,
    pub(crate) required: bool,
    pub(crate) default: Option<Value>,
}

impl FieldBase {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required: false,
            default: None,
        }
    }
}

/// A field of any kind.
#[derive(Debug, Clone)]
pub enum SchemaField {
    Text(TextField),
    Email(EmailField),
    Url(UrlField),
    Boolean(BooleanField),
    Numeric(NumericField),
    Date(DateField),
    Time(TimeField),
    DateTime(DateTimeField),
    Multiple(MultipleField),
    Composite(CompositeField),
    Repeatable(RepeatableField),
}

macro_rules! dispatch {
    ($field:expr, $f:ident => $body:expr) => {
        match $field {
            SchemaField::Text($f) => $body,
            SchemaField::Email($f) => $body,
            SchemaField::Url($f) => $body,
            SchemaField::Boolean($f) => $body,
            SchemaField::Numeric($f) => $body,
            SchemaField::Date($f) => $body,
            SchemaField::Time($f) => $body,
            SchemaField::DateTime($f) => $body,
            SchemaField::Multiple($f) => $body,
            SchemaField::Composite($f) => $body,
            SchemaField::Repeatable($f) => $body,
        }
    };
}

impl SchemaField {
    /// Number of list levels a value of this field occupies: one per
    /// repeatable wrapper, one for a multiple-choice select.
    pub fn index_depth(&self) -> usize {
        match self {
            SchemaField::Repeatable(r) => 1 + r.field().index_depth(),
            SchemaField::Multiple(m) if m.is_multiple() => 1,
            _ => 0,
        }
    }

    pub fn as_composite(&self) -> Option<&CompositeField> {
        match self {
            SchemaField::Composite(c) => Some(c),
            _ => None,
        }
    }

    /// The composite holding this field's subfields, looking through
    /// repeatable wrappers.
    pub fn subfields(&self) -> Option<&CompositeField> {
        match self {
            SchemaField::Composite(c) => Some(c),
            SchemaField::Repeatable(r) => r.field().subfields(),
            _ => None,
        }
    }

    /// Sets the required flag. Composite fields derive theirs from their
    /// subfields and are left unchanged.
    pub fn set_required(&mut self, required: bool) {
        match self {
            SchemaField::Text(f) => f.set_required(required),
            SchemaField::Email(f) => f.set_required(required),
            SchemaField::Url(f) => f.set_required(required),
            SchemaField::Boolean(f) => f.set_required(required),
            SchemaField::Numeric(f) => f.set_required(required),
            SchemaField::Date(f) => f.set_required(required),
            SchemaField::Time(f) => f.set_required(required),
            SchemaField::DateTime(f) => f.set_required(required),
            SchemaField::Multiple(f) => f.set_required(required),
            SchemaField::Composite(_) => {}
            SchemaField::Repeatable(f) => f.set_required(required),
        }
    }

    /// Wraps the field in a [`RepeatableField`].
    pub fn into_repeatable(self) -> SchemaField {
        match self {
            SchemaField::Repeatable(_) => self,
            other => SchemaField::Repeatable(RepeatableField::new(other)),
        }
    }
}

impl Field for SchemaField {
    fn name(&self) -> &str {
        dispatch!(self, f => f.name())
    }

    fn set_name(&mut self, name: &str) {
        dispatch!(self, f => f.set_name(name))
    }

    fn field_type(&self) -> FieldType {
        dispatch!(self, f => f.field_type())
    }

    fn is_required(&self) -> bool {
        dispatch!(self, f => f.is_required())
    }

    fn default_value(&self) -> Option<Value> {
        dispatch!(self, f => f.default_value())
    }

    fn set_default(&mut self, default: Option<Value>) -> Result<(), SchemaError> {
        dispatch!(self, f => f.set_default(default))
    }

    fn is_repeatable(&self) -> bool {
        dispatch!(self, f => f.is_repeatable())
    }

    fn convert(&self, value: Value, ctx: &mut Context<'_>) -> Result<Value, FieldError> {
        dispatch!(self, f => f.convert(value, ctx))
    }

    fn assert_valid(&self, value: &Value, ctx: &mut Context<'_>) -> Result<(), FieldError> {
        dispatch!(self, f => f.assert_valid(value, ctx))
    }

    fn apply_default(&self, value: Value, ctx: &mut Context<'_>) -> Result<Value, FieldError> {
        dispatch!(self, f => f.apply_default(value, ctx))
    }

    fn validate(&self, value: Value, ctx: &mut Context<'_>) -> Result<Value, FieldError> {
        dispatch!(self, f => f.validate(value, ctx))
    }

    fn description(&self) -> String {
        dispatch!(self, f => f.description())
    }
}

macro_rules! impl_from_field {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(
            impl From<$ty> for SchemaField {
                fn from(field: $ty) -> Self {
                    SchemaField::$variant(field)
                }
            }
        )*
    };
}

impl_from_field!(
    Text(TextField),
    Email(EmailField),
    Url(UrlField),
    Boolean(BooleanField),
    Numeric(NumericField),
    Date(DateField),
    Time(TimeField),
    DateTime(DateTimeField),
    Multiple(MultipleField),
    Composite(CompositeField),
    Repeatable(RepeatableField),
);
