//! Text, email and URL fields.

use std::sync::LazyLock;

use regex::Regex;

use super::{Field, FieldBase, FieldType, base_accessors, check_required, describe_base};
use crate::diagnostics::Context;
use crate::error::{FieldError, SchemaError};
use crate::value::Value;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$")
        .expect("email pattern is valid")
});

/// Free text, optionally limited in length and matched against a pattern.
///
/// Patterns are always matched against the whole value: `p` is compiled as
/// `^(?:p)$`. Textarea fields accept no pattern.
///
/// # Examples
///
/// ```
/// use mdschema_core::{Context, Diagnostics, Field, TextField, Value};
///
/// let isbn = TextField::new("isbn").with_pattern(r"\d{3}-\d{10}").unwrap();
/// let mut diagnostics = Diagnostics::new();
/// let mut ctx = Context::new(&mut diagnostics);
/// assert!(isbn.validate(Value::from("978-0123456789"), &mut ctx).is_ok());
/// assert!(isbn.validate(Value::from("ISBN 978-0123456789"), &mut ctx).is_err());
/// ```
#[derive(Debug, Clone)]
pub struct TextField {
    base: FieldBase,
    textarea: bool,
    max_length: Option<usize>,
    pattern: Option<Regex>,
}

impl TextField {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            base: FieldBase::new(name),
            textarea: false,
            max_length: None,
            pattern: None,
        }
    }

    /// Multi-line text; patterns are not applied.
    pub fn textarea(name: impl Into<String>) -> Self {
        Self {
            textarea: true,
            ..Self::new(name)
        }
    }

    pub fn required(mut self) -> Self {
        self.base.required = true;
        self
    }

    pub fn set_required(&mut self, required: bool) {
        self.base.required = required;
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.base.default = Some(default.into());
        self
    }

    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = Some(max_length);
        self
    }

    /// Restricts values to those matching `pattern` in full.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::InvalidPattern`] if the pattern does not compile.
    pub fn with_pattern(mut self, pattern: &str) -> Result<Self, SchemaError> {
        if self.textarea {
            return Ok(self);
        }
        let anchored = format!("^(?:{pattern})$");
        let regex = Regex::new(&anchored).map_err(|e| SchemaError::InvalidPattern {
            field: self.base.name.clone(),
            reason: e.to_string(),
        })?;
        self.pattern = Some(regex);
        Ok(self)
    }

    pub fn is_textarea(&self) -> bool {
        self.textarea
    }

    pub fn max_length(&self) -> Option<usize> {
        self.max_length
    }

    /// The anchored pattern, if any.
    pub fn pattern(&self) -> Option<&str> {
        self.pattern.as_ref().map(Regex::as_str)
    }

    fn check_text(&self, value: &Value, path: String) -> Result<(), FieldError> {
        let text = match value {
            Value::Null => return Ok(()),
            Value::Text(s) => s,
            other => {
                return Err(FieldError::validation(
                    path,
                    other,
                    format!("expected text, found {}", other.type_name()),
                ));
            }
        };
        if let Some(max) = self.max_length {
            let len = text.chars().count();
            if len > max {
                return Err(FieldError::validation(
                    path,
                    value,
                    format!("{len} characters exceed the maximum of {max}"),
                ));
            }
        }
        if let Some(regex) = &self.pattern {
            if !regex.is_match(text) {
                return Err(FieldError::validation(
                    path,
                    value,
                    format!("does not match pattern {}", regex.as_str()),
                ));
            }
        }
        Ok(())
    }

    fn constraint_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(max) = self.max_length {
            lines.push(format!("Maximum length: {max}."));
        }
        if let Some(pattern) = self.pattern() {
            lines.push(format!("Pattern: {pattern}."));
        }
        lines
    }
}

impl Field for TextField {
    base_accessors!();

    fn field_type(&self) -> FieldType {
        if self.textarea {
            FieldType::Textarea
        } else {
            FieldType::Text
        }
    }

    fn convert(&self, value: Value, ctx: &mut Context<'_>) -> Result<Value, FieldError> {
        match value {
            Value::Null | Value::Text(_) => Ok(value),
            Value::List(_) | Value::Map(_) => Err(FieldError::conversion(
                ctx.qualify(self.name()),
                &value,
                format!("cannot convert {} to text", value.type_name()),
            )),
            scalar => Ok(Value::Text(scalar.to_storage_string().unwrap_or_default())),
        }
    }

    fn assert_valid(&self, value: &Value, ctx: &mut Context<'_>) -> Result<(), FieldError> {
        let path = ctx.qualify(self.name());
        check_required(self.is_required(), path.clone(), value)?;
        self.check_text(value, path)
    }

    fn description(&self) -> String {
        let mut lines = vec![describe_base(self)];
        lines.extend(self.constraint_lines());
        lines.join("\n")
    }
}

macro_rules! text_wrapper {
    ($ty:ident, $field_type:expr, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone)]
        pub struct $ty {
            text: TextField,
        }

        impl $ty {
            pub fn new(name: impl Into<String>) -> Self {
                Self {
                    text: TextField::new(name),
                }
            }

            pub fn required(mut self) -> Self {
                self.text = self.text.required();
                self
            }

            pub fn set_required(&mut self, required: bool) {
                self.text.set_required(required);
            }

            pub fn with_default(mut self, default: impl Into<Value>) -> Self {
                self.text = self.text.with_default(default);
                self
            }

            pub fn with_max_length(mut self, max_length: usize) -> Self {
                self.text = self.text.with_max_length(max_length);
                self
            }

            /// See [`TextField::with_pattern`].
            pub fn with_pattern(mut self, pattern: &str) -> Result<Self, SchemaError> {
                self.text = self.text.with_pattern(pattern)?;
                Ok(self)
            }
        }

        impl Field for $ty {
            fn name(&self) -> &str {
                self.text.name()
            }

            fn set_name(&mut self, name: &str) {
                self.text.set_name(name);
            }

            fn field_type(&self) -> FieldType {
                $field_type
            }

            fn is_required(&self) -> bool {
                self.text.is_required()
            }

            fn default_value(&self) -> Option<Value> {
                self.text.default_value()
            }

            fn set_default(&mut self, default: Option<Value>) -> Result<(), SchemaError> {
                self.text.set_default(default)
            }

            fn convert(&self, value: Value, ctx: &mut Context<'_>) -> Result<Value, FieldError> {
                self.text.convert(value, ctx)
            }

            fn assert_valid(&self, value: &Value, ctx: &mut Context<'_>) -> Result<(), FieldError> {
                self.text.assert_valid(value, ctx)?;
                match value {
                    Value::Text(s) if !s.is_empty() && !Self::is_well_formed(s) => {
                        Err(FieldError::validation(
                            ctx.qualify(self.name()),
                            value,
                            format!("not a valid {}", $field_type),
                        ))
                    }
                    _ => Ok(()),
                }
            }

            fn description(&self) -> String {
                let mut lines = vec![describe_base(self)];
                lines.extend(self.text.constraint_lines());
                lines.join("\n")
            }
        }
    };
}

text_wrapper!(EmailField, FieldType::Email, "Text holding an email address.");
text_wrapper!(UrlField, FieldType::Url, "Text holding an absolute URL with a host.");

impl EmailField {
    fn is_well_formed(text: &str) -> bool {
        EMAIL_RE.is_match(text)
    }
}

impl UrlField {
    fn is_well_formed(text: &str) -> bool {
        url::Url::parse(text).is_ok_and(|url| url.has_host())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Diagnostics;

    fn run<F: Field>(field: &F, value: Value) -> Result<Value, FieldError> {
        let mut diagnostics = Diagnostics::new();
        let mut ctx = Context::new(&mut diagnostics);
        field.validate(value, &mut ctx)
    }

    #[test]
    fn test_text_stringifies_scalars() {
        let field = TextField::new("t");
        assert_eq!(run(&field, Value::from(42)).unwrap(), Value::from("42"));
        assert_eq!(run(&field, Value::from(true)).unwrap(), Value::from("true"));
        assert!(run(&field, Value::List(vec![Value::from("a")])).unwrap_err().is_conversion());
    }

    #[test]
    fn test_required_text_rejects_empty() {
        let field = TextField::new("title").required();
        let err = run(&field, Value::from("")).unwrap_err();
        assert!(err.is_validation());
        assert_eq!(err.field(), "title");
        assert_eq!(run(&field, Value::from("x")).unwrap(), Value::from("x"));
    }

    #[test]
    fn test_max_length_counts_characters() {
        let field = TextField::new("t").with_max_length(3);
        assert!(run(&field, Value::from("äöü")).is_ok());
        assert!(run(&field, Value::from("abcd")).is_err());
    }

    #[test]
    fn test_pattern_is_anchored() {
        let field = TextField::new("code").with_pattern("[a-z]+").unwrap();
        assert_eq!(field.pattern(), Some("^(?:[a-z]+)$"));
        assert!(run(&field, Value::from("abc")).is_ok());
        assert!(run(&field, Value::from("abc1")).is_err());
        assert!(run(&field, Value::from("1abc")).is_err());
    }

    #[test]
    fn test_alternation_is_anchored_as_a_whole() {
        let field = TextField::new("code").with_pattern("ab|cd").unwrap();
        assert!(run(&field, Value::from("cd")).is_ok());
        assert!(run(&field, Value::from("abx")).is_err());
    }

    #[test]
    fn test_invalid_pattern() {
        let err = TextField::new("code").with_pattern("[a-").unwrap_err();
        assert!(matches!(err, SchemaError::InvalidPattern { .. }));
    }

    #[test]
    fn test_textarea_ignores_pattern() {
        let field = TextField::textarea("summary").with_pattern("[a-z]+").unwrap();
        assert_eq!(field.pattern(), None);
        assert_eq!(field.field_type(), FieldType::Textarea);
        assert!(run(&field, Value::from("Anything\ngoes 123")).is_ok());
    }

    #[test]
    fn test_email() {
        let field = EmailField::new("email");
        assert!(run(&field, Value::from("jane.doe@example.org")).is_ok());
        assert!(run(&field, Value::from("jane.doe")).is_err());
        assert!(run(&field, Value::from("jane@localhost")).is_err());
        assert!(run(&field, Value::Null).is_ok());
    }

    #[test]
    fn test_url() {
        let field = UrlField::new("homepage");
        assert!(run(&field, Value::from("https://example.org/path?q=1")).is_ok());
        assert!(run(&field, Value::from("example.org")).is_err());
        assert!(run(&field, Value::from("mailto:jane@example.org")).is_err());
    }

    #[test]
    fn test_description_lists_constraints() {
        let field = TextField::new("t").with_max_length(10);
        assert!(field.description().contains("Maximum length: 10."));
    }
}
