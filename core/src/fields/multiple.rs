//! Select fields with a fixed list of choices.

use super::{Field, FieldBase, FieldType, check_required, describe_base};
use crate::diagnostics::{Context, DiagnosticKind};
use crate::error::{FieldError, SchemaError};
use crate::value::Value;

/// Single or multiple choice among a non-empty list of string values.
///
/// Values are compared by their string form, so `1` matches the choice
/// `"1"`. Invalid choices are dropped with a [`DiagnosticKind::ValueIgnored`]
/// note instead of failing, unless nothing valid remains of a required
/// multiple selection.
///
/// # Examples
///
/// ```
/// use mdschema_core::{Context, Diagnostics, Field, MultipleField, Value};
///
/// let colors = MultipleField::new("colors", ["red", "blue"]).unwrap().allow_multiple();
/// let mut diagnostics = Diagnostics::new();
/// let mut ctx = Context::new(&mut diagnostics);
/// let kept = colors.convert(Value::from(vec!["red", "green"]), &mut ctx).unwrap();
/// assert_eq!(kept, Value::from(vec!["red"]));
/// assert_eq!(diagnostics.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct MultipleField {
    base: FieldBase,
    choices: Vec<String>,
    multiple: bool,
}

impl MultipleField {
    /// Creates a single-choice select.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::EmptyChoices`] when `choices` is empty.
    pub fn new<I, S>(name: impl Into<String>, choices: I) -> Result<Self, SchemaError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let base = FieldBase::new(name);
        let choices: Vec<String> = choices.into_iter().map(Into::into).collect();
        if choices.is_empty() {
            return Err(SchemaError::EmptyChoices(base.name));
        }
        Ok(Self {
            base,
            choices,
            multiple: false,
        })
    }

    /// Accepts a list of choices instead of a single one.
    pub fn allow_multiple(mut self) -> Self {
        self.multiple = true;
        self
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

    pub fn choices(&self) -> &[String] {
        &self.choices
    }

    pub fn is_multiple(&self) -> bool {
        self.multiple
    }

    fn choice_of(&self, value: &Value) -> Option<String> {
        value
            .to_storage_string()
            .filter(|s| self.choices.iter().any(|c| c == s))
    }

    fn convert_list(
        &self,
        items: Vec<Value>,
        path: String,
        ctx: &mut Context<'_>,
    ) -> Result<Value, FieldError> {
        if items.is_empty() {
            return Ok(Value::List(items));
        }
        let mut kept = Vec::with_capacity(items.len());
        for item in &items {
            match self.choice_of(item) {
                Some(choice) => kept.push(Value::Text(choice)),
                None => ctx.note(
                    DiagnosticKind::ValueIgnored,
                    path.clone(),
                    format!("{item} is not a valid choice"),
                ),
            }
        }
        if kept.is_empty() && self.is_required() {
            return Err(FieldError::validation(
                path,
                &Value::List(items),
                "none of the values are valid choices",
            ));
        }
        Ok(Value::List(kept))
    }
}

impl Field for MultipleField {
    fn name(&self) -> &str {
        &self.base.name
    }

    fn set_name(&mut self, name: &str) {
        self.base.name = name.to_string();
    }

    fn field_type(&self) -> FieldType {
        FieldType::Select
    }

    fn is_required(&self) -> bool {
        self.base.required
    }

    /// The declared default, wrapped in a list for a multiple select.
    fn default_value(&self) -> Option<Value> {
        match &self.base.default {
            Some(d) if self.multiple && d.is_scalar() && !d.is_null() => {
                Some(Value::List(vec![d.clone()]))
            }
            other => other.clone(),
        }
    }

    fn set_default(&mut self, default: Option<Value>) -> Result<(), SchemaError> {
        self.base.default = default;
        Ok(())
    }

    fn convert(&self, value: Value, ctx: &mut Context<'_>) -> Result<Value, FieldError> {
        let path = ctx.qualify(self.name());
        match value {
            Value::Null => Ok(Value::Null),
            Value::List(items) if self.multiple => self.convert_list(items, path, ctx),
            Value::List(_) => Err(FieldError::validation(
                path,
                &value,
                "expects a single value, found a list",
            )),
            Value::Map(_) => Err(FieldError::conversion(
                path,
                &value,
                "cannot convert mapping to a choice",
            )),
            _ if self.multiple => Err(FieldError::validation(
                path,
                &value,
                format!("expects a list, found {}", value.type_name()),
            )),
            Value::Text(ref s) if s.is_empty() => Ok(Value::Null),
            scalar => match self.choice_of(&scalar) {
                Some(choice) => Ok(Value::Text(choice)),
                None => {
                    ctx.note(
                        DiagnosticKind::ValueIgnored,
                        path,
                        format!("{scalar} is not a valid choice"),
                    );
                    Ok(Value::Null)
                }
            },
        }
    }

    fn assert_valid(&self, value: &Value, ctx: &mut Context<'_>) -> Result<(), FieldError> {
        let path = ctx.qualify(self.name());
        check_required(self.is_required(), path.clone(), value)?;
        let valid = |v: &Value| matches!(v, Value::Text(s) if self.choices.contains(s));
        let ok = match value {
            Value::Null => true,
            Value::List(items) if self.multiple => items.iter().all(valid),
            other if !self.multiple => valid(other),
            _ => false,
        };
        if ok {
            Ok(())
        } else {
            Err(FieldError::validation(
                path,
                value,
                format!("must be {} of: {}", if self.multiple { "a list" } else { "one" }, self.choices.join(", ")),
            ))
        }
    }

    fn description(&self) -> String {
        [
            describe_base(self),
            format!("Multiple: {}.", self.multiple),
            format!("Choices: {}.", self.choices.join(", ")),
        ]
        .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Diagnostics;

    fn colors() -> MultipleField {
        MultipleField::new("colors", ["red", "blue", "green"])
            .unwrap()
            .allow_multiple()
    }

    fn validate(field: &MultipleField, value: Value, diagnostics: &mut Diagnostics) -> Result<Value, FieldError> {
        let mut ctx = Context::new(diagnostics);
        field.validate(value, &mut ctx)
    }

    #[test]
    fn test_empty_choices_rejected() {
        let err = MultipleField::new("c", Vec::<String>::new()).unwrap_err();
        assert_eq!(err, SchemaError::EmptyChoices("c".into()));
    }

    #[test]
    fn test_multiple_filters_invalid_choices() {
        let field = MultipleField::new("c", ["red", "blue"]).unwrap().allow_multiple();
        let mut diagnostics = Diagnostics::new();
        let value = validate(&field, Value::from(vec!["red", "green"]), &mut diagnostics).unwrap();
        assert_eq!(value, Value::from(vec!["red"]));
        assert!(diagnostics.has(DiagnosticKind::ValueIgnored));
    }

    #[test]
    fn test_required_multiple_with_no_valid_choice_fails() {
        let field = MultipleField::new("c", ["red", "blue"])
            .unwrap()
            .allow_multiple()
            .required();
        let mut diagnostics = Diagnostics::new();
        let err = validate(&field, Value::from(vec!["green"]), &mut diagnostics).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_optional_multiple_with_no_valid_choice_is_empty() {
        let mut diagnostics = Diagnostics::new();
        let value = validate(&colors(), Value::from(vec!["purple"]), &mut diagnostics).unwrap();
        assert_eq!(value, Value::List(vec![]));
    }

    #[test]
    fn test_shape_mismatch_is_validation_error() {
        let mut diagnostics = Diagnostics::new();
        let single = MultipleField::new("type", ["hard", "soft"]).unwrap();
        assert!(validate(&single, Value::from(vec!["hard"]), &mut diagnostics)
            .unwrap_err()
            .is_validation());
        assert!(validate(&colors(), Value::from("red"), &mut diagnostics)
            .unwrap_err()
            .is_validation());
    }

    #[test]
    fn test_single_invalid_choice_becomes_null() {
        let field = MultipleField::new("type", ["hard", "soft"]).unwrap();
        let mut diagnostics = Diagnostics::new();
        assert_eq!(
            validate(&field, Value::from("paper"), &mut diagnostics).unwrap(),
            Value::Null
        );
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn test_choices_compare_as_strings() {
        let field = MultipleField::new("edition", ["1", "2"]).unwrap();
        let mut diagnostics = Diagnostics::new();
        assert_eq!(
            validate(&field, Value::from(2), &mut diagnostics).unwrap(),
            Value::from("2")
        );
    }

    #[test]
    fn test_default_wrapped_for_multiple() {
        let field = colors().with_default("red");
        assert_eq!(field.default_value(), Some(Value::from(vec!["red"])));
        let mut diagnostics = Diagnostics::new();
        assert_eq!(
            validate(&field, Value::Null, &mut diagnostics).unwrap(),
            Value::from(vec!["red"])
        );
    }
}
