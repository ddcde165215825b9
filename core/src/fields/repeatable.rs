use super::{Field, FieldType, SchemaField, check_required};
use crate::diagnostics::Context;
use crate::error::{FieldError, SchemaError};
use crate::value::Value;

/// Wraps a field so that it holds a list of values.
///
/// Name, required flag and default are those of the wrapped field. A single
/// value is accepted and wrapped in a one-element list.
#[derive(Debug, Clone)]
pub struct RepeatableField {
    field: Box<SchemaField>,
}

impl RepeatableField {
    pub fn new(field: SchemaField) -> Self {
        Self {
            field: Box::new(field),
        }
    }

    pub fn set_required(&mut self, required: bool) {
        self.field.set_required(required);
    }

    /// The field each element is validated against.
    pub fn field(&self) -> &SchemaField {
        &self.field
    }
}

impl Field for RepeatableField {
    fn name(&self) -> &str {
        self.field.name()
    }

    fn set_name(&mut self, name: &str) {
        self.field.set_name(name);
    }

    fn field_type(&self) -> FieldType {
        self.field.field_type()
    }

    fn is_required(&self) -> bool {
        self.field.is_required()
    }

    fn default_value(&self) -> Option<Value> {
        self.field.default_value()
    }

    fn set_default(&mut self, default: Option<Value>) -> Result<(), SchemaError> {
        self.field.set_default(default)
    }

    fn is_repeatable(&self) -> bool {
        true
    }

    fn convert(&self, value: Value, ctx: &mut Context<'_>) -> Result<Value, FieldError> {
        match value {
            Value::Null => Ok(Value::Null),
            Value::List(items) => items
                .into_iter()
                .map(|item| self.field.convert(item, ctx))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List),
            single => Ok(Value::List(vec![self.field.convert(single, ctx)?])),
        }
    }

    fn assert_valid(&self, value: &Value, ctx: &mut Context<'_>) -> Result<(), FieldError> {
        let path = ctx.qualify(self.name());
        check_required(self.is_required(), path.clone(), value)?;
        match value {
            Value::Null => Ok(()),
            Value::List(items) => items
                .iter()
                .try_for_each(|item| self.field.assert_valid(item, ctx)),
            other => Err(FieldError::validation(
                path,
                other,
                format!("expected list, found {}", other.type_name()),
            )),
        }
    }

    /// Runs the wrapped field's full pipeline on every element.
    fn validate(&self, value: Value, ctx: &mut Context<'_>) -> Result<Value, FieldError> {
        let options = ctx.options();
        let value = if options.apply_defaults {
            self.apply_default(value, ctx)?
        } else {
            value
        };
        let path = ctx.qualify(self.name());
        let items = match value {
            Value::List(items) => items,
            Value::Null => Vec::new(),
            single if options.convert => vec![single],
            other => {
                return Err(FieldError::validation(
                    path,
                    &other,
                    format!("expected list, found {}", other.type_name()),
                ));
            }
        };
        if items.is_empty() {
            let empty = Value::Null;
            check_required(self.is_required(), path, &empty)?;
            return Ok(empty);
        }
        items
            .into_iter()
            .map(|item| self.field.validate(item, ctx))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List)
    }

    fn description(&self) -> String {
        self.field
            .description()
            .replacen("Repeatable: false.", "Repeatable: true.", 1)
    }
}
