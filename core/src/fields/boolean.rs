use super::{Field, FieldBase, FieldType, base_accessors, check_required};
use crate::diagnostics::Context;
use crate::error::FieldError;
use crate::value::Value;

const TRUE_TOKENS: [&str; 4] = ["true", "yes", "y", "1"];
const FALSE_TOKENS: [&str; 4] = ["false", "no", "n", "0"];

/// Checkbox field holding a boolean.
#[derive(Debug, Clone)]
pub struct BooleanField {
    base: FieldBase,
}

impl BooleanField {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            base: FieldBase::new(name),
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
}

fn parse_token(text: &str) -> Option<bool> {
    let token = text.trim().to_lowercase();
    if TRUE_TOKENS.contains(&token.as_str()) {
        Some(true)
    } else if FALSE_TOKENS.contains(&token.as_str()) {
        Some(false)
    } else {
        None
    }
}

impl Field for BooleanField {
    base_accessors!();

    fn field_type(&self) -> FieldType {
        FieldType::Checkbox
    }

    fn convert(&self, value: Value, ctx: &mut Context<'_>) -> Result<Value, FieldError> {
        if matches!(value, Value::Null | Value::Bool(_)) {
            return Ok(value);
        }
        let converted = match &value {
            Value::Integer(0) => Some(false),
            Value::Integer(1) => Some(true),
            Value::Text(s) => parse_token(s),
            _ => None,
        };
        converted.map(Value::Bool).ok_or_else(|| {
            FieldError::conversion(ctx.qualify(self.name()), &value, "not a boolean")
        })
    }

    fn assert_valid(&self, value: &Value, ctx: &mut Context<'_>) -> Result<(), FieldError> {
        let path = ctx.qualify(self.name());
        check_required(self.is_required(), path.clone(), value)?;
        match value {
            Value::Null | Value::Bool(_) => Ok(()),
            other => Err(FieldError::validation(
                path,
                other,
                format!("expected boolean, found {}", other.type_name()),
            )),
        }
    }
}
