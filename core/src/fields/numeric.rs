//! Integer and float fields with inclusive bounds.

use std::fmt;

use super::{Field, FieldBase, FieldType, base_accessors, check_required, describe_base};
use crate::diagnostics::Context;
use crate::error::FieldError;
use crate::value::Value;

/// Canonical numeric type of a [`NumericField`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericKind {
    Integer,
    Float,
}

/// A numeric bound, already coerced to the field's kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Integer(i64),
    Float(f64),
}

impl Number {
    pub fn as_f64(self) -> f64 {
        match self {
            Number::Integer(i) => i as f64,
            Number::Float(f) => f,
        }
    }

    fn coerce(self, kind: NumericKind) -> Number {
        match (self, kind) {
            (Number::Float(f), NumericKind::Integer) => Number::Integer(f.trunc() as i64),
            (Number::Integer(i), NumericKind::Float) => Number::Float(i as f64),
            (n, _) => n,
        }
    }
}

impl From<i64> for Number {
    fn from(i: i64) -> Self {
        Number::Integer(i)
    }
}

impl From<i32> for Number {
    fn from(i: i32) -> Self {
        Number::Integer(i64::from(i))
    }
}

impl From<f64> for Number {
    fn from(f: f64) -> Self {
        Number::Float(f)
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Integer(i) => write!(f, "{i}"),
            Number::Float(x) => write!(f, "{x:?}"),
        }
    }
}

/// Integer or float field.
///
/// # Examples
///
/// ```
/// use mdschema_core::{Context, Diagnostics, Field, NumericField, Value};
///
/// let age = NumericField::integer("age").with_minimum(12).with_maximum(99);
/// let mut diagnostics = Diagnostics::new();
/// let mut ctx = Context::new(&mut diagnostics);
/// assert_eq!(age.validate(Value::from(" 42 "), &mut ctx).unwrap(), Value::from(42));
/// assert!(age.validate(Value::from(100), &mut ctx).is_err());
/// ```
#[derive(Debug, Clone)]
pub struct NumericField {
    base: FieldBase,
    kind: NumericKind,
    minimum: Option<Number>,
    maximum: Option<Number>,
}

impl NumericField {
    pub fn new(name: impl Into<String>, kind: NumericKind) -> Self {
        Self {
            base: FieldBase::new(name),
            kind,
            minimum: None,
            maximum: None,
        }
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, NumericKind::Integer)
    }

    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, NumericKind::Float)
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

    /// Sets the inclusive lower bound, coerced to the field's kind.
    pub fn with_minimum(mut self, minimum: impl Into<Number>) -> Self {
        self.minimum = Some(minimum.into().coerce(self.kind));
        self
    }

    /// Sets the inclusive upper bound, coerced to the field's kind.
    pub fn with_maximum(mut self, maximum: impl Into<Number>) -> Self {
        self.maximum = Some(maximum.into().coerce(self.kind));
        self
    }

    pub fn kind(&self) -> NumericKind {
        self.kind
    }

    pub fn minimum(&self) -> Option<Number> {
        self.minimum
    }

    pub fn maximum(&self) -> Option<Number> {
        self.maximum
    }

    fn coerce_float(&self, f: f64) -> Option<Value> {
        match self.kind {
            NumericKind::Float => Some(Value::Float(f)),
            NumericKind::Integer if f.is_finite() => Some(Value::Integer(f.trunc() as i64)),
            NumericKind::Integer => None,
        }
    }

    fn coerce_integer(&self, i: i64) -> Value {
        match self.kind {
            NumericKind::Integer => Value::Integer(i),
            NumericKind::Float => Value::Float(i as f64),
        }
    }

    fn parse(&self, text: &str) -> Option<Value> {
        let text = text.trim();
        match self.kind {
            NumericKind::Integer => text.parse::<i64>().ok().map(Value::Integer),
            NumericKind::Float => text.parse::<f64>().ok().map(Value::Float),
        }
    }

    fn below_minimum(&self, n: Number) -> bool {
        match (self.minimum, n) {
            (Some(Number::Integer(min)), Number::Integer(i)) => i < min,
            (Some(min), n) => n.as_f64() < min.as_f64(),
            (None, _) => false,
        }
    }

    fn above_maximum(&self, n: Number) -> bool {
        match (self.maximum, n) {
            (Some(Number::Integer(max)), Number::Integer(i)) => i > max,
            (Some(max), n) => n.as_f64() > max.as_f64(),
            (None, _) => false,
        }
    }
}

impl Field for NumericField {
    base_accessors!();

    fn field_type(&self) -> FieldType {
        match self.kind {
            NumericKind::Integer => FieldType::Integer,
            NumericKind::Float => FieldType::Float,
        }
    }

    fn convert(&self, value: Value, ctx: &mut Context<'_>) -> Result<Value, FieldError> {
        if value.is_null() {
            return Ok(value);
        }
        let converted = match &value {
            Value::Bool(b) => Some(self.coerce_integer(i64::from(*b))),
            Value::Integer(i) => Some(self.coerce_integer(*i)),
            Value::Float(f) => self.coerce_float(*f),
            Value::Text(s) => self.parse(s),
            _ => None,
        };
        converted.ok_or_else(|| {
            let expected = match self.kind {
                NumericKind::Integer => "an integer",
                NumericKind::Float => "a number",
            };
            FieldError::conversion(ctx.qualify(self.name()), &value, format!("not {expected}"))
        })
    }

    fn assert_valid(&self, value: &Value, ctx: &mut Context<'_>) -> Result<(), FieldError> {
        let path = ctx.qualify(self.name());
        check_required(self.is_required(), path.clone(), value)?;
        let number = match (self.kind, value) {
            (_, Value::Null) => return Ok(()),
            (NumericKind::Integer, Value::Integer(i)) => Number::Integer(*i),
            (NumericKind::Float, Value::Float(f)) if f.is_finite() => Number::Float(*f),
            (NumericKind::Float, Value::Float(_)) => {
                return Err(FieldError::validation(path, value, "not a finite number"));
            }
            (_, other) => {
                return Err(FieldError::validation(
                    path,
                    other,
                    format!("expected {}, found {}", self.field_type(), other.type_name()),
                ));
            }
        };
        if self.below_minimum(number) {
            let min = self.minimum.map(|m| m.to_string()).unwrap_or_default();
            return Err(FieldError::validation(path, value, format!("below minimum {min}")));
        }
        if self.above_maximum(number) {
            let max = self.maximum.map(|m| m.to_string()).unwrap_or_default();
            return Err(FieldError::validation(path, value, format!("above maximum {max}")));
        }
        Ok(())
    }

    fn description(&self) -> String {
        let mut lines = vec![describe_base(self)];
        if let Some(min) = self.minimum {
            lines.push(format!("Minimum: {min}."));
        }
        if let Some(max) = self.maximum {
            lines.push(format!("Maximum: {max}."));
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Diagnostics;

    fn validate(field: &NumericField, value: Value) -> Result<Value, FieldError> {
        let mut diagnostics = Diagnostics::new();
        let mut ctx = Context::new(&mut diagnostics);
        field.validate(value, &mut ctx)
    }

    #[test]
    fn test_integer_conversion() {
        let field = NumericField::integer("n");
        assert_eq!(validate(&field, Value::from("7")).unwrap(), Value::from(7));
        assert_eq!(validate(&field, Value::from(7.9)).unwrap(), Value::from(7));
        assert_eq!(validate(&field, Value::from(-7.9)).unwrap(), Value::from(-7));
        assert_eq!(validate(&field, Value::from(true)).unwrap(), Value::from(1));
        assert!(validate(&field, Value::from("7.5")).unwrap_err().is_conversion());
        assert!(validate(&field, Value::from(f64::NAN)).unwrap_err().is_conversion());
        assert!(validate(&field, Value::from("seven")).is_err());
    }

    #[test]
    fn test_float_conversion() {
        let field = NumericField::float("price");
        assert_eq!(validate(&field, Value::from(3)).unwrap(), Value::Float(3.0));
        assert_eq!(validate(&field, Value::from("2.5")).unwrap(), Value::Float(2.5));
        assert_eq!(validate(&field, Value::from(false)).unwrap(), Value::Float(0.0));
    }

    #[test]
    fn test_non_finite_floats_rejected() {
        let field = NumericField::float("x").with_minimum(0).with_maximum(10);
        for input in [Value::from("NaN"), Value::from("inf"), Value::from("-inf"), Value::from(f64::NAN)] {
            let err = validate(&field, input.clone()).unwrap_err();
            assert!(err.is_validation(), "{input:?}");
        }
        let unbounded = NumericField::float("y");
        assert!(validate(&unbounded, Value::from(f64::INFINITY)).unwrap_err().is_validation());
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let field = NumericField::integer("age").with_minimum(12).with_maximum(99);
        for (input, ok) in [(11, false), (12, true), (50, true), (99, true), (100, false)] {
            assert_eq!(validate(&field, Value::from(input)).is_ok(), ok, "{input}");
        }
    }

    #[test]
    fn test_bounds_coerced_to_kind() {
        let field = NumericField::integer("n").with_minimum(1.7).with_maximum(5.2);
        assert_eq!(field.minimum(), Some(Number::Integer(1)));
        assert_eq!(field.maximum(), Some(Number::Integer(5)));

        let field = NumericField::float("x").with_minimum(1);
        assert_eq!(field.minimum(), Some(Number::Float(1.0)));
        assert!(validate(&field, Value::from(0.99)).is_err());
    }

    #[test]
    fn test_assert_valid_checks_exact_kind() {
        let field = NumericField::float("x");
        let mut diagnostics = Diagnostics::new();
        let mut ctx = Context::new(&mut diagnostics);
        assert!(field.assert_valid(&Value::from(1), &mut ctx).is_err());
        assert!(field.assert_valid(&Value::Null, &mut ctx).is_ok());
    }

    #[test]
    fn test_required_null_fails() {
        let field = NumericField::integer("n").required();
        assert!(validate(&field, Value::Null).unwrap_err().is_validation());
    }
}
