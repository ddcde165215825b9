//! Object fields grouping named subfields.

use super::{Field, FieldType, SchemaField, check_required, describe_base};
use crate::diagnostics::{Context, DiagnosticKind};
use crate::error::{FieldError, SchemaError};
use crate::value::{Map, Value};

/// A mapping of named subfields.
///
/// A composite is required when any subfield is required, and its default
/// is the mapping of its subfields' own defaults. A value of a
/// non-repeatable composite may arrive as a one-element list (storage
/// cannot tell the two apart); conversion keeps the first element.
///
/// # Examples
///
/// ```
/// use mdschema_core::{CompositeField, Context, Diagnostics, Field, NumericField, TextField, Value};
/// use serde_json::json;
///
/// let author = CompositeField::new(
///     "author",
///     vec![
///         TextField::new("name").required().into(),
///         NumericField::integer("age").into(),
///     ],
/// )
/// .unwrap();
/// assert!(author.is_required());
///
/// let mut diagnostics = Diagnostics::new();
/// let mut ctx = Context::new(&mut diagnostics);
/// let value = author
///     .validate(Value::from(json!([{"name": "Jane", "age": "42"}])), &mut ctx)
///     .unwrap();
/// assert_eq!(value, Value::from(json!({"name": "Jane", "age": 42})));
/// ```
#[derive(Debug, Clone)]
pub struct CompositeField {
    name: String,
    fields: Vec<SchemaField>,
}

impl CompositeField {
    /// Creates a composite over `fields`, in declaration order.
    ///
    /// # Errors
    ///
    /// Fails when `fields` is empty, a subfield name cannot appear in a flat
    /// path, or two subfields share a name.
    pub fn new(name: impl Into<String>, fields: Vec<SchemaField>) -> Result<Self, SchemaError> {
        let name = name.into();
        if fields.is_empty() {
            return Err(SchemaError::EmptyComposite(name));
        }
        for (i, field) in fields.iter().enumerate() {
            if !is_path_segment(field.name()) {
                return Err(SchemaError::InvalidFieldName {
                    field: name,
                    child: field.name().to_string(),
                });
            }
            if fields[..i].iter().any(|f| f.name() == field.name()) {
                return Err(SchemaError::DuplicateField {
                    field: name,
                    child: field.name().to_string(),
                });
            }
        }
        Ok(Self { name, fields })
    }

    /// Subfields in declaration order.
    pub fn fields(&self) -> &[SchemaField] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&SchemaField> {
        self.fields.iter().find(|f| f.name() == name)
    }

    fn field_mut(&mut self, name: &str) -> Option<&mut SchemaField> {
        self.fields.iter_mut().find(|f| f.name() == name)
    }

    /// Resolves a path of subfield names, descending through nested
    /// composites (repeatable or not).
    pub fn resolve(&self, path: &[&str]) -> Option<&SchemaField> {
        let (first, rest) = path.split_first()?;
        let field = self.field(first)?;
        if rest.is_empty() {
            Some(field)
        } else {
            field.subfields()?.resolve(rest)
        }
    }

    /// Turns `value` into the mapping to validate, collapsing a list to its
    /// first element when conversion is enabled.
    fn take_mapping(&self, value: Value, ctx: &mut Context<'_>) -> Result<Map, FieldError> {
        match value {
            Value::Map(map) => Ok(map),
            v if v.is_empty() => Ok(Map::new()),
            Value::List(items) if ctx.options().convert => match self.first_of(items, ctx) {
                Some(first) => self.take_mapping(first, ctx),
                None => Ok(Map::new()),
            },
            other => {
                let path = ctx.qualify(&self.name);
                let message = format!("expected mapping, found {}", other.type_name());
                if ctx.options().convert {
                    Err(FieldError::conversion(path, &other, message))
                } else {
                    Err(FieldError::validation(path, &other, message))
                }
            }
        }
    }

    /// First element of a list given to a non-repeatable composite; the rest
    /// is reported as ignored.
    fn first_of(&self, items: Vec<Value>, ctx: &mut Context<'_>) -> Option<Value> {
        let extra = items.len().saturating_sub(1);
        if extra > 0 {
            let path = ctx.qualify(&self.name);
            ctx.note(
                DiagnosticKind::ValueIgnored,
                path,
                format!("field is not repeatable, {extra} extra value(s) ignored"),
            );
        }
        items.into_iter().next()
    }
}

impl Field for CompositeField {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    fn field_type(&self) -> FieldType {
        FieldType::Object
    }

    fn is_required(&self) -> bool {
        self.fields.iter().any(Field::is_required)
    }

    fn default_value(&self) -> Option<Value> {
        let defaults: Map = self
            .fields
            .iter()
            .filter_map(|f| f.default_value().map(|d| (f.name().to_string(), d)))
            .collect();
        (!defaults.is_empty()).then_some(Value::Map(defaults))
    }

    /// Overrides subfield defaults key by key; `None` clears them all.
    fn set_default(&mut self, default: Option<Value>) -> Result<(), SchemaError> {
        match default {
            None => {
                for field in &mut self.fields {
                    field.set_default(None)?;
                }
                Ok(())
            }
            Some(Value::Map(map)) => {
                for (key, value) in map {
                    let Some(field) = self.field_mut(&key) else {
                        return Err(SchemaError::UnknownDefaultKey {
                            field: self.name.clone(),
                            child: key,
                        });
                    };
                    field.set_default(Some(value))?;
                }
                Ok(())
            }
            Some(other) => Err(SchemaError::InvalidDeclaration {
                field: self.name.clone(),
                reason: format!("default must be a mapping, found {}", other.type_name()),
            }),
        }
    }

    fn convert(&self, value: Value, ctx: &mut Context<'_>) -> Result<Value, FieldError> {
        match value {
            v if v.is_empty() => Ok(Value::Map(Map::new())),
            Value::List(items) => match self.first_of(items, ctx) {
                Some(first) => self.convert(first, ctx),
                None => Ok(Value::Map(Map::new())),
            },
            Value::Map(map) => {
                let mut inner = ctx.enter(&self.name);
                let mut converted = Map::new();
                for (key, value) in map {
                    match self.field(&key) {
                        Some(field) => {
                            let value = field.convert(value, &mut inner)?;
                            converted.insert(key, value);
                        }
                        None => {
                            let path = inner.qualify(&key);
                            inner.note(DiagnosticKind::UnknownField, path, "not defined in the schema, dropped");
                        }
                    }
                }
                Ok(Value::Map(converted))
            }
            other => Err(FieldError::conversion(
                ctx.qualify(&self.name),
                &other,
                format!("cannot convert {} to a mapping", other.type_name()),
            )),
        }
    }

    fn assert_valid(&self, value: &Value, ctx: &mut Context<'_>) -> Result<(), FieldError> {
        let map = match value {
            Value::Null => return check_required(self.is_required(), ctx.qualify(&self.name), value),
            Value::Map(map) => map,
            other => {
                return Err(FieldError::validation(
                    ctx.qualify(&self.name),
                    other,
                    format!("expected mapping, found {}", other.type_name()),
                ));
            }
        };
        let mut inner = ctx.enter(&self.name);
        for (key, value) in map.iter() {
            let Some(field) = self.field(key) else {
                return Err(FieldError::validation(inner.qualify(key), value, "not defined in the schema"));
            };
            field.assert_valid(value, &mut inner)?;
        }
        for field in &self.fields {
            if field.is_required() && !map.contains_key(field.name()) {
                return Err(FieldError::validation(
                    inner.qualify(field.name()),
                    &Value::Null,
                    "value required",
                ));
            }
        }
        Ok(())
    }

    fn apply_default(&self, value: Value, ctx: &mut Context<'_>) -> Result<Value, FieldError> {
        match value {
            v if v.is_empty() => match self.default_value() {
                Some(default) => {
                    let path = ctx.qualify(&self.name);
                    ctx.note(DiagnosticKind::DefaultApplied, path, "empty value replaced by subfield defaults");
                    self.convert(default, ctx)
                }
                None => Ok(v),
            },
            Value::Map(mut map) => {
                let mut inner = ctx.enter(&self.name);
                for field in &self.fields {
                    let slot = map.get_mut(field.name());
                    match slot {
                        Some(slot) => {
                            let current = std::mem::take(slot);
                            *slot = field.apply_default(current, &mut inner)?;
                        }
                        None if field.default_value().is_some() => {
                            let value = field.apply_default(Value::Null, &mut inner)?;
                            map.insert(field.name(), value);
                        }
                        None => {}
                    }
                }
                Ok(Value::Map(map))
            }
            other => Ok(other),
        }
    }

    /// Validates each supplied key with its subfield's full pipeline, then
    /// fills or checks the absent subfields.
    fn validate(&self, value: Value, ctx: &mut Context<'_>) -> Result<Value, FieldError> {
        let options = ctx.options();
        let input = if value.is_empty() && options.apply_defaults {
            match self.default_value() {
                Some(default) => {
                    let path = ctx.qualify(&self.name);
                    ctx.note(DiagnosticKind::DefaultApplied, path, "empty value replaced by subfield defaults");
                    default
                }
                None => value,
            }
        } else {
            value
        };
        let input = self.take_mapping(input, ctx)?;
        let required = self.is_required();
        let path = ctx.qualify(&self.name);

        let mut inner = ctx.enter(&self.name);
        let mut output = Map::new();
        for (key, value) in input {
            let Some(field) = self.field(&key) else {
                return Err(FieldError::validation(inner.qualify(&key), &value, "not defined in the schema"));
            };
            let value = field.validate(value, &mut inner)?;
            output.insert(key, value);
        }
        for field in &self.fields {
            if output.contains_key(field.name()) {
                continue;
            }
            let has_default = options.apply_defaults && field.default_value().is_some();
            if has_default || field.is_required() {
                let value = field.validate(Value::Null, &mut inner)?;
                output.insert(field.name(), value);
            } else {
                let child = inner.qualify(field.name());
                inner.note(DiagnosticKind::MissingOptional, child, "optional field absent");
            }
        }

        let output = Value::Map(output);
        if required && output.as_map().is_some_and(Map::is_empty) {
            return Err(FieldError::validation(path, &output, "value required"));
        }
        Ok(output)
    }

    fn description(&self) -> String {
        let mut lines = vec![describe_base(self), "Fields:".to_string()];
        for field in &self.fields {
            lines.push(format!("- {}", field.name()));
            lines.extend(field.description().lines().map(|l| format!("    {l}")));
        }
        lines.join("\n")
    }
}

/// Whether `name` survives flattening as a single path segment.
pub(crate) fn is_path_segment(name: &str) -> bool {
    !name.is_empty() && !name.contains(['.', '[', ']'])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Diagnostics;
    use crate::fields::{MultipleField, NumericField, TextField};
    use serde_json::json;

    fn author() -> CompositeField {
        CompositeField::new(
            "author",
            vec![
                TextField::new("name").required().into(),
                NumericField::integer("age").with_minimum(12).with_maximum(99).into(),
                MultipleField::new("role", ["writer", "editor"])
                    .unwrap()
                    .with_default("writer")
                    .into(),
            ],
        )
        .unwrap()
    }

    fn validate(field: &CompositeField, value: serde_json::Value) -> (Result<Value, FieldError>, Diagnostics) {
        let mut diagnostics = Diagnostics::new();
        let mut ctx = Context::new(&mut diagnostics);
        let result = field.validate(Value::from(value), &mut ctx);
        (result, diagnostics)
    }

    #[test]
    fn test_construction_errors() {
        assert_eq!(
            CompositeField::new("c", vec![]).unwrap_err(),
            SchemaError::EmptyComposite("c".into())
        );
        let err = CompositeField::new(
            "c",
            vec![TextField::new("x").into(), TextField::new("x").into()],
        )
        .unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateField { .. }));

        for name in ["a.b", "tags[0]", "x]", ""] {
            assert_eq!(
                CompositeField::new("c", vec![TextField::new(name).into()]).unwrap_err(),
                SchemaError::InvalidFieldName {
                    field: "c".into(),
                    child: name.into()
                }
            );
        }
    }

    #[test]
    fn test_derived_required_and_default() {
        let field = author();
        assert!(field.is_required());
        assert_eq!(field.default_value(), Some(Value::from(json!({"role": "writer"}))));
    }

    #[test]
    fn test_validate_fills_defaults_and_converts() {
        let (result, diagnostics) = validate(&author(), json!({"name": "Jane", "age": "40"}));
        assert_eq!(
            result.unwrap(),
            Value::from(json!({"name": "Jane", "age": 40, "role": "writer"}))
        );
        assert!(diagnostics.has(DiagnosticKind::DefaultApplied));
    }

    #[test]
    fn test_validate_rejects_unknown_key() {
        let (result, _) = validate(&author(), json!({"name": "Jane", "isbn": "x"}));
        let err = result.unwrap_err();
        assert!(err.is_validation());
        assert_eq!(err.field(), "author.isbn");
    }

    #[test]
    fn test_missing_required_child_is_reported_with_path() {
        let (result, _) = validate(&author(), json!({"age": 30}));
        assert_eq!(result.unwrap_err().field(), "author.name");
    }

    #[test]
    fn test_missing_optional_child_is_advisory() {
        let (result, diagnostics) = validate(&author(), json!({"name": "Jane"}));
        assert!(result.unwrap().get("age").is_none());
        assert!(diagnostics.has(DiagnosticKind::MissingOptional));
    }

    #[test]
    fn test_child_range_error_bubbles_up() {
        let (result, _) = validate(&author(), json!({"name": "Jane", "age": 7}));
        let err = result.unwrap_err();
        assert_eq!(err.field(), "author.age");
        assert_eq!(err.value(), &Value::from(7));
    }

    #[test]
    fn test_list_collapses_to_first_element() {
        let (result, diagnostics) = validate(&author(), json!([{"name": "A"}, {"name": "B"}]));
        assert_eq!(result.unwrap().get("name"), Some(&Value::from("A")));
        assert!(diagnostics.has(DiagnosticKind::ValueIgnored));
    }

    #[test]
    fn test_convert_drops_unknown_keys() {
        let mut diagnostics = Diagnostics::new();
        let mut ctx = Context::new(&mut diagnostics);
        let value = author()
            .convert(Value::from(json!({"name": "Jane", "isbn": "x"})), &mut ctx)
            .unwrap();
        assert_eq!(value, Value::from(json!({"name": "Jane"})));
        assert!(diagnostics.has(DiagnosticKind::UnknownField));
    }

    #[test]
    fn test_convert_empty_and_scalar() {
        let mut diagnostics = Diagnostics::new();
        let mut ctx = Context::new(&mut diagnostics);
        let field = author();
        assert_eq!(field.convert(Value::Null, &mut ctx).unwrap(), Value::Map(Map::new()));
        assert!(field.convert(Value::from(3), &mut ctx).unwrap_err().is_conversion());
    }

    #[test]
    fn test_set_default_overrides_children() {
        let mut field = CompositeField::new(
            "c",
            vec![NumericField::integer("a").into(), NumericField::integer("b").with_default(1).into()],
        )
        .unwrap();
        field.set_default(Some(Value::from(json!({"b": 5})))).unwrap();
        assert_eq!(field.field("b").unwrap().default_value(), Some(Value::from(5)));

        let mut diagnostics = Diagnostics::new();
        let mut ctx = Context::new(&mut diagnostics);
        assert_eq!(
            field.apply_default(Value::Null, &mut ctx).unwrap(),
            Value::from(json!({"b": 5}))
        );

        let err = field.set_default(Some(Value::from(json!({"z": 1})))).unwrap_err();
        assert!(matches!(err, SchemaError::UnknownDefaultKey { .. }));
    }

    #[test]
    fn test_apply_default_fills_partial_mapping() {
        let mut diagnostics = Diagnostics::new();
        let mut ctx = Context::new(&mut diagnostics);
        let value = author()
            .apply_default(Value::from(json!({"name": "Jane"})), &mut ctx)
            .unwrap();
        assert_eq!(value, Value::from(json!({"name": "Jane", "role": "writer"})));
    }

    #[test]
    fn test_assert_valid() {
        let field = author();
        let mut diagnostics = Diagnostics::new();
        let mut ctx = Context::new(&mut diagnostics);
        assert!(field.assert_valid(&Value::from(json!({"name": "Jane"})), &mut ctx).is_ok());
        assert!(field.assert_valid(&Value::from(json!({"age": 20})), &mut ctx).is_err());
        assert!(field.assert_valid(&Value::Null, &mut ctx).is_err());
        assert!(field.assert_valid(&Value::from("x"), &mut ctx).is_err());
    }

    #[test]
    fn test_resolve_nested() {
        let book = CompositeField::new("book", vec![SchemaField::from(author()).into_repeatable()]).unwrap();
        assert_eq!(book.resolve(&["author", "age"]).unwrap().name(), "age");
        assert!(book.resolve(&["author", "isbn"]).is_none());
        assert!(book.resolve(&[]).is_none());
    }

    #[test]
    fn test_description_lists_children() {
        let text = author().description();
        assert!(text.contains("Type: object."));
        assert!(text.contains("- name"));
        assert!(text.contains("Minimum: 12."));
    }
}
