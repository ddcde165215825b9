//! Date, time and local date-time fields.
//!
//! Strings are parsed as ISO-8601. Date and date-time fields also accept a
//! Unix timestamp (number or numeric string), interpreted in UTC so the
//! result does not depend on the host's time zone.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};

use super::{Field, FieldBase, FieldType, base_accessors, check_required};
use crate::diagnostics::Context;
use crate::error::FieldError;
use crate::value::{DATE_FORMAT, Value};

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

const TIME_FORMATS: [&str; 2] = ["%H:%M:%S%.f", "%H:%M"];

fn parse_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text, DATE_FORMAT).ok()
}

fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .or_else(|| {
            DateTime::parse_from_rfc3339(text)
                .ok()
                .map(|dt| dt.naive_local())
        })
        .or_else(|| parse_date(text).map(|d| d.and_time(NaiveTime::MIN)))
}

fn parse_time(text: &str) -> Option<NaiveTime> {
    TIME_FORMATS
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(text, format).ok())
}

/// Unix timestamp in seconds, fractional part kept to nanoseconds.
fn from_timestamp(seconds: f64) -> Option<NaiveDateTime> {
    if !seconds.is_finite() {
        return None;
    }
    let whole = seconds.floor();
    let nanos = (((seconds - whole) * 1e9).round() as u32).min(999_999_999);
    DateTime::from_timestamp(whole as i64, nanos).map(|dt| dt.naive_utc())
}

fn timestamp_of(value: &Value) -> Option<NaiveDateTime> {
    match value {
        Value::Integer(i) => DateTime::from_timestamp(*i, 0).map(|dt| dt.naive_utc()),
        Value::Float(f) => from_timestamp(*f),
        Value::Text(s) => s.trim().parse::<f64>().ok().and_then(from_timestamp),
        _ => None,
    }
}

fn to_date(value: &Value) -> Option<Value> {
    let date = match value {
        Value::Date(d) => *d,
        Value::DateTime(dt) => dt.date(),
        Value::Text(s) => match parse_date(s.trim()).or_else(|| parse_datetime(s.trim()).map(|dt| dt.date())) {
            Some(d) => d,
            None => timestamp_of(value)?.date(),
        },
        other => timestamp_of(other)?.date(),
    };
    Some(Value::Date(date))
}

fn to_datetime(value: &Value) -> Option<Value> {
    let datetime = match value {
        Value::DateTime(dt) => *dt,
        Value::Date(d) => d.and_time(NaiveTime::MIN),
        Value::Text(s) => match parse_datetime(s.trim()) {
            Some(dt) => dt,
            None => timestamp_of(value)?,
        },
        other => timestamp_of(other)?,
    };
    Some(Value::DateTime(datetime))
}

fn to_time(value: &Value) -> Option<Value> {
    let time = match value {
        Value::Time(t) => *t,
        Value::DateTime(dt) => dt.time(),
        Value::Text(s) => parse_time(s.trim())?,
        _ => return None,
    };
    Some(Value::Time(time))
}

macro_rules! temporal_field {
    ($ty:ident, $field_type:expr, $variant:ident, $convert:path, $what:literal, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone)]
        pub struct $ty {
            base: FieldBase,
        }

        impl $ty {
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

        impl Field for $ty {
            base_accessors!();

            fn field_type(&self) -> FieldType {
                $field_type
            }

            fn convert(&self, value: Value, ctx: &mut Context<'_>) -> Result<Value, FieldError> {
                if value.is_null() {
                    return Ok(value);
                }
                $convert(&value).ok_or_else(|| {
                    FieldError::conversion(ctx.qualify(self.name()), &value, concat!("not a valid ", $what))
                })
            }

            fn assert_valid(&self, value: &Value, ctx: &mut Context<'_>) -> Result<(), FieldError> {
                let path = ctx.qualify(self.name());
                check_required(self.is_required(), path.clone(), value)?;
                match value {
                    Value::Null | Value::$variant(_) => Ok(()),
                    other => Err(FieldError::validation(
                        path,
                        other,
                        format!(concat!("expected ", $what, ", found {}"), other.type_name()),
                    )),
                }
            }
        }
    };
}

temporal_field!(DateField, FieldType::Date, Date, to_date, "date", "Calendar date field.");
temporal_field!(TimeField, FieldType::Time, Time, to_time, "time", "Wall-clock time field.");
temporal_field!(
    DateTimeField,
    FieldType::DateTime,
    DateTime,
    to_datetime,
    "date-time",
    "Local date-time field (`datetime-local`)."
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Diagnostics;

    fn convert<F: Field>(field: &F, value: Value) -> Result<Value, FieldError> {
        let mut diagnostics = Diagnostics::new();
        let mut ctx = Context::new(&mut diagnostics);
        field.convert(value, &mut ctx)
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_date_from_iso_string() {
        let field = DateField::new("published");
        assert_eq!(
            convert(&field, Value::from("2023-07-14")).unwrap(),
            Value::Date(date(2023, 7, 14))
        );
        assert!(convert(&field, Value::from("14/07/2023")).unwrap_err().is_conversion());
    }

    #[test]
    fn test_date_from_datetime_and_timestamp() {
        let field = DateField::new("published");
        let dt = date(2023, 7, 14).and_hms_opt(23, 59, 0).unwrap();
        assert_eq!(convert(&field, Value::from(dt)).unwrap(), Value::Date(date(2023, 7, 14)));
        assert_eq!(convert(&field, Value::from(86_400)).unwrap(), Value::Date(date(1970, 1, 2)));
        assert_eq!(
            convert(&field, Value::from("86400")).unwrap(),
            Value::Date(date(1970, 1, 2))
        );
    }

    #[test]
    fn test_datetime_formats() {
        let field = DateTimeField::new("at");
        let expected = Value::from(date(2024, 1, 25).and_hms_opt(9, 30, 0).unwrap());
        for input in [
            "2024-01-25T09:30:00",
            "2024-01-25T09:30",
            "2024-01-25 09:30:00",
            "2024-01-25T09:30:00+02:00",
        ] {
            assert_eq!(convert(&field, Value::from(input)).unwrap(), expected, "{input}");
        }
        assert_eq!(
            convert(&field, Value::from(date(2024, 1, 25))).unwrap(),
            Value::from(date(2024, 1, 25).and_hms_opt(0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_datetime_timestamp_is_utc() {
        let field = DateTimeField::new("at");
        assert_eq!(
            convert(&field, Value::from(90.5)).unwrap(),
            Value::from(date(1970, 1, 1).and_hms_milli_opt(0, 1, 30, 500).unwrap())
        );
    }

    #[test]
    fn test_time_formats() {
        let field = TimeField::new("at");
        assert_eq!(
            convert(&field, Value::from("09:05")).unwrap(),
            Value::from(NaiveTime::from_hms_opt(9, 5, 0).unwrap())
        );
        assert_eq!(
            convert(&field, Value::from("09:05:07.25")).unwrap(),
            Value::from(NaiveTime::from_hms_milli_opt(9, 5, 7, 250).unwrap())
        );
        assert!(convert(&field, Value::from(3600)).is_err());
    }

    #[test]
    fn test_assert_valid_requires_typed_value() {
        let field = DateField::new("published").required();
        let mut diagnostics = Diagnostics::new();
        let mut ctx = Context::new(&mut diagnostics);
        assert!(field.assert_valid(&Value::from("2023-07-14"), &mut ctx).is_err());
        assert!(field.assert_valid(&Value::Null, &mut ctx).is_err());
        assert!(field.assert_valid(&Value::Date(date(2023, 7, 14)), &mut ctx).is_ok());
    }
}
