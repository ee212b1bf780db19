//! Dynamically typed table cells read from the source database.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value as JsonValue;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Storage class of a source column as reported by the database catalogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColumnKind {
    /// `smallint`, `integer`, `bigint`.
    Integer,
    /// `real`, `double precision`, `numeric`.
    Float,
    /// `boolean`.
    Boolean,
    /// `timestamp` with or without time zone.
    Timestamp,
    /// `date`.
    Date,
    /// Character types.
    Text,
    /// Anything else (`uuid`, `jsonb`, arrays, user-defined types).
    #[default]
    Other,
}

impl ColumnKind {
    /// Classify an `information_schema.columns.data_type` string.
    ///
    /// # Examples
    /// ```
    /// use parc_core::ColumnKind;
    ///
    /// assert_eq!(ColumnKind::from_data_type("double precision"), ColumnKind::Float);
    /// assert_eq!(ColumnKind::from_data_type("USER-DEFINED"), ColumnKind::Other);
    /// ```
    #[must_use]
    pub fn from_data_type(data_type: &str) -> Self {
        match data_type.trim().to_ascii_lowercase().as_str() {
            "smallint" | "integer" | "bigint" => Self::Integer,
            "real" | "double precision" | "numeric" | "decimal" => Self::Float,
            "boolean" => Self::Boolean,
            "timestamp without time zone" | "timestamp with time zone" => Self::Timestamp,
            "date" => Self::Date,
            "text" | "character varying" | "character" | "name" => Self::Text,
            _ => Self::Other,
        }
    }
}

/// A single cell of a record or feature table.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Missing value.
    Null,
    /// Boolean flag.
    Bool(bool),
    /// Integral number.
    Int(i64),
    /// Floating point number.
    Float(f64),
    /// Free text.
    Text(String),
    /// Timestamp, normalised to UTC when the source carried an offset.
    Timestamp(NaiveDateTime),
    /// Calendar date.
    Date(NaiveDate),
    /// Structured value the pipeline does not interpret.
    Json(JsonValue),
}

impl Value {
    /// Decode a JSON cell produced by `to_jsonb` using the column's catalogue type.
    ///
    /// Timestamps and dates arrive as ISO-8601 strings; strings that fail to
    /// parse are kept as text.
    ///
    /// # Examples
    /// ```
    /// use parc_core::{ColumnKind, Value};
    /// use serde_json::json;
    ///
    /// assert_eq!(Value::from_json(json!(3), ColumnKind::Integer), Value::Int(3));
    /// assert_eq!(Value::from_json(json!(3), ColumnKind::Float), Value::Float(3.0));
    /// assert_eq!(Value::from_json(json!(null), ColumnKind::Text), Value::Null);
    /// ```
    #[must_use]
    pub fn from_json(json: JsonValue, kind: ColumnKind) -> Self {
        match json {
            JsonValue::Null => Self::Null,
            JsonValue::Bool(flag) => Self::Bool(flag),
            JsonValue::Number(number) => {
                let decoded = if kind == ColumnKind::Float {
                    number.as_f64().map(Self::Float)
                } else {
                    number
                        .as_i64()
                        .map(Self::Int)
                        .or_else(|| number.as_f64().map(Self::Float))
                };
                decoded.unwrap_or_else(|| Self::Json(JsonValue::Number(number)))
            }
            JsonValue::String(text) => match kind {
                ColumnKind::Timestamp => parse_timestamp(&text).map_or(Self::Text(text), Self::Timestamp),
                ColumnKind::Date => NaiveDate::parse_from_str(&text, DATE_FORMAT)
                    .map_or(Self::Text(text), Self::Date),
                _ => Self::Text(text),
            },
            other => Self::Json(other),
        }
    }

    /// Report whether the cell is missing.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Numeric view of the cell, if it holds a number.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(value) => {
                #[expect(clippy::cast_precision_loss, reason = "identifiers fit in f64 mantissa")]
                let widened = *value as f64;
                Some(widened)
            }
            Self::Float(value) => Some(*value),
            _ => None,
        }
    }

    /// Text view of the cell, if it holds text.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Convert the cell to its text rendering; nulls stay null.
    #[must_use]
    pub fn into_text(self) -> Self {
        match self {
            Self::Null => Self::Null,
            Self::Text(text) => Self::Text(text),
            other => Self::Text(other.to_string()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Bool(flag) => write!(f, "{flag}"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::Text(text) => f.write_str(text),
            Self::Timestamp(timestamp) => write!(f, "{}", timestamp.format(TIMESTAMP_FORMAT)),
            Self::Date(date) => write!(f, "{}", date.format(DATE_FORMAT)),
            Self::Json(json) => write!(f, "{json}"),
        }
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for Value {
    fn from(flag: bool) -> Self {
        Self::Bool(flag)
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Self>,
{
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    DateTime::parse_from_rfc3339(text)
        .map(|stamped| stamped.naive_utc())
        .or_else(|_| NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case("integer", ColumnKind::Integer)]
    #[case("BIGINT", ColumnKind::Integer)]
    #[case("numeric", ColumnKind::Float)]
    #[case("boolean", ColumnKind::Boolean)]
    #[case("timestamp with time zone", ColumnKind::Timestamp)]
    #[case("date", ColumnKind::Date)]
    #[case("character varying", ColumnKind::Text)]
    #[case("uuid", ColumnKind::Other)]
    fn classifies_catalogue_types(#[case] data_type: &str, #[case] expected: ColumnKind) {
        assert_eq!(ColumnKind::from_data_type(data_type), expected);
    }

    #[rstest]
    fn decodes_timestamps_with_offset_to_utc() {
        let value = Value::from_json(json!("2024-11-18T10:30:00-08:00"), ColumnKind::Timestamp);
        let expected = NaiveDate::from_ymd_opt(2024, 11, 18)
            .and_then(|date| date.and_hms_opt(18, 30, 0))
            .expect("valid timestamp");
        assert_eq!(value, Value::Timestamp(expected));
    }

    #[rstest]
    fn decodes_naive_timestamps() {
        let value = Value::from_json(json!("2024-11-18T10:30:00.25"), ColumnKind::Timestamp);
        assert!(matches!(value, Value::Timestamp(_)), "got {value:?}");
        assert_eq!(value.to_string(), "2024-11-18T10:30:00.250");
    }

    #[rstest]
    fn unparseable_timestamps_stay_text() {
        let value = Value::from_json(json!("yesterday"), ColumnKind::Timestamp);
        assert_eq!(value, Value::Text("yesterday".into()));
    }

    #[rstest]
    fn structured_values_are_opaque() {
        let value = Value::from_json(json!({"a": 1}), ColumnKind::Other);
        assert_eq!(value.into_text(), Value::Text(r#"{"a":1}"#.into()));
    }

    #[rstest]
    fn null_survives_text_coercion() {
        assert_eq!(Value::Null.into_text(), Value::Null);
        assert_eq!(Value::Int(42).into_text(), Value::Text("42".into()));
    }
}
