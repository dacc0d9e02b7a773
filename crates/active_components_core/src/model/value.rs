//! Scalar attribute values.
//!
//! # Responsibility
//! - Define the closed set of values a record attribute may hold.
//! - Convert between attribute values and SQLite storage values.
//!
//! # Invariants
//! - `Null` is the only "absent" value; persistence payloads never carry it.
//! - Text rendering follows scalar coercion rules: `Null` and `false` render
//!   as an empty string, `true` renders as `"1"`.

use rusqlite::types::{ToSql, ToSqlOutput, Value, ValueRef};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

/// Attribute name to value mapping.
///
/// Ordered so that payloads, diffs and generated SQL are deterministic.
pub type AttributeMap = BTreeMap<String, AttributeValue>;

/// One scalar attribute value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    #[default]
    Null,
    Bool(bool),
    Integer(i64),
    Real(f64),
    Text(String),
}

impl AttributeValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns whether the value counts as empty for `allowEmpty` checks.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Text(value) => value.is_empty(),
            _ => false,
        }
    }

    /// Returns whether the value is "truthy" (non-null, non-zero, non-empty).
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Bool(value) => *value,
            Self::Integer(value) => *value != 0,
            Self::Real(value) => *value != 0.0,
            Self::Text(value) => !value.is_empty() && value != "0",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(*value),
            Self::Text(value) => value.parse().ok(),
            _ => None,
        }
    }

    /// Renders the value as text using scalar coercion rules.
    pub fn to_text(&self) -> String {
        match self {
            Self::Null | Self::Bool(false) => String::new(),
            Self::Bool(true) => "1".to_string(),
            Self::Integer(value) => value.to_string(),
            Self::Real(value) => value.to_string(),
            Self::Text(value) => value.clone(),
        }
    }

    /// Returns a copy with surrounding whitespace removed from text values.
    pub(crate) fn trimmed(self) -> Self {
        match self {
            Self::Text(value) => {
                let trimmed = value.trim();
                if trimmed.len() == value.len() {
                    Self::Text(value)
                } else {
                    Self::Text(trimmed.to_string())
                }
            }
            other => other,
        }
    }
}

impl Display for AttributeValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_text())
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for AttributeValue {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl<T: Into<AttributeValue>> From<Option<T>> for AttributeValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl ToSql for AttributeValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Self::Null => ToSqlOutput::Owned(Value::Null),
            Self::Bool(value) => ToSqlOutput::Owned(Value::Integer(i64::from(*value))),
            Self::Integer(value) => ToSqlOutput::Owned(Value::Integer(*value)),
            Self::Real(value) => ToSqlOutput::Owned(Value::Real(*value)),
            Self::Text(value) => ToSqlOutput::Borrowed(ValueRef::Text(value.as_bytes())),
        })
    }
}

impl TryFrom<ValueRef<'_>> for AttributeValue {
    type Error = String;

    fn try_from(value: ValueRef<'_>) -> Result<Self, Self::Error> {
        match value {
            ValueRef::Null => Ok(Self::Null),
            ValueRef::Integer(value) => Ok(Self::Integer(value)),
            ValueRef::Real(value) => Ok(Self::Real(value)),
            ValueRef::Text(bytes) => std::str::from_utf8(bytes)
                .map(|text| Self::Text(text.to_string()))
                .map_err(|err| format!("text column is not valid UTF-8: {err}")),
            ValueRef::Blob(_) => Err("blob columns are not supported as attributes".to_string()),
        }
    }
}

/// Builds an attribute map from `(name, value)` pairs.
pub fn attribute_map<I, K, V>(pairs: I) -> AttributeMap
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<AttributeValue>,
{
    pairs
        .into_iter()
        .map(|(name, value)| (name.into(), value.into()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{attribute_map, AttributeValue};

    #[test]
    fn text_rendering_follows_scalar_coercion() {
        assert_eq!(AttributeValue::Null.to_text(), "");
        assert_eq!(AttributeValue::Bool(false).to_text(), "");
        assert_eq!(AttributeValue::Bool(true).to_text(), "1");
        assert_eq!(AttributeValue::Integer(42).to_text(), "42");
        assert_eq!(AttributeValue::from("ok").to_text(), "ok");
    }

    #[test]
    fn only_null_and_empty_text_are_empty() {
        assert!(AttributeValue::Null.is_empty());
        assert!(AttributeValue::from("").is_empty());
        assert!(!AttributeValue::from("0").is_empty());
        assert!(!AttributeValue::Integer(0).is_empty());
        assert!(!AttributeValue::Bool(false).is_empty());
    }

    #[test]
    fn trimmed_only_touches_text() {
        assert_eq!(
            AttributeValue::from("  ok  ").trimmed(),
            AttributeValue::from("ok")
        );
        assert_eq!(AttributeValue::Integer(7).trimmed(), AttributeValue::Integer(7));
    }

    #[test]
    fn serializes_as_plain_json_scalars() {
        let map = attribute_map([
            ("id", AttributeValue::Integer(3)),
            ("name", AttributeValue::from("Al")),
            ("bio", AttributeValue::Null),
        ]);
        let json = serde_json::to_value(&map).unwrap();
        assert_eq!(json, serde_json::json!({"bio": null, "id": 3, "name": "Al"}));

        let decoded: super::AttributeMap = serde_json::from_value(json).unwrap();
        assert_eq!(decoded, map);
    }
}
