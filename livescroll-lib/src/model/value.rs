//! Value enum for dynamic cell values

use std::cmp::Ordering;

use chrono::DateTime;
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

/// A dynamic value that can hold any cell type of a grid row.
///
/// Rows carry their data as a mapping of field name to `Value`, so the core
/// never needs to know the concrete schema of the dataset it pages through.
///
/// # Type Mapping
///
/// | JSON / source type | Rust Variant |
/// |--------------------|--------------|
/// | null | `Null` |
/// | boolean | `Bool` |
/// | integer | `Long` |
/// | floating point | `Float` |
/// | decimal | `Decimal` |
/// | string | `String` |
/// | uuid | `Guid` |
/// | timestamp | `DateTime` |
/// | anything else | `Json` |
///
/// # Example
///
/// ```
/// use livescroll_lib::model::Value;
///
/// let name = Value::from("Contoso");
/// let revenue = Value::from(1_000_000i64);
/// let active = Value::from(true);
/// let empty = Value::Null;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Null/empty value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// 64-bit integer.
    Long(i64),
    /// 64-bit floating point.
    Float(f64),
    /// Arbitrary precision decimal.
    Decimal(Decimal),
    /// GUID/UUID value.
    Guid(Uuid),
    /// Date and time with timezone.
    DateTime(DateTime<Utc>),
    /// String value.
    String(String),
    /// Fallback for unrecognized JSON values.
    Json(serde_json::Value),
}

impl Value {
    /// Returns `true` if this is a null value.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the type name of this value.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Long(_) => "long",
            Value::Float(_) => "float",
            Value::Decimal(_) => "decimal",
            Value::Guid(_) => "guid",
            Value::DateTime(_) => "datetime",
            Value::String(_) => "string",
            Value::Json(_) => "json",
        }
    }

    /// Renders the value as a row identifier.
    ///
    /// Only scalar identity-like values qualify: strings, integers and GUIDs.
    pub fn as_id(&self) -> Option<String> {
        match self {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Long(n) => Some(n.to_string()),
            Value::Guid(g) => Some(g.to_string()),
            _ => None,
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Long(n) => Some(*n as f64),
            Value::Float(f) => Some(*f),
            Value::Decimal(d) => d.to_f64(),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Long(_) | Value::Float(_) | Value::Decimal(_) => 2,
            Value::DateTime(_) => 3,
            Value::Guid(_) => 4,
            Value::String(_) => 5,
            Value::Json(_) => 6,
        }
    }

    /// Total ordering used when sorting rows by a field.
    ///
    /// Nulls sort first. Numeric variants compare by magnitude across types;
    /// otherwise values of different types order by a fixed type rank.
    pub fn sort_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Long(a), Value::Long(b)) => a.cmp(b),
            (Value::Decimal(a), Value::Decimal(b)) => a.cmp(b),
            (Value::DateTime(a), Value::DateTime(b)) => a.cmp(b),
            (Value::Guid(a), Value::Guid(b)) => a.cmp(b),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::Json(a), Value::Json(b)) => a.to_string().cmp(&b.to_string()),
            _ => match (self.as_f64(), other.as_f64()) {
                (Some(a), Some(b)) => a.total_cmp(&b),
                _ => self.rank().cmp(&other.rank()),
            },
        }
    }
}

// =============================================================================
// From implementations
// =============================================================================

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Long(v.into())
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Long(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<Decimal> for Value {
    fn from(v: Decimal) -> Self {
        Value::Decimal(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Value::Guid(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::DateTime(v)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::Json(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(inner) => inner.into(),
            None => Value::Null,
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_id() {
        assert_eq!(Value::from("r5").as_id(), Some("r5".to_string()));
        assert_eq!(Value::from(42i64).as_id(), Some("42".to_string()));
        assert_eq!(Value::from("").as_id(), None);
        assert_eq!(Value::Null.as_id(), None);
        assert_eq!(Value::from(1.5).as_id(), None);
    }

    #[test]
    fn test_sort_cmp_nulls_first() {
        assert_eq!(Value::Null.sort_cmp(&Value::from(1i64)), Ordering::Less);
        assert_eq!(Value::from("a").sort_cmp(&Value::Null), Ordering::Greater);
    }

    #[test]
    fn test_sort_cmp_mixed_numbers() {
        assert_eq!(Value::from(2i64).sort_cmp(&Value::from(1.5)), Ordering::Greater);
        assert_eq!(
            Value::from(Decimal::new(150, 2)).sort_cmp(&Value::from(2i64)),
            Ordering::Less
        );
    }

    #[test]
    fn test_deserialize_untagged() {
        let v: Value = serde_json::from_str("12").unwrap();
        assert_eq!(v, Value::Long(12));
        let v: Value = serde_json::from_str("true").unwrap();
        assert_eq!(v, Value::Bool(true));
        let v: Value = serde_json::from_str("null").unwrap();
        assert!(v.is_null());
    }
}
