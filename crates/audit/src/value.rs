//! The structured value tree returned by the extraction engine.
//!
//! [`Value`] is a closed, recursive representation of an engine payload.
//! Objects keep the key order the engine produced, because that order decides
//! the column order of any table built from extra (undeclared) keys.
//!
//! Access is defensive by construction: [`Value::field`] never fails, it
//! returns [`Value::Null`] for anything missing, and every variant renders to
//! a flat cell through [`Value::to_cell`].

use serde::{Serialize, Serializer};

/// Delimiter used when a list of values is collapsed into one cell.
pub const LIST_DELIMITER: &str = ", ";

static NULL: Value = Value::Null;

/// A node in an engine payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absent or explicit `null`.
    Null,
    /// `true` / `false`.
    Bool(bool),
    /// A number that fits in an `i64`.
    Integer(i64),
    /// A non-negative integer above `i64::MAX`.
    Unsigned(u64),
    /// Any other number.
    Float(f64),
    /// Free or enumerated text.
    String(String),
    /// An ordered list.
    Array(Vec<Value>),
    /// Key/value pairs in the order the engine produced them.
    Object(Vec<(String, Value)>),
}

impl Value {
    /// Looks up `key` when `self` is an object.
    ///
    /// Returns `None` for missing keys and for non-object values.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Self::Object(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Like [`Value::get`], but degrades to [`Value::Null`] instead of `None`.
    pub fn field(&self, key: &str) -> &Value {
        self.get(key).unwrap_or(&NULL)
    }

    /// Follows a path of object keys, degrading to [`Value::Null`] at the
    /// first missing step.
    pub fn path(&self, keys: &[&str]) -> &Value {
        keys.iter().fold(self, |node, key| node.field(key))
    }

    /// Returns the entries of an object.
    pub fn as_object(&self) -> Option<&[(String, Value)]> {
        match self {
            Self::Object(entries) => Some(entries),
            _ => None,
        }
    }

    /// Returns the elements of an array.
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the text of a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Interprets the value as a flag.
    ///
    /// Engines occasionally encode booleans as text; `"true"` / `"false"` are
    /// accepted case-insensitively. Anything else is `None`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" => Some(true),
                "false" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    /// Returns `true` for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns `true` for arrays and objects.
    pub fn is_collection(&self) -> bool {
        matches!(self, Self::Array(_) | Self::Object(_))
    }

    /// Renders the value as a single flat cell.
    ///
    /// Arrays are joined with [`LIST_DELIMITER`]; objects nested inside arrays
    /// are rendered as compact JSON text. The result never contains structure
    /// that a spreadsheet cell cannot hold.
    pub fn to_cell(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Bool(b) => b.to_string(),
            Self::Integer(i) => i.to_string(),
            Self::Unsigned(u) => u.to_string(),
            Self::Float(f) => f.to_string(),
            Self::String(s) => s.clone(),
            Self::Array(items) => items
                .iter()
                .map(Value::to_cell)
                .collect::<Vec<_>>()
                .join(LIST_DELIMITER),
            Self::Object(_) => serde_json::Value::from(self.clone()).to_string(),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Integer(i)
                } else if let Some(u) = n.as_u64() {
                    Self::Unsigned(u)
                } else {
                    Self::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => {
                Self::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Self::Object(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<Value> for serde_json::Value {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Integer(i) => Self::from(i),
            Value::Unsigned(u) => Self::from(u),
            // Non-finite floats have no JSON form and become null.
            Value::Float(f) => serde_json::Number::from_f64(f)
                .map(Self::Number)
                .unwrap_or(Self::Null),
            Value::String(s) => Self::String(s),
            Value::Array(items) => Self::Array(items.into_iter().map(Self::from).collect()),
            Value::Object(entries) => {
                Self::Object(entries.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serde_json::Value::from(self.clone()).serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn conversion_keeps_engine_key_order() {
        let value = Value::from(json!({"zeta": 1, "alpha": 2, "mid": 3}));
        let keys: Vec<&str> = value
            .as_object()
            .unwrap()
            .iter()
            .map(|(k, _)| k.as_str())
            .collect();
        assert_eq!(keys, ["zeta", "alpha", "mid"]);
    }

    #[test]
    fn missing_fields_degrade_to_null() {
        let value = Value::from(json!({"summary": {"company_name": "Acme"}}));
        assert_eq!(
            value.path(&["summary", "company_name"]).as_str(),
            Some("Acme")
        );
        assert!(value.path(&["summary", "auditor_name"]).is_null());
        assert!(value.path(&["nope", "deeper", "still"]).is_null());
        assert!(Value::String("x".into()).field("anything").is_null());
    }

    #[test]
    fn cells_are_always_flat() {
        assert_eq!(Value::Null.to_cell(), "");
        assert_eq!(Value::Bool(false).to_cell(), "false");
        assert_eq!(Value::Integer(42).to_cell(), "42");
        assert_eq!(Value::Float(1.5).to_cell(), "1.5");
        assert_eq!(
            Value::from(json!(["a", "b", 3])).to_cell(),
            "a, b, 3"
        );
        assert_eq!(
            Value::from(json!([{"k": "v"}, ["x", "y"]])).to_cell(),
            r#"{"k":"v"}, x, y"#
        );
    }

    #[test]
    fn integers_beyond_i64_keep_every_digit() {
        let value = Value::from(json!(18446744073709551615u64));
        assert_eq!(value, Value::Unsigned(u64::MAX));
        assert_eq!(value.to_cell(), "18446744073709551615");
        assert_eq!(serde_json::Value::from(value), json!(u64::MAX));
        assert_eq!(Value::from(json!(-7)).to_cell(), "-7");
    }

    #[test]
    fn textual_booleans_are_understood() {
        assert_eq!(Value::String("True".into()).as_bool(), Some(true));
        assert_eq!(Value::String(" false ".into()).as_bool(), Some(false));
        assert_eq!(Value::String("yes".into()).as_bool(), None);
        assert_eq!(Value::Integer(1).as_bool(), None);
    }

    #[test]
    fn round_trips_through_serde_json() {
        let original = json!({"a": [1, 2.5, null, true], "b": {"c": "d"}});
        let back = serde_json::Value::from(Value::from(original.clone()));
        assert_eq!(back, original);
    }
}
