//! SQL value types bound as upsert parameters.
//!
//! Data point values arrive as loosely-typed JSON. They are converted once into
//! [`SqlValue`] so that coercion and parameter binding work on a closed set of
//! variants instead of arbitrary JSON.

use serde::Serialize;
use serde_json::Value as JsonValue;

/// SQL value enum for type-safe parameter handling.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SqlValue {
    /// NULL (missing property or JSON null).
    Null,

    /// Boolean value.
    Bool(bool),

    /// Signed integer.
    Int(i64),

    /// Unsigned integer that does not fit in `i64`.
    UInt(u64),

    /// Double precision floating point.
    Float(f64),

    /// Text data.
    Text(String),
}

impl From<&JsonValue> for SqlValue {
    fn from(v: &JsonValue) -> Self {
        match v {
            JsonValue::Null => SqlValue::Null,
            JsonValue::Bool(b) => SqlValue::Bool(*b),
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    SqlValue::Int(i)
                } else if let Some(u) = n.as_u64() {
                    SqlValue::UInt(u)
                } else {
                    SqlValue::Float(n.as_f64().unwrap_or_default())
                }
            }
            JsonValue::String(s) => SqlValue::Text(s.clone()),
            // Nested structures are stored as their JSON text
            JsonValue::Array(_) | JsonValue::Object(_) => SqlValue::Text(v.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_scalars() {
        assert_eq!(SqlValue::from(&json!(null)), SqlValue::Null);
        assert_eq!(SqlValue::from(&json!(true)), SqlValue::Bool(true));
        assert_eq!(SqlValue::from(&json!(1)), SqlValue::Int(1));
        assert_eq!(SqlValue::from(&json!(42.2)), SqlValue::Float(42.2));
        assert_eq!(SqlValue::from(&json!(u64::MAX)), SqlValue::UInt(u64::MAX));
        assert_eq!(SqlValue::from(&json!("First")), SqlValue::Text("First".into()));
    }

    #[test]
    fn test_from_json_nested_is_text() {
        let v = SqlValue::from(&json!({"a": [1, 2]}));
        assert_eq!(v, SqlValue::Text(r#"{"a":[1,2]}"#.into()));
    }

    #[test]
    fn test_serialize_untagged() {
        let params = vec![SqlValue::Null, SqlValue::Int(3), SqlValue::Text("x".into())];
        assert_eq!(serde_json::to_string(&params).unwrap(), r#"[null,3,"x"]"#);
    }
}
