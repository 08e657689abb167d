//! Typed values exchanged between the payload codecs and the OSC side.
//!
//! A decoded MQTT payload and an inbound OSC argument list both become a
//! `Vec<Value>`; coercion, template rendering and re-encoding all operate
//! on this one representation.

use std::fmt;

/// A single decoded value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Boolean.
    Bool(bool),
    /// Signed integer (all integer wire widths widen to this).
    Int(i64),
    /// Floating point (f32 wire values widen to this).
    Float(f64),
    /// Text.
    Str(String),
    /// Opaque bytes (raw payloads, OSC blobs, struct `s` fields).
    Bytes(Vec<u8>),
    /// A composite JSON value (object, nested array, or null).
    Json(serde_json::Value),
}

impl Value {
    /// Convert a parsed JSON value into a `Value`.
    ///
    /// Scalars map to their scalar variants; objects, nested arrays and
    /// null stay composite.
    pub fn from_json(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(ref n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else {
                    Value::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => Value::Str(s),
            other => Value::Json(other),
        }
    }

    /// Render this value as JSON.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::Number((*i).into()),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Str(s) => serde_json::Value::String(s.clone()),
            Value::Bytes(b) => serde_json::Value::Array(
                b.iter().map(|byte| serde_json::Value::Number((*byte).into())).collect(),
            ),
            Value::Json(v) => v.clone(),
        }
    }

    /// Short name of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::Bytes(_) => "bytes",
            Value::Json(_) => "json",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => f.write_str(s),
            Value::Bytes(b) => f.write_str(&String::from_utf8_lossy(b)),
            Value::Json(v) => write!(f, "{}", v),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

/// Render a value sequence as a compact JSON array, e.g. `[1,2,3]`.
///
/// This is what the `{_values}` template placeholder expands to.
pub fn render_sequence(values: &[Value]) -> String {
    let array = serde_json::Value::Array(values.iter().map(Value::to_json).collect());
    array.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_json_scalars() {
        assert_eq!(Value::from_json(serde_json::json!(5)), Value::Int(5));
        assert_eq!(Value::from_json(serde_json::json!(1.5)), Value::Float(1.5));
        assert_eq!(Value::from_json(serde_json::json!(true)), Value::Bool(true));
        assert_eq!(
            Value::from_json(serde_json::json!("on")),
            Value::Str("on".into())
        );
    }

    #[test]
    fn test_from_json_composite() {
        let obj = serde_json::json!({"a": 1});
        assert_eq!(Value::from_json(obj.clone()), Value::Json(obj));
        assert_eq!(
            Value::from_json(serde_json::Value::Null),
            Value::Json(serde_json::Value::Null)
        );
    }

    #[test]
    fn test_render_sequence() {
        let values = vec![Value::Int(1), Value::Str("x".into()), Value::Float(2.5)];
        assert_eq!(render_sequence(&values), r#"[1,"x",2.5]"#);
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Int(42).to_string(), "42");
        assert_eq!(Value::Str("abc".into()).to_string(), "abc");
        assert_eq!(Value::Bool(false).to_string(), "false");
    }
}
