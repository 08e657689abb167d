//! Positional scalar coercions applied after decode / before encode.

use crate::error::ConvertError;
use crate::value::Value;

/// A scalar conversion selected by name in a rule's `from_mqtt` /
/// `from_osc` lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coercion {
    Float,
    Int,
    Str,
    Bool,
}

impl Coercion {
    /// Resolve a coercion name. Unrecognized names resolve to `None`
    /// (pass-through), not an error.
    pub fn resolve(name: &str) -> Option<Self> {
        match name.trim() {
            "f" | "float" => Some(Coercion::Float),
            "i" | "int" => Some(Coercion::Int),
            "s" | "str" => Some(Coercion::Str),
            "b" | "bool" => Some(Coercion::Bool),
            _ => None,
        }
    }

    fn target(self) -> &'static str {
        match self {
            Coercion::Float => "float",
            Coercion::Int => "int",
            Coercion::Str => "str",
            Coercion::Bool => "bool",
        }
    }

    /// Apply the conversion to one value.
    pub fn apply(self, value: &Value) -> Result<Value, ConvertError> {
        let fail = || ConvertError::Coerce {
            target: self.target(),
            kind: value.kind(),
            value: value.to_string(),
        };
        match self {
            Coercion::Float => match value {
                Value::Float(f) => Ok(Value::Float(*f)),
                Value::Int(i) => Ok(Value::Float(*i as f64)),
                Value::Bool(b) => Ok(Value::Float(*b as u8 as f64)),
                Value::Str(s) => s.trim().parse().map(Value::Float).map_err(|_| fail()),
                _ => Err(fail()),
            },
            Coercion::Int => match value {
                Value::Int(i) => Ok(Value::Int(*i)),
                Value::Float(f) => Ok(Value::Int(*f as i64)),
                Value::Bool(b) => Ok(Value::Int(*b as i64)),
                Value::Str(s) => s.trim().parse().map(Value::Int).map_err(|_| fail()),
                _ => Err(fail()),
            },
            Coercion::Str => Ok(Value::Str(value.to_string())),
            Coercion::Bool => as_bool(value).map(Value::Bool).ok_or_else(fail),
        }
    }
}

/// Truthiness rules for the `bool` coercion: the usual on/off spellings
/// plus nonzero numbers.
fn as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Int(i) => Some(*i != 0),
        Value::Float(f) => Some(*f != 0.0),
        Value::Str(s) => match s.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Apply a converter list positionally.
///
/// Position `i` is converted when `converters[i]` holds a coercion;
/// otherwise it passes through unchanged. A shorter converter list leaves
/// the trailing values untouched; extra converters are ignored.
pub fn coerce(
    converters: &[Option<Coercion>],
    values: Vec<Value>,
) -> Result<Vec<Value>, ConvertError> {
    values
        .into_iter()
        .enumerate()
        .map(|(i, value)| match converters.get(i).copied().flatten() {
            Some(conv) => conv.apply(&value),
            None => Ok(value),
        })
        .collect()
}
