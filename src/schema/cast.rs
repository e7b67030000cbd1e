//! Type resolver / caster
//!
//! Converts a raw value into the typed form a scalar path declares, or
//! reports a cast failure. Coercions mirror the accessor contract:
//! parseable strings become numbers and booleans, numbers and booleans
//! become strings, whole floats become ints. Null is never castable.

use serde_json::{Number, Value};

use super::types::ScalarKind;

// largest magnitude an f64 represents exactly as an integer (2^53)
const MAX_EXACT_INT_F64: f64 = 9_007_199_254_740_992.0;

/// A failed cast, path-free; the accessor layer adds the path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CastFailure {
    /// Declared type name
    pub expected: &'static str,
    /// JSON type name of the rejected value
    pub actual: &'static str,
}

impl CastFailure {
    fn new(expected: &'static str, actual: &Value) -> Self {
        Self {
            expected,
            actual: json_type_name(actual),
        }
    }
}

/// Cast a raw value to the given scalar kind
pub fn cast_scalar(kind: ScalarKind, value: Value) -> Result<Value, CastFailure> {
    if value.is_null() {
        return Err(CastFailure::new(kind.type_name(), &value));
    }

    match kind {
        ScalarKind::String => match value {
            Value::String(_) => Ok(value),
            Value::Number(n) => Ok(Value::String(n.to_string())),
            Value::Bool(b) => Ok(Value::String(b.to_string())),
            other => Err(CastFailure::new("string", &other)),
        },
        ScalarKind::Int => match &value {
            Value::Number(n) if n.is_i64() || n.is_u64() => Ok(value),
            Value::Number(n) => match n.as_f64() {
                Some(f) if f.fract() == 0.0 && f.abs() <= MAX_EXACT_INT_F64 => {
                    Ok(Value::from(f as i64))
                }
                _ => Err(CastFailure::new("int", &value)),
            },
            Value::String(s) => match s.trim().parse::<i64>() {
                Ok(i) => Ok(Value::from(i)),
                Err(_) => Err(CastFailure::new("int", &value)),
            },
            _ => Err(CastFailure::new("int", &value)),
        },
        ScalarKind::Float => match &value {
            Value::Number(n) => match n.as_f64().and_then(Number::from_f64) {
                Some(n) => Ok(Value::Number(n)),
                None => Err(CastFailure::new("float", &value)),
            },
            Value::String(s) => match s.trim().parse::<f64>().ok().and_then(Number::from_f64) {
                Some(n) => Ok(Value::Number(n)),
                None => Err(CastFailure::new("float", &value)),
            },
            _ => Err(CastFailure::new("float", &value)),
        },
        ScalarKind::Bool => match &value {
            Value::Bool(_) => Ok(value),
            Value::String(s) => match s.trim() {
                "true" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                _ => Err(CastFailure::new("bool", &value)),
            },
            _ => Err(CastFailure::new("bool", &value)),
        },
    }
}

/// Returns the JSON type name for error messages
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                "int"
            } else {
                "float"
            }
        }
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
