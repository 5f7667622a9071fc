//! Runtime values held in the environment mapping.

use super::object::{EnvObject, ShapeObject};
use chrono::{DateTime, SecondsFormat, Utc};
use std::fmt;

/// A value bound in the host environment.
///
/// Primitive and structural variants are plain data; anything else is an
/// [`EnvObject`] whose shape has to be probed to learn what it can do.
#[derive(Clone)]
pub enum EnvValue {
    String(String),
    Number(f64),
    Boolean(bool),
    Null,
    Undefined,
    Array(Vec<EnvValue>),
    Date(DateTime<Utc>),
    /// Regular expression source text, e.g. `^api/.*$`.
    RegExp(String),
    /// A bare callable with no further structure.
    Function,
    Object(EnvObject),
}

impl EnvValue {
    /// JavaScript-style truthiness, used when the classifier asks "is this member absent or falsy".
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::String(s) => !s.is_empty(),
            Self::Number(n) => *n != 0.0 && !n.is_nan(),
            Self::Boolean(b) => *b,
            Self::Null | Self::Undefined => false,
            Self::Array(_) | Self::Date(_) | Self::RegExp(_) | Self::Function | Self::Object(_) => {
                true
            }
        }
    }

    pub fn as_object(&self) -> Option<&EnvObject> {
        match self {
            Self::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Plain-data rendering for display. Functions and `undefined` have no JSON form and
    /// render as `null`; dates render as RFC 3339 strings and regexps as `{}`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::String(s) => serde_json::Value::String(s.clone()),
            Self::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Self::Boolean(b) => serde_json::Value::Bool(*b),
            Self::Null | Self::Undefined | Self::Function => serde_json::Value::Null,
            Self::Array(items) => {
                serde_json::Value::Array(items.iter().map(EnvValue::to_json).collect())
            }
            Self::Date(d) => {
                serde_json::Value::String(d.to_rfc3339_opts(SecondsFormat::Millis, true))
            }
            Self::RegExp(_) => serde_json::json!({}),
            Self::Object(obj) => obj.to_json(),
        }
    }
}

impl From<serde_json::Value> for EnvValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Boolean(b),
            serde_json::Value::Number(n) => Self::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => {
                Self::Array(items.into_iter().map(EnvValue::from).collect())
            }
            serde_json::Value::Object(map) => {
                let shape = map
                    .into_iter()
                    .fold(ShapeObject::new(), |shape, (k, v)| shape.with_value(k, v.into()));
                Self::Object(EnvObject::new(shape))
            }
        }
    }
}

impl From<&str> for EnvValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for EnvValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<f64> for EnvValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<bool> for EnvValue {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<EnvObject> for EnvValue {
    fn from(obj: EnvObject) -> Self {
        Self::Object(obj)
    }
}

impl fmt::Debug for EnvValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => f.debug_tuple("String").field(s).finish(),
            Self::Number(n) => f.debug_tuple("Number").field(n).finish(),
            Self::Boolean(b) => f.debug_tuple("Boolean").field(b).finish(),
            Self::Null => f.write_str("Null"),
            Self::Undefined => f.write_str("Undefined"),
            Self::Array(items) => f.debug_tuple("Array").field(items).finish(),
            Self::Date(d) => f.debug_tuple("Date").field(d).finish(),
            Self::RegExp(r) => f.debug_tuple("RegExp").field(r).finish(),
            Self::Function => f.write_str("Function"),
            Self::Object(obj) => obj.fmt(f),
        }
    }
}
