// ── Reading and value types ──
//
// A `Reading` is one flat key/value object from the plug, e.g. the body of
// `system.get_sysinfo`. Only scalar values survive conversion.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::Display;

/// A scalar value as read from a plug or written to a metric line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    String(String),
}

/// Raw or renamed key -> value mapping, in device (or field map) order.
pub type Reading = IndexMap<String, FieldValue>;

/// Which of the two device readings a value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ReadingKind {
    #[strum(to_string = "system info")]
    SystemInfo,
    #[strum(to_string = "energy")]
    Energy,
}

impl FieldValue {
    /// Convert a JSON scalar. Objects, arrays and nulls yield `None`.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(Self::Boolean(*b)),
            Value::Number(n) => n
                .as_i64()
                .map(Self::Integer)
                .or_else(|| n.as_f64().map(Self::Float)),
            Value::String(s) => Some(Self::String(s.clone())),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    /// Coerce numeric-looking values to integers.
    ///
    /// Floats are truncated, booleans become 0/1 and strings holding an
    /// integer are parsed. Anything else is returned unchanged.
    #[allow(clippy::cast_possible_truncation, clippy::as_conversions)]
    pub fn coerce_integer(self) -> Self {
        match self {
            Self::Float(f) if f.is_finite() && f.abs() < 9.0e18 => Self::Integer(f.trunc() as i64),
            Self::Boolean(b) => Self::Integer(i64::from(b)),
            Self::String(s) => match s.trim().parse::<i64>() {
                Ok(i) => Self::Integer(i),
                Err(_) => Self::String(s),
            },
            other => other,
        }
    }

    /// Numeric view for comparisons. Booleans and strings are not numbers.
    #[allow(clippy::cast_precision_loss, clippy::as_conversions)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            Self::Boolean(_) | Self::String(_) => None,
        }
    }

    /// Short type name used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::Boolean(_) => "boolean",
            Self::String(_) => "string",
        }
    }
}

/// Plain textual form: no line-protocol suffixes, no quoting.
impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(v) => f.write_str(&format_float(*v)),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::String(s) => f.write_str(s),
        }
    }
}

/// Integral floats keep a trailing `.0` so they read back as floats.
#[allow(clippy::float_cmp)]
fn format_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

/// Build a [`Reading`] from a JSON object, dropping non-scalar members.
pub fn reading_from_object(object: &Map<String, Value>) -> Reading {
    object
        .iter()
        .filter_map(|(key, value)| FieldValue::from_json(value).map(|v| (key.clone(), v)))
        .collect()
}
