//! The typed parameter/result value and its conversion traits.
//!
//! Every value crossing the driver boundary, in either direction, is a
//! [`Value`]. Record fields convert through [`ToValue`] / [`FromValue`],
//! which is where the per-kind coercion rules live: unsigned 64-bit
//! integers that a driver hands back as decimal strings are parsed, binary
//! columns landing in `String` fields are hex-encoded, JSON is carried as
//! structured data or opaque text depending on the destination type.

use crate::error::{DbError, DbResult};
use chrono::NaiveDateTime;

/// A database parameter or result value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Timestamp(NaiveDateTime),
    Json(serde_json::Value),
}

impl Value {
    /// Whether this is the zero value of its kind.
    ///
    /// Zero values are excluded from generated UPDATE statements (and a
    /// zero primary key is excluded from INSERT so the database assigns one).
    pub fn is_zero(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Bool(b) => !b,
            Self::Int(i) => *i == 0,
            Self::UInt(u) => *u == 0,
            Self::Float(f) => *f == 0.0,
            Self::Text(s) => s.is_empty(),
            Self::Bytes(b) => b.is_empty(),
            Self::Timestamp(ts) => *ts == NaiveDateTime::default(),
            Self::Json(j) => j.is_null(),
        }
    }

    /// Short kind name used in decode error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::UInt(_) => "uint",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::Bytes(_) => "bytes",
            Self::Timestamp(_) => "timestamp",
            Self::Json(_) => "json",
        }
    }

    /// Render the value for a log-facing parameter list.
    ///
    /// This representation is never sent to the driver.
    pub fn display_for_log(&self) -> String {
        match self {
            Self::Null => "NULL".to_string(),
            Self::Bool(b) => b.to_string(),
            Self::Int(i) => i.to_string(),
            Self::UInt(u) => u.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Text(s) => s.clone(),
            Self::Bytes(b) => format!("0x{}", hex::encode(b)),
            Self::Timestamp(ts) => ts.to_string(),
            Self::Json(j) => j.to_string(),
        }
    }
}

/// Conversion from a Rust field value into a [`Value`] parameter.
pub trait ToValue {
    fn to_value(&self) -> Value;
}

/// Conversion from a result [`Value`] into a Rust field value.
///
/// Errors carry only the mismatch description; the caller attaches the
/// column name and wraps into [`DbError::Decode`].
pub trait FromValue: Sized {
    fn from_value(value: Value) -> Result<Self, String>;
}

macro_rules! to_value_int {
    ($($ty:ty),*) => {
        $(impl ToValue for $ty {
            fn to_value(&self) -> Value {
                Value::Int(*self as i64)
            }
        })*
    };
}

to_value_int!(i8, i16, i32, i64, isize);

macro_rules! to_value_uint {
    ($($ty:ty),*) => {
        $(impl ToValue for $ty {
            fn to_value(&self) -> Value {
                Value::UInt(*self as u64)
            }
        })*
    };
}

to_value_uint!(u8, u16, u32, u64, usize);

impl ToValue for f32 {
    fn to_value(&self) -> Value {
        Value::Float(f64::from(*self))
    }
}

impl ToValue for f64 {
    fn to_value(&self) -> Value {
        Value::Float(*self)
    }
}

impl ToValue for bool {
    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }
}

impl ToValue for String {
    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }
}

impl ToValue for &str {
    fn to_value(&self) -> Value {
        Value::Text((*self).to_string())
    }
}

impl ToValue for Vec<u8> {
    fn to_value(&self) -> Value {
        Value::Bytes(self.clone())
    }
}

impl ToValue for NaiveDateTime {
    fn to_value(&self) -> Value {
        Value::Timestamp(*self)
    }
}

impl ToValue for serde_json::Value {
    fn to_value(&self) -> Value {
        Value::Json(self.clone())
    }
}

impl ToValue for uuid::Uuid {
    fn to_value(&self) -> Value {
        Value::Text(self.to_string())
    }
}

impl<T: ToValue> ToValue for Option<T> {
    fn to_value(&self) -> Value {
        match self {
            Some(inner) => inner.to_value(),
            None => Value::Null,
        }
    }
}

impl ToValue for Value {
    fn to_value(&self) -> Value {
        self.clone()
    }
}

fn mismatch(expected: &str, got: &Value) -> String {
    format!("expected {expected}, got {}", got.kind_name())
}

macro_rules! from_value_int {
    ($($ty:ty),*) => {
        $(impl FromValue for $ty {
            fn from_value(value: Value) -> Result<Self, String> {
                match value {
                    Value::Int(i) => <$ty>::try_from(i).map_err(|_| {
                        format!("integer {i} out of range for {}", stringify!($ty))
                    }),
                    Value::UInt(u) => <$ty>::try_from(u).map_err(|_| {
                        format!("integer {u} out of range for {}", stringify!($ty))
                    }),
                    Value::Text(s) => s.trim().parse::<$ty>().map_err(|e| {
                        format!("cannot parse {s:?} as {}: {e}", stringify!($ty))
                    }),
                    other => Err(mismatch("integer", &other)),
                }
            }
        })*
    };
}

// Drivers without unsigned support return u64 columns as decimal strings;
// the Text arm above parses them back to numeric form.
from_value_int!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl FromValue for f64 {
    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Float(f) => Ok(f),
            Value::Int(i) => Ok(i as f64),
            Value::UInt(u) => Ok(u as f64),
            Value::Text(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|e| format!("cannot parse {s:?} as f64: {e}")),
            other => Err(mismatch("float", &other)),
        }
    }
}

impl FromValue for f32 {
    fn from_value(value: Value) -> Result<Self, String> {
        f64::from_value(value).map(|f| f as f32)
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Bool(b) => Ok(b),
            // MySQL and SQLite surface booleans as 0/1 integers.
            Value::Int(0) | Value::UInt(0) => Ok(false),
            Value::Int(1) | Value::UInt(1) => Ok(true),
            other => Err(mismatch("bool", &other)),
        }
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Text(s) => Ok(s),
            // Binary content exposed through a string field is hex-encoded.
            Value::Bytes(b) => Ok(hex::encode(b)),
            Value::Int(i) => Ok(i.to_string()),
            Value::UInt(u) => Ok(u.to_string()),
            Value::Float(f) => Ok(f.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            Value::Timestamp(ts) => Ok(ts.to_string()),
            // JSON/array/geometry columns pass through as opaque text.
            Value::Json(j) => Ok(j.to_string()),
            Value::Null => Err(mismatch("text", &Value::Null)),
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Bytes(b) => Ok(b),
            Value::Text(s) => Ok(s.into_bytes()),
            other => Err(mismatch("bytes", &other)),
        }
    }
}

impl FromValue for NaiveDateTime {
    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Timestamp(ts) => Ok(ts),
            Value::Text(s) => parse_timestamp(&s)
                .ok_or_else(|| format!("cannot parse {s:?} as timestamp")),
            other => Err(mismatch("timestamp", &other)),
        }
    }
}

impl FromValue for serde_json::Value {
    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Json(j) => Ok(j),
            Value::Text(s) => {
                serde_json::from_str(&s).map_err(|e| format!("cannot parse JSON: {e}"))
            }
            other => Err(mismatch("json", &other)),
        }
    }
}

impl FromValue for uuid::Uuid {
    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Text(s) => {
                uuid::Uuid::parse_str(&s).map_err(|e| format!("cannot parse {s:?} as uuid: {e}"))
            }
            Value::Bytes(b) => uuid::Uuid::from_slice(&b)
                .map_err(|e| format!("cannot build uuid from {} bytes: {e}", b.len())),
            other => Err(mismatch("uuid", &other)),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self, String> {
        Ok(value)
    }
}

fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(ts);
        }
    }
    chrono::DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.naive_utc())
}

/// Decode a [`Value`] into a field type, attaching the column name on failure.
pub fn decode_column<T: FromValue>(column: &str, value: Value) -> DbResult<T> {
    T::from_value(value).map_err(|message| DbError::decode(column, message))
}

/// A raw-SQL parameter: a [`Value`] plus its redaction flag.
///
/// Parameters produced from registered records inherit the flag from the
/// column's `nolog` attribute; raw callers can mark a binding sensitive with
/// [`Param::redacted`] so it never reaches a log sink either.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub value: Value,
    pub sensitive: bool,
}

impl Param {
    pub fn new(value: Value) -> Self {
        Self {
            value,
            sensitive: false,
        }
    }

    /// A parameter whose value is masked in every logged representation.
    pub fn redacted(value: impl ToValue) -> Self {
        Self {
            value: value.to_value(),
            sensitive: true,
        }
    }
}

impl<T: ToValue> From<T> for Param {
    fn from(value: T) -> Self {
        Self::new(value.to_value())
    }
}

/// Build a `Vec<Param>` from a list of bindable expressions.
///
/// ```ignore
/// let n = db.exec("DELETE FROM posts WHERE id = $1", params![post_id]).await?;
/// ```
#[macro_export]
macro_rules! params {
    () => { ::std::vec::Vec::<$crate::Param>::new() };
    ($($value:expr),+ $(,)?) => {
        ::std::vec![$($crate::Param::from($value)),+]
    };
}
