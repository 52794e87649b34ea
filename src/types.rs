use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;

/// Values that can be bound to statement placeholders.
///
/// The native client accepts null, text, numbers and binary blobs. Integers wider than
/// the client's native width (e.g. `u64`) have no conversion here; render them as text
/// before binding:
/// ```rust
/// use sql_session::prelude::*;
///
/// let big: u64 = u64::MAX;
/// let params = params![1, "alice", big.to_string(), None::<i64>];
/// assert_eq!(params[2], QueryValue::Text("18446744073709551615".into()));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum QueryValue {
    Null,
    Text(String),
    Int(i64),
    Float(f64),
    Blob(Vec<u8>),
}

impl From<i32> for QueryValue {
    fn from(value: i32) -> Self {
        QueryValue::Int(i64::from(value))
    }
}

impl From<i64> for QueryValue {
    fn from(value: i64) -> Self {
        QueryValue::Int(value)
    }
}

impl From<u32> for QueryValue {
    fn from(value: u32) -> Self {
        QueryValue::Int(i64::from(value))
    }
}

impl From<f64> for QueryValue {
    fn from(value: f64) -> Self {
        QueryValue::Float(value)
    }
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        QueryValue::Text(value.to_owned())
    }
}

impl From<String> for QueryValue {
    fn from(value: String) -> Self {
        QueryValue::Text(value)
    }
}

impl From<Vec<u8>> for QueryValue {
    fn from(value: Vec<u8>) -> Self {
        QueryValue::Blob(value)
    }
}

impl From<&[u8]> for QueryValue {
    fn from(value: &[u8]) -> Self {
        QueryValue::Blob(value.to_vec())
    }
}

impl<T: Into<QueryValue>> From<Option<T>> for QueryValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(QueryValue::Null, Into::into)
    }
}

/// Build a `Vec<QueryValue>` from heterogeneous literals.
#[macro_export]
macro_rules! params {
    () => {
        ::std::vec::Vec::<$crate::QueryValue>::new()
    };
    ($($value:expr),+ $(,)?) => {
        ::std::vec![$($crate::QueryValue::from($value)),+]
    };
}

/// Typed scalar read from a result-set column.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RowValues {
    /// Integer value (64-bit)
    Int(i64),
    /// Floating point value (64-bit)
    Float(f64),
    /// Fixed-point decimal, kept as its exact text rendering
    Decimal(String),
    /// Text/string value
    Text(String),
    /// Boolean value
    Bool(bool),
    /// Timestamp value
    Timestamp(NaiveDateTime),
    Date(NaiveDate),
    Time(NaiveTime),
    /// Binary data
    Blob(Vec<u8>),
    /// NULL value
    Null,
}

impl RowValues {
    /// Check if this value is NULL
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_int(&self) -> Option<&i64> {
        if let RowValues::Int(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            RowValues::Text(value) | RowValues::Decimal(value) => Some(value),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            RowValues::Bool(value) => Some(*value),
            RowValues::Int(1) => Some(true),
            RowValues::Int(0) => Some(false),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            RowValues::Float(value) => Some(*value),
            RowValues::Decimal(text) => text.parse().ok(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            RowValues::Timestamp(value) => Some(*value),
            RowValues::Date(date) => date.and_hms_opt(0, 0, 0),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            RowValues::Date(value) => Some(*value),
            RowValues::Timestamp(value) => Some(value.date()),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_time(&self) -> Option<NaiveTime> {
        match self {
            RowValues::Time(value) => Some(*value),
            RowValues::Timestamp(value) => Some(value.time()),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_blob(&self) -> Option<&[u8]> {
        if let RowValues::Blob(bytes) = self {
            Some(bytes)
        } else {
            None
        }
    }
}
