use rusqlite::types::Value;

use crate::types::QueryValue;

/// Convert a single `QueryValue` to a rusqlite `Value`.
#[must_use]
pub fn query_value_to_sqlite(value: QueryValue) -> Value {
    match value {
        QueryValue::Null => Value::Null,
        QueryValue::Text(s) => Value::Text(s),
        QueryValue::Int(i) => Value::Integer(i),
        QueryValue::Float(f) => Value::Real(f),
        QueryValue::Blob(bytes) => Value::Blob(bytes),
    }
}

/// Convert positional parameters, preserving order.
#[must_use]
pub fn convert_params(params: Vec<QueryValue>) -> Vec<Value> {
    params.into_iter().map(query_value_to_sqlite).collect()
}
