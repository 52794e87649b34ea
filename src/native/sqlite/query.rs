use std::collections::VecDeque;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::fallible_iterator::FallibleIterator;
use rusqlite::types::Value;
use rusqlite::{Batch, Connection, Statement, params_from_iter};

use crate::error::NativeError;
use crate::results::{QueryOutcome, ResultSet};
use crate::types::RowValues;

const TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// How a declared column type steers value conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Bool,
    Decimal,
    Timestamp,
    Date,
    Time,
    Plain,
}

impl ColumnKind {
    fn from_decl(decl: Option<&str>) -> Self {
        let Some(decl) = decl else {
            return ColumnKind::Plain;
        };
        let decl = decl.trim().to_ascii_uppercase();
        if decl == "BIT" || decl.contains("BOOL") {
            ColumnKind::Bool
        } else if decl.contains("DECIMAL") || decl.contains("NUMERIC") {
            ColumnKind::Decimal
        } else if decl.contains("TIMESTAMP") || decl.contains("DATETIME") {
            ColumnKind::Timestamp
        } else if decl.starts_with("DATE") {
            ColumnKind::Date
        } else if decl.starts_with("TIME") {
            ColumnKind::Time
        } else {
            ColumnKind::Plain
        }
    }
}

fn convert_value(value: Value, kind: ColumnKind) -> RowValues {
    match (value, kind) {
        (Value::Null, _) => RowValues::Null,
        (Value::Integer(i), ColumnKind::Bool) => RowValues::Bool(i != 0),
        (Value::Integer(i), ColumnKind::Decimal) => RowValues::Decimal(i.to_string()),
        (Value::Integer(i), _) => RowValues::Int(i),
        (Value::Real(f), ColumnKind::Decimal) => RowValues::Decimal(f.to_string()),
        (Value::Real(f), _) => RowValues::Float(f),
        (Value::Text(s), ColumnKind::Decimal) => RowValues::Decimal(s),
        (Value::Text(s), ColumnKind::Timestamp) => TIMESTAMP_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(&s, fmt).ok())
            .map_or(RowValues::Text(s), RowValues::Timestamp),
        (Value::Text(s), ColumnKind::Date) => NaiveDate::parse_from_str(&s, "%Y-%m-%d")
            .map_or(RowValues::Text(s), RowValues::Date),
        (Value::Text(s), ColumnKind::Time) => NaiveTime::parse_from_str(&s, "%H:%M:%S%.f")
            .map_or(RowValues::Text(s), RowValues::Time),
        (Value::Text(s), _) => RowValues::Text(s),
        (Value::Blob(b), _) => RowValues::Blob(b),
    }
}

/// Run a row-producing statement and materialise every row.
///
/// # Errors
/// Returns the `rusqlite::Error` raised while binding, stepping or reading a column.
pub fn build_result_set(
    stmt: &mut Statement<'_>,
    params: &[Value],
) -> Result<ResultSet, rusqlite::Error> {
    let column_names: Vec<String> = stmt
        .column_names()
        .into_iter()
        .map(str::to_owned)
        .collect();
    let kinds: Vec<ColumnKind> = stmt
        .columns()
        .iter()
        .map(|column| ColumnKind::from_decl(column.decl_type()))
        .collect();

    let mut result_set = ResultSet::with_capacity(column_names, 10);
    let mut rows = stmt.query(params_from_iter(params))?;
    while let Some(row) = rows.next()? {
        let mut values = Vec::with_capacity(kinds.len());
        for (idx, kind) in kinds.iter().enumerate() {
            let value: Value = row.get(idx)?;
            values.push(convert_value(value, *kind));
        }
        result_set.add_row_values(values);
    }
    Ok(result_set)
}

/// Compile every statement in `sql` without running any of them.
///
/// # Errors
/// Returns the first compile failure (syntax error, unknown table, ...).
pub fn compile(conn: &Connection, sql: &str) -> Result<(), rusqlite::Error> {
    let mut batch = Batch::new(conn, sql);
    while batch.next()?.is_some() {}
    Ok(())
}

/// Execute every statement in `sql`, binding `params` positionally across them.
///
/// Returns the outcome of the execution plus any further result sets, in the order the
/// statements produced them. The first result set, if any statement produced rows,
/// becomes the outcome; otherwise the affected-row counts are summed.
///
/// # Errors
/// Returns the first `rusqlite::Error`, including a parameter-count mismatch.
pub fn run_batch(
    conn: &Connection,
    sql: &str,
    params: &[Value],
) -> Result<(QueryOutcome, VecDeque<ResultSet>), rusqlite::Error> {
    let mut batch = Batch::new(conn, sql);
    let mut remaining = params;
    let mut bound_so_far = 0usize;
    let mut result_sets = VecDeque::new();
    let mut affected = 0usize;

    while let Some(mut stmt) = batch.next()? {
        let wanted = stmt.parameter_count();
        if remaining.len() < wanted {
            return Err(rusqlite::Error::InvalidParameterCount(
                params.len(),
                bound_so_far + wanted,
            ));
        }
        let (bound, rest) = remaining.split_at(wanted);
        remaining = rest;
        bound_so_far += wanted;

        if stmt.column_count() > 0 {
            result_sets.push_back(build_result_set(&mut stmt, bound)?);
        } else {
            affected += stmt.execute(params_from_iter(bound))?;
        }
    }

    if !remaining.is_empty() {
        return Err(rusqlite::Error::InvalidParameterCount(
            params.len(),
            bound_so_far,
        ));
    }

    let outcome = match result_sets.pop_front() {
        Some(first) => QueryOutcome::Rows(first),
        None => QueryOutcome::Affected(affected),
    };
    Ok((outcome, result_sets))
}

/// Map a `rusqlite` failure onto the native error shape, keeping the text verbatim.
#[must_use]
pub fn native_error(err: rusqlite::Error) -> NativeError {
    match err {
        rusqlite::Error::SqliteFailure(failure, message) => {
            let text = message.unwrap_or_else(|| failure.to_string());
            NativeError::new(failure.extended_code, text)
        }
        other @ rusqlite::Error::InvalidParameterCount(..) => {
            NativeError::new(rusqlite::ffi::SQLITE_RANGE, other.to_string())
        }
        other => NativeError::message(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory() -> Result<Connection, rusqlite::Error> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(
            "CREATE TABLE t (id INTEGER PRIMARY KEY, v VARCHAR(10), flag BIT,
                             price DECIMAL(10, 2), born DATE, seen TIMESTAMP);
             INSERT INTO t VALUES (1, 'a', 1, 12.5, '2025-09-17', '2025-09-17 21:22:23.123');
             INSERT INTO t VALUES (2, 'b', 0, 3, 'not a date', NULL);",
        )?;
        Ok(conn)
    }

    #[test]
    fn declared_types_steer_conversion() -> Result<(), rusqlite::Error> {
        let conn = memory()?;
        let (outcome, rest) = run_batch(&conn, "SELECT * FROM t ORDER BY id", &[])?;
        assert!(rest.is_empty());
        let rs = outcome.into_rows().unwrap_or_default();
        assert_eq!(rs.len(), 2);
        let first = &rs.rows[0];
        assert_eq!(first.get("flag"), Some(&RowValues::Bool(true)));
        assert_eq!(first.get("price"), Some(&RowValues::Decimal("12.5".into())));
        assert!(first.get("born").and_then(RowValues::as_date).is_some());
        assert!(first.get("seen").and_then(RowValues::as_timestamp).is_some());
        assert_eq!(rs.rows[1].get("born"), Some(&RowValues::Text("not a date".into())));
        assert_eq!(rs.rows[1].get("seen"), Some(&RowValues::Null));
        Ok(())
    }

    #[test]
    fn params_are_bound_across_statements() -> Result<(), rusqlite::Error> {
        let conn = memory()?;
        let params = [Value::Integer(1), Value::Integer(2)];
        let (outcome, rest) = run_batch(
            &conn,
            "SELECT v FROM t WHERE id = ?; SELECT v FROM t WHERE id = ?",
            &params,
        )?;
        assert_eq!(outcome.rows().map(ResultSet::len), Some(1));
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].rows[0].get("v"), Some(&RowValues::Text("b".into())));
        Ok(())
    }

    #[test]
    fn dml_reports_summed_affected_rows() -> Result<(), rusqlite::Error> {
        let conn = memory()?;
        let (outcome, _) = run_batch(&conn, "UPDATE t SET v = 'z'; DELETE FROM t WHERE id = 2", &[])?;
        assert_eq!(outcome.affected(), Some(3));
        Ok(())
    }

    #[test]
    fn parameter_count_mismatch_is_a_range_error() -> Result<(), rusqlite::Error> {
        let conn = memory()?;
        let too_many = [Value::Integer(1), Value::Integer(2)];
        let err = run_batch(&conn, "SELECT v FROM t WHERE id = ?", &too_many)
            .err()
            .map(native_error);
        assert_eq!(err.and_then(|e| e.code), Some(rusqlite::ffi::SQLITE_RANGE));
        let too_few = run_batch(&conn, "SELECT v FROM t WHERE id = ? AND v = ?", &too_many[..1]);
        assert!(too_few.is_err());
        Ok(())
    }

    #[test]
    fn selected_columns_keep_their_order() -> Result<(), rusqlite::Error> {
        let conn = memory()?;
        compile(&conn, "SELECT 1 AS zeta, 2 AS alpha, 3 AS alpha; SELECT 4 AS b, 5 AS a")?;
        let (outcome, rest) =
            run_batch(&conn, "SELECT 1 AS zeta, 2 AS alpha, 3 AS alpha; SELECT 4 AS b, 5 AS a", &[])?;
        let rs = outcome.into_rows().unwrap_or_default();
        assert_eq!(rs.column_names(), ["zeta", "alpha", "alpha"]);
        let first = serde_json::to_string(&rs.to_json()).unwrap_or_default();
        assert_eq!(first, r#"[{"zeta":1,"alpha":3}]"#);
        assert_eq!(rs.rows[0].get("alpha"), Some(&RowValues::Int(3)));
        let second = rest.front().map(|rs| serde_json::to_string(&rs.to_json()).unwrap_or_default());
        assert_eq!(second.as_deref(), Some(r#"[{"b":4,"a":5}]"#));
        Ok(())
    }

    #[test]
    fn unknown_table_keeps_native_text() -> Result<(), rusqlite::Error> {
        let conn = memory()?;
        let err = compile(&conn, "SELECT * FROM NONEXISTENT_TABLE").err().map(native_error);
        let message = err.map(|e| e.message).unwrap_or_default();
        assert!(message.contains("no such table"), "{message}");
        Ok(())
    }
}
