use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value as JsonValue;

use super::row::{Row, index_columns};
use crate::types::RowValues;

/// An ordered, finite sequence of rows produced by one SELECT-like statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    /// The rows returned by the query
    pub rows: Vec<Row>,
    /// Column names shared by all rows (to avoid duplicating in each row)
    column_names: Arc<Vec<String>>,
    column_index: Arc<HashMap<String, usize>>,
}

impl ResultSet {
    /// Create an empty result set for the given columns.
    #[must_use]
    pub fn new(column_names: Vec<String>) -> Self {
        Self::with_capacity(column_names, 0)
    }

    /// Create a new result set with a known row capacity
    #[must_use]
    pub fn with_capacity(column_names: Vec<String>, capacity: usize) -> Self {
        let column_index = Arc::new(index_columns(&column_names));
        Self {
            rows: Vec::with_capacity(capacity),
            column_names: Arc::new(column_names),
            column_index,
        }
    }

    /// Get the column names for this result set
    #[must_use]
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    /// Add a row to the result set
    ///
    /// Values must follow column-declaration order.
    pub fn add_row_values(&mut self, values: Vec<RowValues>) {
        self.rows.push(Row::with_index(
            Arc::clone(&self.column_names),
            Arc::clone(&self.column_index),
            values,
        ));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn first(&self) -> Option<&Row> {
        self.rows.first()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Row> {
        self.rows.iter()
    }

    /// Render every row as a JSON object, in row order.
    #[must_use]
    pub fn to_json(&self) -> JsonValue {
        JsonValue::Array(self.rows.iter().map(Row::to_json).collect())
    }
}

impl IntoIterator for ResultSet {
    type Item = Row;
    type IntoIter = std::vec::IntoIter<Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = &'a Row;
    type IntoIter = std::slice::Iter<'a, Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}
