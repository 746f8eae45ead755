//! Query Result - tabular rows returned by the relational store

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Rows and column labels from one executed statement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    /// Column names, in select-list order
    pub columns: Vec<String>,

    /// Row values, positionally aligned with `columns`
    pub rows: Vec<Vec<Value>>,

    /// Number of rows returned by the store (not truncated)
    pub row_count: usize,

    /// Execution time in milliseconds
    pub execution_time_ms: u64,
}

impl QueryResult {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        let row_count = rows.len();
        Self {
            columns,
            rows,
            row_count,
            execution_time_ms: 0,
        }
    }

    /// Build from JSON objects; column order follows the first record's keys.
    pub fn from_records(records: Vec<Map<String, Value>>) -> Self {
        let columns: Vec<String> = records
            .first()
            .map(|r| r.keys().cloned().collect())
            .unwrap_or_default();
        let rows = records
            .into_iter()
            .map(|mut record| {
                columns
                    .iter()
                    .map(|c| record.remove(c).unwrap_or(Value::Null))
                    .collect()
            })
            .collect();
        Self::new(columns, rows)
    }

    pub fn with_execution_time(mut self, execution_time_ms: u64) -> Self {
        self.execution_time_ms = execution_time_ms;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Exactly one row with exactly one column.
    pub fn is_single_value(&self) -> bool {
        self.columns.len() == 1 && self.rows.len() == 1
    }

    pub fn first_row(&self) -> Option<&[Value]> {
        self.rows.first().map(|r| r.as_slice())
    }

    /// The first `limit` rows as column-keyed records.
    pub fn records(&self, limit: usize) -> Vec<Map<String, Value>> {
        self.rows
            .iter()
            .take(limit)
            .map(|row| {
                self.columns
                    .iter()
                    .cloned()
                    .zip(row.iter().cloned())
                    .collect()
            })
            .collect()
    }
}
