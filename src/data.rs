//! Table model shared by every stage of the dashboard pipeline.
//!
//! A [`Table`] is built once from loaded input (or a generated sample) and is
//! never mutated afterwards. Views, aggregates, and insights are all derived
//! from it, and its [`Table::fingerprint`] serves as the table identity for
//! memoized chart data.

use std::{collections::HashSet, fmt};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A single cell: either a number or a string, mirroring what the loader
/// produces from a raw field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    Text(String),
}

impl Value {
    /// Builds a cell from a raw field: empty stays an empty string, a finite
    /// numeric literal becomes a number, everything else is text.
    pub fn from_field(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Value::Text(String::new());
        }
        match trimmed.parse::<f64>() {
            Ok(number) if number.is_finite() => Value::Number(number),
            _ => Value::Text(trimmed.to_string()),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            Value::Number(_) => None,
        }
    }

    /// Loose numeric coercion used by every aggregation: numbers pass through,
    /// blank strings count as zero, parseable strings are parsed, and anything
    /// else contributes zero.
    pub fn coerce_number(&self) -> f64 {
        match self {
            Value::Number(n) if n.is_finite() => *n,
            Value::Number(_) => 0.0,
            Value::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return 0.0;
                }
                trimmed
                    .parse::<f64>()
                    .ok()
                    .filter(|n| n.is_finite())
                    .unwrap_or(0.0)
            }
        }
    }

    pub fn as_display(&self) -> String {
        match self {
            Value::Text(s) => s.clone(),
            Value::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    (*n as i64).to_string()
                } else {
                    n.to_string()
                }
            }
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Text(String::new())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

#[derive(Debug, Clone)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
    file_name: String,
    fingerprint: String,
}

impl Table {
    /// Creates a table, making header names unique and padding or truncating
    /// every row to the declared column count.
    pub fn new(file_name: impl Into<String>, columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        let columns = unique_column_names(columns);
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, Value::default());
                row
            })
            .collect::<Vec<_>>();
        let fingerprint = compute_fingerprint(&columns, &rows);
        Self {
            columns,
            rows,
            file_name: file_name.into(),
            fingerprint,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Hex SHA-256 over headers and cell contents.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }

    /// Iterates a column's cells in row order; `None` when the column is absent.
    pub fn column_values(&self, column: &str) -> Option<impl Iterator<Item = &Value> + '_> {
        let idx = self.column_index(column)?;
        Some(self.rows.iter().map(move |row| &row[idx]))
    }
}

/// Display label for a column name (`total_revenue` -> `total revenue`).
pub fn column_label(name: &str) -> String {
    name.replace('_', " ")
}

fn unique_column_names(columns: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut result = Vec::with_capacity(columns.len());
    for (idx, raw) in columns.into_iter().enumerate() {
        let trimmed = raw.trim();
        let base = if trimmed.is_empty() {
            format!("column_{}", idx + 1)
        } else {
            trimmed.to_string()
        };
        let mut candidate = base.clone();
        let mut suffix = 2;
        while !seen.insert(candidate.clone()) {
            candidate = format!("{base}_{suffix}");
            suffix += 1;
        }
        result.push(candidate);
    }
    result
}

fn compute_fingerprint(columns: &[String], rows: &[Vec<Value>]) -> String {
    let mut hasher = Sha256::new();
    for column in columns {
        hasher.update(column.as_bytes());
        hasher.update([0x1f]);
    }
    for row in rows {
        hasher.update([0x1e]);
        for value in row {
            match value {
                Value::Number(n) => {
                    hasher.update([b'n']);
                    hasher.update(n.to_bits().to_le_bytes());
                }
                Value::Text(s) => {
                    hasher.update([b's']);
                    hasher.update(s.as_bytes());
                }
            }
            hasher.update([0x1f]);
        }
    }
    format!("{:x}", hasher.finalize())
}
