//! Column type classification from a leading sample of rows.
//!
//! A column is a date column when every sampled cell is text starting with an
//! ISO `YYYY-MM-DD` date, numeric when any sampled cell is a number, and
//! categorical otherwise. The date check always runs first.

use std::{fmt, sync::OnceLock};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::data::{Table, Value};

pub const DEFAULT_SAMPLE_ROWS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Numeric,
    Date,
    Categorical,
}

impl ColumnKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnKind::Numeric => "numeric",
            ColumnKind::Date => "date",
            ColumnKind::Categorical => "categorical",
        }
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn date_prefix() -> &'static Regex {
    static DATE_PREFIX: OnceLock<Regex> = OnceLock::new();
    DATE_PREFIX.get_or_init(|| Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}").expect("valid date regex"))
}

/// Classifies a sample of cells. An empty sample is categorical.
pub fn classify_values<'a, I>(sample: I) -> ColumnKind
where
    I: IntoIterator<Item = &'a Value>,
{
    let mut seen = 0usize;
    let mut all_dates = true;
    let mut any_number = false;
    for value in sample {
        seen += 1;
        match value {
            Value::Number(_) => {
                any_number = true;
                all_dates = false;
            }
            Value::Text(text) => {
                if !date_prefix().is_match(text) {
                    all_dates = false;
                }
            }
        }
    }
    if seen > 0 && all_dates {
        ColumnKind::Date
    } else if any_number {
        ColumnKind::Numeric
    } else {
        ColumnKind::Categorical
    }
}

/// Classifies `column` from the first [`DEFAULT_SAMPLE_ROWS`] rows.
pub fn classify(table: &Table, column: &str) -> ColumnKind {
    classify_with_sample(table, column, DEFAULT_SAMPLE_ROWS)
}

/// `sample_rows == 0` scans every row.
pub fn classify_with_sample(table: &Table, column: &str, sample_rows: usize) -> ColumnKind {
    let limit = if sample_rows == 0 {
        usize::MAX
    } else {
        sample_rows
    };
    match table.column_values(column) {
        Some(values) => classify_values(values.take(limit)),
        None => ColumnKind::Categorical,
    }
}

/// One classification per declared column, in order.
pub fn classify_all(table: &Table) -> TableProfile {
    TableProfile::build(table, DEFAULT_SAMPLE_ROWS)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnProfile {
    pub name: String,
    pub kind: ColumnKind,
}

/// Classification of every declared column, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableProfile {
    pub columns: Vec<ColumnProfile>,
}

impl TableProfile {
    pub fn build(table: &Table, sample_rows: usize) -> Self {
        let columns = table
            .columns()
            .iter()
            .map(|name| ColumnProfile {
                name: name.clone(),
                kind: classify_with_sample(table, name, sample_rows),
            })
            .collect();
        Self { columns }
    }

    pub fn kind_of(&self, column: &str) -> Option<ColumnKind> {
        self.columns
            .iter()
            .find(|c| c.name == column)
            .map(|c| c.kind)
    }

    pub fn columns_of(&self, kind: ColumnKind) -> impl Iterator<Item = &str> + '_ {
        self.columns
            .iter()
            .filter(move |c| c.kind == kind)
            .map(|c| c.name.as_str())
    }

    pub fn numeric(&self) -> Vec<&str> {
        self.columns_of(ColumnKind::Numeric).collect()
    }

    pub fn dates(&self) -> Vec<&str> {
        self.columns_of(ColumnKind::Date).collect()
    }

    pub fn categorical(&self) -> Vec<&str> {
        self.columns_of(ColumnKind::Categorical).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Table {
        let rows = vec![
            vec![
                Value::Text("2024-01-15".into()),
                Value::Number(10.0),
                Value::Text("North".into()),
                Value::Text("2024-02-01T10:00".into()),
            ],
            vec![
                Value::Text("2024-01-20".into()),
                Value::Text("".into()),
                Value::Text("South".into()),
                Value::Number(5.0),
            ],
        ];
        Table::new(
            "t.csv",
            vec!["date".into(), "revenue".into(), "region".into(), "mixed".into()],
            rows,
        )
    }

    #[test]
    fn classifies_each_kind() {
        let t = table();
        assert_eq!(classify(&t, "date"), ColumnKind::Date);
        assert_eq!(classify(&t, "revenue"), ColumnKind::Numeric);
        assert_eq!(classify(&t, "region"), ColumnKind::Categorical);
    }

    #[test]
    fn date_requires_every_sampled_value() {
        // One date-like string and one number: not all dates, so numeric.
        assert_eq!(classify(&table(), "mixed"), ColumnKind::Numeric);
    }

    #[test]
    fn dates_need_ascii_digits() {
        let t = Table::new(
            "d.csv",
            vec!["when".into()],
            vec![vec![Value::Text("٢٠٢٤-٠١-١٥".into())]],
        );
        assert_eq!(classify(&t, "when"), ColumnKind::Categorical);
    }

    #[test]
    fn absent_column_and_empty_table_are_categorical() {
        let t = table();
        assert_eq!(classify(&t, "missing"), ColumnKind::Categorical);
        let empty = Table::new("e.csv", vec!["date".into()], Vec::new());
        assert_eq!(classify(&empty, "date"), ColumnKind::Categorical);
    }

    #[test]
    fn only_leading_rows_are_sampled() {
        let mut rows: Vec<Vec<Value>> = (0..10).map(|_| vec![Value::Text("x".into())]).collect();
        rows.push(vec![Value::Number(1.0)]);
        let t = Table::new("s.csv", vec!["c".into()], rows);
        assert_eq!(classify(&t, "c"), ColumnKind::Categorical);
        assert_eq!(classify_with_sample(&t, "c", 0), ColumnKind::Numeric);
    }

    #[test]
    fn profile_groups_columns_by_kind() {
        let profile = TableProfile::build(&table(), DEFAULT_SAMPLE_ROWS);
        assert_eq!(profile.numeric(), vec!["revenue", "mixed"]);
        assert_eq!(profile.dates(), vec!["date"]);
        assert_eq!(profile.categorical(), vec!["region"]);
        assert_eq!(profile.kind_of("region"), Some(ColumnKind::Categorical));
    }
}
