//! Grouping and summing rows into chart series.
//!
//! Every aggregation coerces cells with [`Value::coerce_number`], so a
//! non-numeric cell contributes zero rather than failing. A missing key or
//! value column yields an empty series.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::{
    data::{Table, Value},
    roles::RoleAssignment,
};

/// Number of leading characters of a date kept as its bucket (`YYYY-MM`).
pub const PERIOD_WIDTH: usize = 7;
pub const DEFAULT_TIME_SERIES_PERIODS: usize = 12;
pub const DEFAULT_BAR_LIMIT: usize = 6;
pub const DEFAULT_PIE_LIMIT: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimePoint {
    pub period: String,
    pub value: f64,
    pub value2: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotal {
    pub name: String,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartLimits {
    pub time_series_periods: usize,
    pub bars: usize,
    pub pie_segments: usize,
}

impl Default for ChartLimits {
    fn default() -> Self {
        Self {
            time_series_periods: DEFAULT_TIME_SERIES_PERIODS,
            bars: DEFAULT_BAR_LIMIT,
            pie_segments: DEFAULT_PIE_LIMIT,
        }
    }
}

fn period_of(value: &Value) -> String {
    value.as_display().chars().take(PERIOD_WIDTH).collect()
}

/// Monthly totals of `value_col` (and `second_value_col`), oldest first,
/// limited to the most recent [`DEFAULT_TIME_SERIES_PERIODS`].
pub fn build_time_series(
    table: &Table,
    date_col: Option<&str>,
    value_col: Option<&str>,
    second_value_col: Option<&str>,
) -> Vec<TimePoint> {
    build_time_series_limited(
        table,
        date_col,
        value_col,
        second_value_col,
        DEFAULT_TIME_SERIES_PERIODS,
    )
}

pub fn build_time_series_limited(
    table: &Table,
    date_col: Option<&str>,
    value_col: Option<&str>,
    second_value_col: Option<&str>,
    periods: usize,
) -> Vec<TimePoint> {
    let (Some(date_idx), Some(value_idx)) = (
        date_col.and_then(|c| table.column_index(c)),
        value_col.and_then(|c| table.column_index(c)),
    ) else {
        return Vec::new();
    };
    let second_idx = second_value_col.and_then(|c| table.column_index(c));

    let mut buckets: BTreeMap<String, (f64, f64)> = BTreeMap::new();
    for row in table.rows() {
        let entry = buckets.entry(period_of(&row[date_idx])).or_insert((0.0, 0.0));
        entry.0 += row[value_idx].coerce_number();
        if let Some(idx) = second_idx {
            entry.1 += row[idx].coerce_number();
        }
    }

    let skip = buckets.len().saturating_sub(periods);
    buckets
        .into_iter()
        .skip(skip)
        .map(|(period, (value, value2))| TimePoint {
            period,
            value,
            value2,
        })
        .collect()
}

/// Totals of `value_col` per distinct `category_col` value, largest first,
/// ties kept in first-seen order, truncated to `limit`.
pub fn build_category_totals(
    table: &Table,
    category_col: Option<&str>,
    value_col: Option<&str>,
    limit: usize,
) -> Vec<CategoryTotal> {
    let (Some(category_idx), Some(value_idx)) = (
        category_col.and_then(|c| table.column_index(c)),
        value_col.and_then(|c| table.column_index(c)),
    ) else {
        return Vec::new();
    };
    let mut accumulator = CategoryAccumulator::default();
    for row in table.rows() {
        accumulator.ingest(row[category_idx].as_display(), row[value_idx].coerce_number());
    }
    accumulator.into_ranked(limit)
}

#[derive(Debug, Default)]
struct CategoryAccumulator {
    positions: HashMap<String, usize>,
    totals: Vec<CategoryTotal>,
}

impl CategoryAccumulator {
    fn ingest(&mut self, key: String, amount: f64) {
        match self.positions.get(&key) {
            Some(&idx) => self.totals[idx].value += amount,
            None => {
                self.positions.insert(key.clone(), self.totals.len());
                self.totals.push(CategoryTotal {
                    name: key,
                    value: amount,
                });
            }
        }
    }

    fn into_ranked(mut self, limit: usize) -> Vec<CategoryTotal> {
        // Stable sort keeps first-seen order among equal totals.
        self.totals.sort_by(|a, b| b.value.total_cmp(&a.value));
        self.totals.truncate(limit);
        self.totals
    }
}

/// Everything the chart panels render, derived from one table and one role
/// assignment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartData {
    pub time_series: Vec<TimePoint>,
    pub bars: Vec<CategoryTotal>,
    pub pie: Vec<CategoryTotal>,
    pub pie_total: f64,
    /// Mean of the time-series values, drawn as the reference line.
    pub average: f64,
    pub max_bar: f64,
    pub value_column: String,
    pub secondary_value_column: String,
    pub category_column: String,
    pub region_column: String,
}

pub fn build_chart_data(table: &Table, roles: &RoleAssignment, limits: &ChartLimits) -> ChartData {
    let value = roles.value.as_deref();
    let time_series = build_time_series_limited(
        table,
        roles.date.as_deref(),
        value,
        roles.secondary_value.as_deref(),
        limits.time_series_periods,
    );
    let bars = build_category_totals(table, roles.category.as_deref(), value, limits.bars);
    let pie = build_category_totals(table, roles.region.as_deref(), value, limits.pie_segments);

    let average = if time_series.is_empty() {
        0.0
    } else {
        time_series.iter().map(|p| p.value).sum::<f64>() / time_series.len() as f64
    };
    let max_bar = bars.iter().map(|b| b.value).fold(0.0, f64::max);
    let pie_total = pie.iter().map(|p| p.value).sum();

    ChartData {
        time_series,
        bars,
        pie,
        pie_total,
        average,
        max_bar,
        value_column: roles.value.clone().unwrap_or_else(|| "value".into()),
        secondary_value_column: roles
            .secondary_value
            .clone()
            .unwrap_or_else(|| "value2".into()),
        category_column: roles.category.clone().unwrap_or_else(|| "category".into()),
        region_column: roles.region.clone().unwrap_or_else(|| "region".into()),
    }
}

/// Pie segments hidden from the legend. At least one segment always stays
/// visible.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PieSelection {
    hidden: BTreeSet<String>,
}

impl PieSelection {
    /// Flips `name` within `pie`; returns whether it is hidden afterwards.
    /// Names that are not segments of `pie` are ignored.
    pub fn toggle(&mut self, name: &str, pie: &[CategoryTotal]) -> bool {
        self.hidden.retain(|hidden| pie.iter().any(|s| &s.name == hidden));
        if !pie.iter().any(|s| s.name == name) {
            return false;
        }
        if self.hidden.remove(name) {
            return false;
        }
        if self.hidden.len() + 1 < pie.len() {
            self.hidden.insert(name.to_string());
            return true;
        }
        false
    }

    pub fn is_hidden(&self, name: &str) -> bool {
        self.hidden.contains(name)
    }

    pub fn visible<'a>(&self, pie: &'a [CategoryTotal]) -> Vec<&'a CategoryTotal> {
        pie.iter().filter(|s| !self.is_hidden(&s.name)).collect()
    }

    pub fn visible_total(&self, pie: &[CategoryTotal]) -> f64 {
        self.visible(pie).iter().map(|s| s.value).sum()
    }
}
