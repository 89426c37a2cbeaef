//! KPI cards, column summaries, and value formatting.

use rand::Rng;
use serde::Serialize;

use crate::{
    data::{Table, column_label},
    roles::RoleAssignment,
};

pub const SPARKLINE_POINTS: usize = 7;
const SPARKLINE_JITTER: f64 = 0.05;

/// Currency-style label: `$1.2M`, `$3.4K`, `$950`.
pub fn format_value(value: f64) -> String {
    if value >= 1_000_000.0 {
        format!("${:.1}M", value / 1_000_000.0)
    } else if value >= 1_000.0 {
        format!("${:.1}K", value / 1_000.0)
    } else {
        format!("${:.0}", value.round())
    }
}

/// Same thresholds as [`format_value`] without the currency sign. Smaller
/// values keep up to two decimals and group thousands.
pub fn format_count(value: f64) -> String {
    if value >= 1_000_000.0 {
        return format!("{:.1}M", value / 1_000_000.0);
    }
    if value >= 1_000.0 {
        return format!("{:.1}K", value / 1_000.0);
    }
    let rendered = format!("{value:.2}");
    let trimmed = rendered.trim_end_matches('0').trim_end_matches('.');
    if trimmed == "-0" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiCard {
    pub label: String,
    pub value: f64,
    pub formatted: String,
    pub trend: String,
    pub trend_up: bool,
    pub previous_value: f64,
    pub sparkline: Vec<f64>,
}

fn column_total(table: &Table, column: Option<&str>) -> Option<f64> {
    let values = table.column_values(column?)?;
    Some(values.map(|v| v.coerce_number()).sum())
}

fn sparkline<R: Rng>(rng: &mut R, base: f64) -> Vec<f64> {
    (0..SPARKLINE_POINTS)
        .map(|_| base * (1.0 + rng.gen_range(-SPARKLINE_JITTER..SPARKLINE_JITTER)))
        .collect()
}

/// Builds the four headline cards. Previous values and trend labels are
/// simulated; sparklines are jittered around the per-point share of each
/// total.
pub fn build_kpis<R: Rng>(table: &Table, roles: &RoleAssignment, rng: &mut R) -> Vec<KpiCard> {
    let rows = table.row_count() as f64;
    let total_value = column_total(table, roles.value.as_deref()).unwrap_or(0.0);
    let total_count = column_total(table, roles.count.as_deref()).unwrap_or(rows);
    let average = if rows > 0.0 { total_value / rows } else { 0.0 };
    let points = SPARKLINE_POINTS as f64;

    let value_label = roles
        .value
        .as_deref()
        .map(|c| format!("Total {}", column_label(c)))
        .unwrap_or_else(|| "Total Value".to_string());
    let count_label = roles
        .count
        .as_deref()
        .map(|c| format!("Total {}", column_label(c)))
        .unwrap_or_else(|| "Total Items".to_string());

    vec![
        KpiCard {
            label: value_label,
            value: total_value,
            formatted: format_value(total_value),
            trend: "+12.5%".into(),
            trend_up: true,
            previous_value: total_value * 0.889,
            sparkline: sparkline(rng, total_value / points),
        },
        KpiCard {
            label: "Total Records".into(),
            value: rows,
            formatted: format_count(rows),
            trend: "+8.2%".into(),
            trend_up: true,
            previous_value: (rows * 0.924).floor(),
            sparkline: sparkline(rng, rows / points),
        },
        KpiCard {
            label: count_label,
            value: total_count,
            formatted: format_count(total_count),
            trend: "+15.3%".into(),
            trend_up: true,
            previous_value: (total_count * 0.867).floor(),
            sparkline: sparkline(rng, total_count / points),
        },
        KpiCard {
            label: "Avg. per Record".into(),
            value: average,
            formatted: format_value(average),
            trend: "-3.2%".into(),
            trend_up: false,
            previous_value: average * 1.033,
            sparkline: sparkline(rng, average),
        },
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ColumnSummary {
    pub total: f64,
    pub average: f64,
    pub min: f64,
    pub max: f64,
    pub count: usize,
}

/// Summary of `column` over every row; all zeros for an empty table or an
/// absent column.
pub fn summarize_column(table: &Table, column: &str) -> ColumnSummary {
    let Some(values) = table.column_values(column) else {
        return ColumnSummary::default();
    };
    let numbers: Vec<f64> = values.map(|v| v.coerce_number()).collect();
    if numbers.is_empty() {
        return ColumnSummary::default();
    }
    let total: f64 = numbers.iter().sum();
    ColumnSummary {
        total,
        average: total / numbers.len() as f64,
        min: numbers.iter().copied().fold(f64::INFINITY, f64::min),
        max: numbers.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        count: numbers.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Value;
    use rand::{SeedableRng, rngs::StdRng};

    #[test]
    fn formats_currency_thresholds() {
        assert_eq!(format_value(1_234_567.0), "$1.2M");
        assert_eq!(format_value(1_500.0), "$1.5K");
        assert_eq!(format_value(999.4), "$999");
        assert_eq!(format_value(0.0), "$0");
    }

    #[test]
    fn formats_counts_without_currency() {
        assert_eq!(format_count(2_500_000.0), "2.5M");
        assert_eq!(format_count(12_000.0), "12.0K");
        assert_eq!(format_count(42.0), "42");
        assert_eq!(format_count(3.25), "3.25");
    }

    fn table() -> Table {
        Table::new(
            "t.csv",
            vec!["revenue".into(), "quantity".into()],
            vec![
                vec![Value::Number(100.0), Value::Number(2.0)],
                vec![Value::Number(300.0), Value::Text("x".into())],
            ],
        )
    }

    #[test]
    fn kpis_use_selected_columns() {
        let roles = RoleAssignment {
            value: Some("revenue".into()),
            count: Some("quantity".into()),
            ..RoleAssignment::default()
        };
        let kpis = build_kpis(&table(), &roles, &mut StdRng::seed_from_u64(1));
        assert_eq!(kpis.len(), 4);
        assert_eq!(kpis[0].label, "Total revenue");
        assert_eq!(kpis[0].value, 400.0);
        assert_eq!(kpis[1].value, 2.0);
        assert_eq!(kpis[2].value, 2.0);
        assert_eq!(kpis[3].value, 200.0);
        assert!(!kpis[3].trend_up);
        for card in &kpis {
            assert_eq!(card.sparkline.len(), SPARKLINE_POINTS);
        }
        let base = 200.0;
        assert!(kpis[3].sparkline.iter().all(|p| (p - base).abs() <= base * 0.05));
    }

    #[test]
    fn count_falls_back_to_rows() {
        let kpis = build_kpis(&table(), &RoleAssignment::default(), &mut StdRng::seed_from_u64(1));
        assert_eq!(kpis[0].label, "Total Value");
        assert_eq!(kpis[0].value, 0.0);
        assert_eq!(kpis[2].value, 2.0);
        assert_eq!(kpis[2].previous_value, 1.0);
    }

    #[test]
    fn summary_covers_all_rows() {
        let summary = summarize_column(&table(), "quantity");
        assert_eq!(summary.total, 2.0);
        assert_eq!(summary.average, 1.0);
        assert_eq!(summary.min, 0.0);
        assert_eq!(summary.max, 2.0);
        assert_eq!(summarize_column(&table(), "missing"), ColumnSummary::default());
    }
}
