mod common;

use common::{load_fixture, table_from};
use datadash::aggregate::{ChartLimits, build_chart_data};
use datadash::classify::TableProfile;
use datadash::config::DashboardConfig;
use datadash::dashboard::Dashboard;
use datadash::data::Table;
use datadash::insight::{ConfidenceTable, InsightKind, TotalsMeta, compute_insights};
use datadash::metrics::format_value;
use datadash::roles::{RoleAssignment, default_selector};
use rand::{SeedableRng, rngs::StdRng};

fn insights_for(table: &Table) -> Vec<datadash::insight::Insight> {
    let roles = default_selector().select(&TableProfile::build(table, 10));
    let chart = build_chart_data(table, &roles, &ChartLimits::default());
    let meta = TotalsMeta {
        row_count: table.row_count(),
        column_count: table.column_count(),
    };
    compute_insights(&chart, meta, &ConfidenceTable::default())
}

#[test]
fn currency_formatting() {
    assert_eq!(format_value(999.0), "$999");
    assert_eq!(format_value(1500.0), "$1.5K");
    assert_eq!(format_value(2_500_000.0), "$2.5M");
}

#[test]
fn fixture_insights() {
    let insights = insights_for(&load_fixture("sales_small.csv"));
    let kinds: Vec<InsightKind> = insights.iter().map(|i| i.kind).collect();
    assert_eq!(
        kinds,
        vec![
            InsightKind::Positive,
            InsightKind::Positive,
            InsightKind::Warning,
            InsightKind::Recommendation,
        ]
    );
    assert_eq!(insights[0].confidence, 92);
    assert_eq!(insights[0].supporting[2].value, "+83.3%");
    assert_eq!(insights[1].headline, "\"Widgets\" Leads Performance");
    assert_eq!(insights[1].supporting[1].value, "+0.0%");
    assert_eq!(insights[1].supporting[2].value, "41.7%");
    assert_eq!(insights[2].headline, "\"East\" Needs Attention");
    assert_eq!(insights[2].supporting[2].value, "-29.2%");
    assert!(insights[3].description.contains("Cross-analyze category with region"));
}

#[test]
fn zero_first_period_reports_no_change() {
    let table = table_from(
        &["date", "revenue"],
        &[&["2024-01-01", "0"], &["2024-02-01", "5"]],
    );
    let insights = insights_for(&table);
    assert_eq!(insights[0].id, "trend-1");
    assert_eq!(insights[0].supporting[2].value, "+0.0%");
    assert!(insights.iter().all(|i| i.kind != InsightKind::Info));
}

#[test]
fn empty_table_only_recommends() {
    let table = Table::new("empty.csv", vec!["date".into(), "revenue".into()], Vec::new());
    let insights = insights_for(&table);
    assert_eq!(insights.len(), 1);
    assert_eq!(insights[0].kind, InsightKind::Recommendation);

    let chart = build_chart_data(&table, &RoleAssignment::default(), &ChartLimits::default());
    assert!(chart.time_series.is_empty() && chart.bars.is_empty() && chart.pie.is_empty());
}

#[test]
fn configured_confidence_flows_through_dashboard() {
    let config = DashboardConfig::from_yaml("confidence:\n  recommendation: 50\n").unwrap();
    let mut dashboard = Dashboard::new(config).unwrap();
    let report = dashboard.build(&load_fixture("sales_small.csv"), &mut StdRng::seed_from_u64(4));
    let recommendation = report
        .insights
        .iter()
        .find(|i| i.kind == InsightKind::Recommendation)
        .unwrap();
    assert_eq!(recommendation.confidence, 50);
    assert_eq!(report.kpis[0].formatted, "$600");
    assert_eq!(report.kpis[2].value, 13.0);
    assert_eq!(report.kpis[3].formatted, "$100");
}
