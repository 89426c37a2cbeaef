//! End-to-end dashboard assembly: profile, roles, KPIs, charts, insights.

use std::{fmt::Write as _, sync::Arc};

use anyhow::Result;
use rand::Rng;
use serde::Serialize;

use crate::{
    aggregate::{CategoryTotal, ChartData, PieSelection},
    cache::DashboardCache,
    classify::{ColumnProfile, TableProfile},
    config::DashboardConfig,
    data::Table,
    insight::{Insight, TotalsMeta, compute_insights},
    metrics::{KpiCard, build_kpis, format_value},
    roles::{RoleAssignment, RoleSelector},
    table::{Alignment, render_pairs, render_table, render_table_aligned},
};

#[derive(Debug, Clone, Serialize)]
pub struct DashboardReport {
    pub file_name: String,
    pub row_count: usize,
    pub column_count: usize,
    pub columns: Vec<ColumnProfile>,
    pub roles: RoleAssignment,
    pub kpis: Vec<KpiCard>,
    pub charts: Arc<ChartData>,
    pub insights: Vec<Insight>,
}

#[derive(Debug)]
pub struct Dashboard {
    config: DashboardConfig,
    selector: RoleSelector,
    cache: DashboardCache,
}

impl Dashboard {
    pub fn new(config: DashboardConfig) -> Result<Self> {
        let selector = config.role_selector()?;
        let cache = DashboardCache::new(config.cache_capacity);
        Ok(Self {
            config,
            selector,
            cache,
        })
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn cache(&self) -> &DashboardCache {
        &self.cache
    }

    pub fn profile(&self, table: &Table) -> TableProfile {
        TableProfile::build(table, self.config.sample_rows)
    }

    pub fn roles(&self, profile: &TableProfile) -> RoleAssignment {
        self.selector.select(profile)
    }

    pub fn build<R: Rng>(&mut self, table: &Table, rng: &mut R) -> DashboardReport {
        let profile = self.profile(table);
        let roles = self.roles(&profile);
        let charts = self.cache.chart_data(table, &roles, &self.config.limits);
        let kpis = build_kpis(table, &roles, rng);
        let meta = TotalsMeta {
            row_count: table.row_count(),
            column_count: table.column_count(),
        };
        let insights = compute_insights(&charts, meta, &self.config.confidence);
        DashboardReport {
            file_name: table.file_name().to_string(),
            row_count: table.row_count(),
            column_count: table.column_count(),
            columns: profile.columns,
            roles,
            kpis,
            charts,
            insights,
        }
    }
}

fn totals_rows(totals: &[CategoryTotal]) -> Vec<Vec<String>> {
    totals
        .iter()
        .map(|t| vec![t.name.clone(), format_value(t.value)])
        .collect()
}

impl DashboardReport {
    /// Text rendering; segments hidden in `selection` are left out of the
    /// share table and shares are taken over the visible total.
    pub fn render_text(&self, selection: &PieSelection) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{} ({} rows, {} columns)\n",
            self.file_name, self.row_count, self.column_count
        );

        let kpi_rows = self
            .kpis
            .iter()
            .map(|k| vec![k.label.clone(), k.formatted.clone(), k.trend.clone()])
            .collect::<Vec<_>>();
        out.push_str(&render_table_aligned(
            &["KPI".into(), "Value".into(), "Trend".into()],
            &kpi_rows,
            &[Alignment::Left, Alignment::Right, Alignment::Right],
        ));

        let charts = &self.charts;
        if !charts.time_series.is_empty() {
            let _ = writeln!(out, "\nMonthly {}", charts.value_column);
            let rows = charts
                .time_series
                .iter()
                .map(|p| vec![p.period.clone(), format_value(p.value), format_value(p.value2)])
                .collect::<Vec<_>>();
            out.push_str(&render_table_aligned(
                &[
                    "Period".into(),
                    charts.value_column.clone(),
                    charts.secondary_value_column.clone(),
                ],
                &rows,
                &[Alignment::Left, Alignment::Right, Alignment::Right],
            ));
            let _ = writeln!(out, "Average: {}", format_value(charts.average));
        }
        if !charts.bars.is_empty() {
            let _ = writeln!(out, "\nTop {}", charts.category_column);
            out.push_str(&render_table(
                &[charts.category_column.clone(), charts.value_column.clone()],
                &totals_rows(&charts.bars),
            ));
        }
        if !charts.pie.is_empty() {
            let _ = writeln!(out, "\nShare by {}", charts.region_column);
            let visible_total = selection.visible_total(&charts.pie);
            let rows = selection
                .visible(&charts.pie)
                .into_iter()
                .map(|p| {
                    let share = if visible_total > 0.0 {
                        p.value / visible_total * 100.0
                    } else {
                        0.0
                    };
                    vec![p.name.clone(), format_value(p.value), format!("{share:.1}%")]
                })
                .collect::<Vec<_>>();
            out.push_str(&render_table(
                &[charts.region_column.clone(), charts.value_column.clone(), "Share".into()],
                &rows,
            ));
        }

        let _ = writeln!(out, "\nInsights");
        for insight in &self.insights {
            let _ = writeln!(
                out,
                "\n[{:?}] {} ({}% confidence)\n{}",
                insight.kind, insight.headline, insight.confidence, insight.description
            );
            let pairs = insight
                .supporting
                .iter()
                .map(|d| (format!("  {}", d.label), d.value.clone()))
                .collect::<Vec<_>>();
            out.push_str(&render_pairs(&pairs));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::SampleDataset;
    use rand::{SeedableRng, rngs::StdRng};

    #[test]
    fn sales_sample_builds_full_report() {
        let mut rng = StdRng::seed_from_u64(11);
        let table = SampleDataset::Sales.generate(&mut rng);
        let mut dashboard = Dashboard::new(DashboardConfig::default()).unwrap();
        let report = dashboard.build(&table, &mut rng);
        assert_eq!(report.roles.value.as_deref(), Some("revenue"));
        assert_eq!(report.roles.category.as_deref(), Some("category"));
        assert_eq!(report.roles.region.as_deref(), Some("region"));
        assert_eq!(report.charts.time_series.len(), 12);
        assert_eq!(report.charts.bars.len(), 5);
        assert_eq!(report.insights.len(), 5);
        let text = report.render_text(&PieSelection::default());
        assert!(text.contains("sales_data.csv (500 rows, 8 columns)"));
        assert!(text.contains("Deep Dive Opportunity"));
    }

    #[test]
    fn repeated_builds_hit_the_cache() {
        let mut rng = StdRng::seed_from_u64(2);
        let table = SampleDataset::Customers.generate(&mut rng);
        let mut dashboard = Dashboard::new(DashboardConfig::default()).unwrap();
        let first = dashboard.build(&table, &mut rng);
        let second = dashboard.build(&table, &mut rng);
        assert!(Arc::ptr_eq(&first.charts, &second.charts));
        assert_eq!(dashboard.cache().hits(), 1);
    }
}
