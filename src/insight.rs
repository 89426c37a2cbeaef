//! Templated insights derived from chart aggregates.
//!
//! Nothing here is a statistical test: each insight is a fixed template
//! filled from [`ChartData`], tagged with a per-kind confidence constant.

use std::io::Write;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{aggregate::ChartData, data::column_label, metrics::format_value};

/// Coefficient of variation (percent) above which volatility is "high".
pub const HIGH_VOLATILITY_THRESHOLD: f64 = 20.0;
const MIN_TREND_POINTS: usize = 2;
const MIN_VOLATILITY_POINTS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightKind {
    Positive,
    Warning,
    Info,
    Recommendation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SupportingDatum {
    pub label: String,
    pub value: String,
}

impl SupportingDatum {
    fn new(label: &str, value: impl Into<String>) -> Self {
        Self {
            label: label.to_string(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Insight {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: InsightKind,
    pub headline: String,
    pub description: String,
    pub confidence: u8,
    pub supporting: Vec<SupportingDatum>,
}

/// Confidence percentages attached to each insight template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceTable {
    pub trend: u8,
    pub top_performer: u8,
    pub underperformer: u8,
    pub recommendation: u8,
    pub volatility: u8,
}

impl Default for ConfidenceTable {
    fn default() -> Self {
        Self {
            trend: 92,
            top_performer: 88,
            underperformer: 76,
            recommendation: 84,
            volatility: 71,
        }
    }
}

/// Table dimensions quoted by the recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TotalsMeta {
    pub row_count: usize,
    pub column_count: usize,
}

pub fn compute_insights(
    chart: &ChartData,
    meta: TotalsMeta,
    confidence: &ConfidenceTable,
) -> Vec<Insight> {
    let mut insights = Vec::new();
    insights.extend(trend_insight(chart, confidence.trend));
    insights.extend(top_performer_insight(chart, confidence.top_performer));
    insights.extend(underperformer_insight(chart, confidence.underperformer));
    insights.push(recommendation_insight(chart, meta, confidence.recommendation));
    insights.extend(volatility_insight(chart, confidence.volatility));
    insights
}

fn trend_insight(chart: &ChartData, confidence: u8) -> Option<Insight> {
    if chart.time_series.len() < MIN_TREND_POINTS {
        return None;
    }
    let first = chart.time_series.first()?.value;
    let last = chart.time_series.last()?.value;
    let change = if first > 0.0 {
        (last - first) / first * 100.0
    } else {
        0.0
    };
    let rising = change >= 0.0;
    let label = column_label(&chart.value_column);
    let description = if rising {
        format!(
            "{label} grew by {:.1}% over the analyzed period, indicating strong performance.",
            change.abs()
        )
    } else {
        format!(
            "{label} declined by {:.1}% over the analyzed period, suggesting a need for strategic review.",
            change.abs()
        )
    };
    Some(Insight {
        id: "trend-1".into(),
        kind: if rising {
            InsightKind::Positive
        } else {
            InsightKind::Warning
        },
        headline: if rising {
            "Growth Trend Detected".into()
        } else {
            "Decline Alert".into()
        },
        description,
        confidence,
        supporting: vec![
            SupportingDatum::new("Starting Value", format_value(first)),
            SupportingDatum::new("Current Value", format_value(last)),
            SupportingDatum::new(
                "Change",
                format!("{}{change:.1}%", if rising { "+" } else { "" }),
            ),
            SupportingDatum::new("Period", format!("{} months", chart.time_series.len())),
        ],
    })
}

fn top_performer_insight(chart: &ChartData, confidence: u8) -> Option<Insight> {
    let top = chart.bars.first()?;
    let runner_up = chart.bars.get(1);
    let lead = runner_up.map(|second| {
        if second.value == 0.0 {
            0.0
        } else {
            (top.value - second.value) / second.value * 100.0
        }
    });
    let share = if chart.pie_total > 0.0 {
        top.value / chart.pie_total * 100.0
    } else {
        0.0
    };

    let mut description = format!(
        "Top performing {} with {} in {}",
        column_label(&chart.category_column),
        format_value(top.value),
        column_label(&chart.value_column)
    );
    if let Some(lead) = lead {
        description.push_str(&format!(", outpacing second place by {lead:.1}%"));
    }
    description.push('.');

    let mut supporting = vec![SupportingDatum::new("Total Value", format_value(top.value))];
    if let Some(lead) = lead {
        supporting.push(SupportingDatum::new("vs Runner-up", format!("+{lead:.1}%")));
    }
    supporting.push(SupportingDatum::new("Market Share", format!("{share:.1}%")));

    Some(Insight {
        id: "performer-1".into(),
        kind: InsightKind::Positive,
        headline: format!("\"{}\" Leads Performance", top.name),
        description,
        confidence,
        supporting,
    })
}

fn underperformer_insight(chart: &ChartData, confidence: u8) -> Option<Insight> {
    let smallest = chart.pie.last()?;
    let share = if chart.pie_total > 0.0 {
        smallest.value / chart.pie_total * 100.0
    } else {
        0.0
    };
    let even_share = 100.0 / chart.pie.len() as f64;
    Some(Insight {
        id: "warning-1".into(),
        kind: InsightKind::Warning,
        headline: format!("\"{}\" Needs Attention", smallest.name),
        description: format!(
            "Contributing only {share:.1}% to total {}. Consider targeted campaigns or resource reallocation.",
            column_label(&chart.value_column)
        ),
        confidence,
        supporting: vec![
            SupportingDatum::new("Current Contribution", format!("{share:.1}%")),
            SupportingDatum::new("Value", format_value(smallest.value)),
            SupportingDatum::new("Gap to Average", format!("-{:.1}%", even_share - share)),
        ],
    })
}

fn recommendation_insight(chart: &ChartData, meta: TotalsMeta, confidence: u8) -> Insight {
    Insight {
        id: "recommendation-1".into(),
        kind: InsightKind::Recommendation,
        headline: "Deep Dive Opportunity".into(),
        description: format!(
            "Cross-analyze {} with {} to uncover hidden growth segments and optimize resource allocation.",
            column_label(&chart.category_column),
            column_label(&chart.region_column)
        ),
        confidence,
        supporting: vec![
            SupportingDatum::new("Dimensions Available", meta.column_count.to_string()),
            SupportingDatum::new("Data Points", group_thousands(meta.row_count)),
        ],
    }
}

fn volatility_insight(chart: &ChartData, confidence: u8) -> Option<Insight> {
    if chart.time_series.len() < MIN_VOLATILITY_POINTS {
        return None;
    }
    let values: Vec<f64> = chart.time_series.iter().map(|p| p.value).collect();
    let (mean, std_dev) = mean_and_std_dev(&values);
    let volatility = if mean == 0.0 {
        0.0
    } else {
        std_dev / mean * 100.0
    };
    let level = if volatility > HIGH_VOLATILITY_THRESHOLD {
        "high"
    } else {
        "moderate"
    };
    Some(Insight {
        id: "info-1".into(),
        kind: InsightKind::Info,
        headline: "Seasonal Pattern Detected".into(),
        description: format!(
            "Data shows {level} volatility ({volatility:.1}% coefficient of variation) suggesting seasonal trends worth investigating."
        ),
        confidence,
        supporting: vec![
            SupportingDatum::new("Volatility Index", format!("{volatility:.1}%")),
            SupportingDatum::new("Average", format_value(mean)),
            SupportingDatum::new("Std Deviation", format_value(std_dev)),
        ],
    })
}

/// Population mean and standard deviation.
fn mean_and_std_dev(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

pub(crate) fn group_thousands(value: usize) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[derive(Debug, Serialize)]
struct ExportedInsight<'a> {
    headline: &'a str,
    description: &'a str,
    #[serde(rename = "type")]
    kind: InsightKind,
    confidence: String,
}

/// Pretty JSON array of `{headline, description, type, confidence}` with the
/// confidence rendered as a percentage string.
pub fn export_insights_json(insights: &[Insight]) -> Result<String> {
    let exported: Vec<ExportedInsight<'_>> = insights
        .iter()
        .map(|i| ExportedInsight {
            headline: &i.headline,
            description: &i.description,
            kind: i.kind,
            confidence: format!("{}%", i.confidence),
        })
        .collect();
    serde_json::to_string_pretty(&exported).context("Serializing insights")
}

pub fn write_insights_json<W: Write>(writer: &mut W, insights: &[Insight]) -> Result<()> {
    let json = export_insights_json(insights)?;
    writeln!(writer, "{json}").context("Writing insights")
}
