//! Keyword-driven assistant replies over the loaded table.
//!
//! Replies are templates: the message is lowercased and matched against a
//! fixed list of intents, and the chosen template is filled from column
//! totals. No model is involved.

use itertools::Itertools;
use rand::Rng;
use serde::Serialize;
use uuid::Uuid;

use crate::{
    aggregate::build_category_totals,
    data::{Table, column_label},
    insight::group_thousands,
    metrics::{ColumnSummary, format_value, summarize_column},
    roles::RoleAssignment,
};

/// Share of rows reported as potential anomalies.
const ANOMALY_RATE: f64 = 0.02;
const COMPARE_CATEGORIES: usize = 4;
const SHARE_SPLIT: [f64; 4] = [35.0, 28.0, 22.0, 15.0];
const FALLBACK_METRIC: &str = "primary metric";
const FALLBACK_TOP_LABEL: &str = "Category A";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MiniChartKind {
    Bar,
    Line,
    Pie,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MiniChart {
    pub kind: MiniChartKind,
    pub values: Vec<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataReference {
    pub label: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart: Option<String>,
}

impl DataReference {
    fn new(label: impl Into<String>, value: impl Into<String>, chart: Option<&str>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
            chart: chart.map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub role: ChatRole,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mini_chart: Option<MiniChart>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<DataReference>,
}

impl ChatMessage {
    fn assistant(content: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: ChatRole::Assistant,
            content,
            mini_chart: None,
            references: Vec::new(),
        }
    }

    /// Wraps user input; `None` when the input is blank.
    pub fn user(content: &str) -> Option<Self> {
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self {
            role: ChatRole::User,
            ..Self::assistant(trimmed.to_string())
        })
    }

    fn with_chart(mut self, kind: MiniChartKind, values: Vec<f64>, labels: Vec<String>) -> Self {
        self.mini_chart = Some(MiniChart {
            kind,
            values,
            labels,
        });
        self
    }

    fn with_references(mut self, references: Vec<DataReference>) -> Self {
        self.references = references;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Intent {
    Trend,
    Anomaly,
    Compare,
    Share,
    Summary,
}

impl Intent {
    fn detect(message: &str) -> Self {
        let lower = message.to_lowercase();
        let has = |words: &[&str]| words.iter().any(|w| lower.contains(w));
        if has(&["trend", "pattern"]) {
            Intent::Trend
        } else if has(&["anomal", "outlier"]) {
            Intent::Anomaly
        } else if has(&["compare", "category", "distribution"]) {
            Intent::Compare
        } else if has(&["pie", "share", "portion"]) {
            Intent::Share
        } else {
            Intent::Summary
        }
    }
}

struct ReplyContext<'a> {
    table: &'a Table,
    roles: &'a RoleAssignment,
    value_label: String,
    summary: ColumnSummary,
}

impl<'a> ReplyContext<'a> {
    fn new(table: &'a Table, roles: &'a RoleAssignment) -> Self {
        let summary = roles
            .value
            .as_deref()
            .map(|c| summarize_column(table, c))
            .unwrap_or_default();
        let value_label = roles
            .value
            .as_deref()
            .map(column_label)
            .unwrap_or_else(|| "value".to_string());
        Self {
            table,
            roles,
            value_label,
            summary,
        }
    }

    fn anomaly_count(&self) -> usize {
        (self.table.row_count() as f64 * ANOMALY_RATE).floor() as usize
    }

    fn distinct_categories(&self) -> Vec<String> {
        self.roles
            .category
            .as_deref()
            .and_then(|c| self.table.column_values(c))
            .map(|values| values.map(|v| v.as_display()).unique().collect())
            .unwrap_or_default()
    }
}

/// Opening messages shown before the user asks anything.
pub fn initial_messages<R: Rng>(
    table: &Table,
    roles: &RoleAssignment,
    rng: &mut R,
) -> Vec<ChatMessage> {
    let ctx = ReplyContext::new(table, roles);
    let growth: f64 = rng.gen_range(5.0..25.0);
    let trend: Vec<f64> = (0..7)
        .map(|i| ctx.summary.average * (0.9 + i as f64 * 0.02 + rng.gen_range(0.0..0.05)))
        .collect();

    let metric = roles
        .value
        .as_deref()
        .map(column_label)
        .unwrap_or_else(|| FALLBACK_METRIC.to_string());
    let (label, max) =
        top_row(table, roles).unwrap_or_else(|| (FALLBACK_TOP_LABEL.to_string(), 0.0));
    let share = if ctx.summary.total > 0.0 {
        max / ctx.summary.total * 100.0
    } else {
        0.0
    };

    vec![
        ChatMessage::assistant(format!(
            "**Strong Growth Detected**: Your {metric} shows a **+{growth:.1}%** increase over the analyzed period."
        ))
        .with_chart(MiniChartKind::Line, trend, Vec::new()),
        ChatMessage::assistant(format!(
            "**Top Performer**: \"{label}\" leads with **{}** in {}, contributing ~{share:.0}% of the total.",
            format_value(max),
            ctx.value_label
        ))
        .with_references(vec![DataReference::new(label, format_value(max), Some("bar"))]),
        ChatMessage::assistant(format!(
            "I found **{}** potential anomalies worth investigating. Would you like me to analyze them?",
            ctx.anomaly_count()
        )),
    ]
}

/// Row with the largest value, labelled by its first cell.
fn top_row(table: &Table, roles: &RoleAssignment) -> Option<(String, f64)> {
    let value_idx = table.column_index(roles.value.as_deref()?)?;
    table
        .rows()
        .iter()
        .map(|row| (row, row[value_idx].coerce_number()))
        .fold(None, |best: Option<(&Vec<_>, f64)>, (row, value)| match best {
            Some((_, top)) if top >= value => best,
            _ => Some((row, value)),
        })
        .map(|(row, value)| {
            let label = row.first().map(|v| v.as_display()).unwrap_or_default();
            (label, value)
        })
}

/// Reply to `message`; `None` when the message is blank.
pub fn respond<R: Rng>(
    message: &str,
    table: &Table,
    roles: &RoleAssignment,
    rng: &mut R,
) -> Option<ChatMessage> {
    if message.trim().is_empty() {
        return None;
    }
    let ctx = ReplyContext::new(table, roles);
    let reply = match Intent::detect(message) {
        Intent::Trend => trend_reply(&ctx, rng),
        Intent::Anomaly => anomaly_reply(&ctx),
        Intent::Compare => compare_reply(&ctx),
        Intent::Share => share_reply(&ctx),
        Intent::Summary => summary_reply(&ctx),
    };
    Some(reply)
}

fn trend_reply<R: Rng>(ctx: &ReplyContext<'_>, rng: &mut R) -> ChatMessage {
    let avg = ctx.summary.average;
    let values = (0..8)
        .map(|i| avg * (0.85 + i as f64 * 0.03 + rng.gen_range(0.0..0.1)))
        .collect();
    ChatMessage::assistant(format!(
        "Based on my analysis, I've identified **3 key trends**:\n\n\
         1. **Upward Momentum**: {} increased by ~12.5% over the period\n\
         2. **Seasonal Patterns**: Peak activity occurs mid-period\n\
         3. **Consistent Growth**: Average maintains above baseline",
        ctx.value_label
    ))
    .with_chart(MiniChartKind::Line, values, Vec::new())
    .with_references(vec![
        DataReference::new("Growth Rate", "+12.5%", Some("area")),
        DataReference::new("Peak Value", format_value(ctx.summary.max), Some("area")),
    ])
}

fn anomaly_reply(ctx: &ReplyContext<'_>) -> ChatMessage {
    let count = ctx.anomaly_count();
    let high = (count as f64 * 0.6).floor() as usize;
    let low = (count as f64 * 0.4).floor() as usize;
    let above = if ctx.summary.average > 0.0 {
        (ctx.summary.max / ctx.summary.average - 1.0) * 100.0
    } else {
        0.0
    };
    ChatMessage::assistant(format!(
        "I detected **{count} anomalies** in your dataset:\n\n\
         - **{high} high outliers** exceeding 2 standard deviations\n\
         - **{low} low outliers** below expected ranges\n\n\
         The maximum value of **{}** is {above:.0}% above average.",
        format_value(ctx.summary.max)
    ))
    .with_references(vec![
        DataReference::new("High Outliers", high.to_string(), None),
        DataReference::new("Max Value", format_value(ctx.summary.max), Some("area")),
    ])
}

fn compare_reply(ctx: &ReplyContext<'_>) -> ChatMessage {
    let distinct = ctx.distinct_categories().len();
    let totals = build_category_totals(
        ctx.table,
        ctx.roles.category.as_deref(),
        ctx.roles.value.as_deref(),
        COMPARE_CATEGORIES,
    );
    let category = ctx
        .roles
        .category
        .as_deref()
        .map(column_label)
        .unwrap_or_else(|| "category".to_string());
    let references = totals
        .iter()
        .take(2)
        .map(|t| DataReference::new(t.name.clone(), format_value(t.value), Some("bar")))
        .collect();
    ChatMessage::assistant(format!(
        "Here's the breakdown by {category}:\n\nYour data spans **{distinct}** distinct segments. \
         The top performers lead by clear margins, while bottom segments show room for improvement."
    ))
    .with_chart(
        MiniChartKind::Bar,
        totals.iter().map(|t| t.value).collect(),
        totals.iter().map(|t| t.name.clone()).collect(),
    )
    .with_references(references)
}

fn share_reply(ctx: &ReplyContext<'_>) -> ChatMessage {
    let mut labels: Vec<String> = ctx
        .distinct_categories()
        .into_iter()
        .take(SHARE_SPLIT.len())
        .collect();
    if labels.is_empty() {
        labels = ["A", "B", "C", "D"].iter().map(|s| s.to_string()).collect();
    }
    ChatMessage::assistant(
        "Market share distribution:\n\nThe data shows a **concentrated market** with the top \
         category holding ~35% share. Consider strategies to:\n\
         - Expand in growing segments\n\
         - Defend market leader position\n\
         - Identify untapped opportunities"
            .to_string(),
    )
    .with_chart(MiniChartKind::Pie, SHARE_SPLIT.to_vec(), labels)
}

fn summary_reply(ctx: &ReplyContext<'_>) -> ChatMessage {
    let s = &ctx.summary;
    let rows = group_thousands(ctx.table.row_count());
    ChatMessage::assistant(format!(
        "Analyzing your **{rows} records** across {} columns:\n\n\
         - **Total {}**: {}\n\
         - **Average**: {}\n\
         - **Range**: {} to {}",
        ctx.table.column_count(),
        ctx.value_label,
        format_value(s.total),
        format_value(s.average),
        format_value(s.min),
        format_value(s.max),
    ))
    .with_references(vec![
        DataReference::new("Total Records", rows, None),
        DataReference::new("Total Value", format_value(s.total), Some("area")),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Value;
    use rand::{SeedableRng, rngs::StdRng};

    fn fixture() -> (Table, RoleAssignment) {
        let rows = (0..100)
            .map(|i| {
                vec![
                    Value::Text(format!("row{i}")),
                    Value::Text(if i % 2 == 0 { "A" } else { "B" }.into()),
                    Value::Number(i as f64),
                ]
            })
            .collect();
        let table = Table::new("t.csv", vec!["id".into(), "kind".into(), "sales".into()], rows);
        let roles = RoleAssignment {
            value: Some("sales".into()),
            category: Some("kind".into()),
            ..RoleAssignment::default()
        };
        (table, roles)
    }

    #[test]
    fn routes_intents_in_priority_order() {
        assert_eq!(Intent::detect("Show the TREND of outliers"), Intent::Trend);
        assert_eq!(Intent::detect("any outliers?"), Intent::Anomaly);
        assert_eq!(Intent::detect("category share"), Intent::Compare);
        assert_eq!(Intent::detect("pie please"), Intent::Share);
        assert_eq!(Intent::detect("hello"), Intent::Summary);
    }

    #[test]
    fn blank_message_gets_no_reply() {
        let (table, roles) = fixture();
        let mut rng = StdRng::seed_from_u64(1);
        assert!(respond("   ", &table, &roles, &mut rng).is_none());
        assert!(ChatMessage::user("\t").is_none());
    }

    #[test]
    fn anomaly_count_is_two_percent() {
        let (table, roles) = fixture();
        let reply = respond("find anomalies", &table, &roles, &mut StdRng::seed_from_u64(1)).unwrap();
        assert!(reply.content.contains("**2 anomalies**"));
        assert_eq!(reply.references[0].value, "1");
    }

    #[test]
    fn compare_uses_category_totals() {
        let (table, roles) = fixture();
        let reply = respond("compare", &table, &roles, &mut StdRng::seed_from_u64(1)).unwrap();
        let chart = reply.mini_chart.unwrap();
        assert_eq!(chart.kind, MiniChartKind::Bar);
        assert_eq!(chart.labels, vec!["B", "A"]);
        assert_eq!(chart.values, vec![2500.0, 2450.0]);
        assert!(reply.content.contains("**2** distinct segments"));
    }

    #[test]
    fn initial_messages_name_top_row() {
        let (table, roles) = fixture();
        let messages = initial_messages(&table, &roles, &mut StdRng::seed_from_u64(9));
        assert_eq!(messages.len(), 3);
        assert!(messages[1].content.contains("\"row99\""));
        assert!(messages.iter().all(|m| m.role == ChatRole::Assistant));
    }

    #[test]
    fn initial_messages_fall_back_without_value_column() {
        let table = Table::new("t.csv", vec!["name".into()], vec![vec![Value::Text("a".into())]]);
        let messages = initial_messages(&table, &RoleAssignment::default(), &mut StdRng::seed_from_u64(2));
        assert_eq!(messages.len(), 3);
        assert!(messages[0].content.contains("Your primary metric shows"));
        assert!(messages[1].content.contains("\"Category A\" leads with **$0**"));
        assert!(messages[1].content.contains("~0% of the total"));
        assert_eq!(messages[1].references[0].label, "Category A");
    }

    #[test]
    fn summary_groups_record_count() {
        let rows = (0..1200)
            .map(|i| vec![Value::Text("A".into()), Value::Number(i as f64)])
            .collect();
        let table = Table::new("t.csv", vec!["kind".into(), "sales".into()], rows);
        let roles = RoleAssignment {
            value: Some("sales".into()),
            ..RoleAssignment::default()
        };
        let reply = respond("summary", &table, &roles, &mut StdRng::seed_from_u64(1)).unwrap();
        assert!(reply.content.contains("**1,200 records**"));
        assert_eq!(reply.references[0].value, "1,200");
    }

    #[test]
    fn summary_reports_range() {
        let (table, roles) = fixture();
        let reply = respond("hi", &table, &roles, &mut StdRng::seed_from_u64(1)).unwrap();
        assert!(reply.content.contains("**Range**: $0 to $99"));
        assert!(reply.content.contains("**Average**: $50"));
    }
}
