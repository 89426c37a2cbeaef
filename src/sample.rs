//! Generated demo datasets for trying the dashboard without a file.

use chrono::NaiveDate;
use clap::ValueEnum;
use rand::{Rng, seq::SliceRandom};

use crate::data::{Table, Value};

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
#[value(rename_all = "kebab-case")]
pub enum SampleDataset {
    /// E-commerce orders with category, region, quantity, revenue, and cost
    Sales,
    /// CRM export with segment, status, and lifetime value
    Customers,
    /// Campaign performance by channel
    Marketing,
}

const SALES_ROWS: usize = 500;
const CUSTOMER_ROWS: usize = 300;
const MARKETING_ROWS: usize = 200;

impl SampleDataset {
    pub fn file_name(&self) -> &'static str {
        match self {
            SampleDataset::Sales => "sales_data.csv",
            SampleDataset::Customers => "customer_insights.csv",
            SampleDataset::Marketing => "marketing_metrics.csv",
        }
    }

    pub fn generate<R: Rng>(&self, rng: &mut R) -> Table {
        match self {
            SampleDataset::Sales => sales(rng),
            SampleDataset::Customers => customers(rng),
            SampleDataset::Marketing => marketing(rng),
        }
    }
}

fn sales<R: Rng>(rng: &mut R) -> Table {
    const CATEGORIES: &[&str] = &["Electronics", "Clothing", "Home & Garden", "Sports", "Books"];
    const REGIONS: &[&str] = &["North", "South", "East", "West", "Central"];
    let rows = (0..SALES_ROWS)
        .map(|i| {
            vec![
                Value::Number((i + 1) as f64),
                Value::Text(random_date(rng)),
                Value::Text(format!("Product {}", rng.gen_range(1..=100))),
                pick(rng, CATEGORIES),
                pick(rng, REGIONS),
                Value::Number(rng.gen_range(1..=50) as f64),
                Value::Number(rng.gen_range(100..5100) as f64),
                Value::Number(rng.gen_range(50..2050) as f64),
            ]
        })
        .collect();
    Table::new(
        SampleDataset::Sales.file_name(),
        columns(&[
            "id", "date", "product", "category", "region", "quantity", "revenue", "cost",
        ]),
        rows,
    )
}

fn customers<R: Rng>(rng: &mut R) -> Table {
    const SEGMENTS: &[&str] = &["Enterprise", "SMB", "Startup", "Consumer"];
    const STATUSES: &[&str] = &["Active", "Churned", "At Risk", "New"];
    let rows = (0..CUSTOMER_ROWS)
        .map(|i| {
            let id = i + 1;
            vec![
                Value::Number(id as f64),
                Value::Text(format!("Customer {id}")),
                Value::Text(format!("customer{id}@example.com")),
                pick(rng, SEGMENTS),
                pick(rng, STATUSES),
                Value::Number(rng.gen_range(1000..51_000) as f64),
                Value::Text(random_date(rng)),
                Value::Number(rng.gen_range(1..=100) as f64),
            ]
        })
        .collect();
    Table::new(
        SampleDataset::Customers.file_name(),
        columns(&[
            "customer_id",
            "name",
            "email",
            "segment",
            "status",
            "lifetime_value",
            "last_purchase",
            "total_orders",
        ]),
        rows,
    )
}

fn marketing<R: Rng>(rng: &mut R) -> Table {
    const CHANNELS: &[&str] = &["Email", "Social", "PPC", "Organic", "Referral"];
    const CAMPAIGNS: &[&str] = &[
        "Summer Sale",
        "Black Friday",
        "New Year",
        "Spring Launch",
        "Holiday Special",
    ];
    let rows = (0..MARKETING_ROWS)
        .map(|i| {
            let roi: f64 = rng.gen_range(0.5..5.5);
            vec![
                Value::Number((i + 1) as f64),
                pick(rng, CAMPAIGNS),
                pick(rng, CHANNELS),
                Value::Number(rng.gen_range(5000..105_000) as f64),
                Value::Number(rng.gen_range(100..5100) as f64),
                Value::Number(rng.gen_range(10..510) as f64),
                Value::Number(rng.gen_range(500..10_500) as f64),
                // ROI is pre-formatted text, so it never classifies as numeric.
                Value::Text(format!("{roi:.2}")),
            ]
        })
        .collect();
    Table::new(
        SampleDataset::Marketing.file_name(),
        columns(&[
            "campaign_id",
            "campaign",
            "channel",
            "impressions",
            "clicks",
            "conversions",
            "spend",
            "roi",
        ]),
        rows,
    )
}

fn columns(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

fn pick<R: Rng>(rng: &mut R, options: &[&str]) -> Value {
    Value::Text(options.choose(rng).copied().unwrap_or_default().to_string())
}

fn random_date<R: Rng>(rng: &mut R) -> String {
    let month = rng.gen_range(1..=12);
    let day = rng.gen_range(1..=28);
    NaiveDate::from_ymd_opt(2025, month, day)
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}
