use std::hint::black_box;

use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use datadash::aggregate::{ChartLimits, build_chart_data};
use datadash::cache::DashboardCache;
use datadash::classify::TableProfile;
use datadash::data::{Table, Value};
use datadash::roles::default_selector;

fn generate_orders(rows: usize) -> Table {
    const REGIONS: [&str; 5] = ["North", "South", "East", "West", "Central"];
    const CATEGORIES: [&str; 4] = ["Books", "Sports", "Clothing", "Electronics"];
    let rows = (0..rows)
        .map(|i| {
            let month = (i % 12) + 1;
            let day = (i % 28) + 1;
            vec![
                Value::Text(format!("2024-{month:02}-{day:02}")),
                Value::Text(CATEGORIES[i % CATEGORIES.len()].to_string()),
                Value::Text(REGIONS[i % REGIONS.len()].to_string()),
                Value::Number((i % 50) as f64),
                Value::Number(((i * 37) % 5000) as f64),
            ]
        })
        .collect();
    Table::new(
        "orders.csv",
        ["date", "category", "region", "quantity", "revenue"]
            .iter()
            .map(|c| c.to_string())
            .collect(),
        rows,
    )
}

fn bench_chart_data(c: &mut Criterion) {
    let table = generate_orders(50_000);
    let roles = default_selector().select(&TableProfile::build(&table, 10));
    let limits = ChartLimits::default();

    let mut group = c.benchmark_group("chart_data");

    group.bench_function("uncached", |b| {
        b.iter(|| black_box(build_chart_data(&table, &roles, &limits)));
    });

    group.bench_function("cached", |b| {
        b.iter_batched(
            || {
                let mut cache = DashboardCache::default();
                cache.chart_data(&table, &roles, &limits);
                cache
            },
            |mut cache| black_box(cache.chart_data(&table, &roles, &limits)),
            BatchSize::SmallInput,
        );
    });

    group.finish();
}

criterion_group!(benches, bench_chart_data);
criterion_main!(benches);
