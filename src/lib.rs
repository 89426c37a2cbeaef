pub mod aggregate;
pub mod cache;
pub mod chat;
pub mod classify;
pub mod cli;
pub mod config;
pub mod dashboard;
pub mod data;
pub mod insight;
pub mod io_utils;
pub mod metrics;
pub mod prefs;
pub mod roles;
pub mod sample;
pub mod table;
pub mod view;

use std::{
    env,
    fs::File,
    io::{BufWriter, Write},
    sync::OnceLock,
};

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::{LevelFilter, debug, info, warn};
use rand::{SeedableRng, rngs::StdRng};
use serde::Serialize;

use crate::{
    aggregate::PieSelection,
    classify::ColumnKind,
    cli::{Cli, Commands, DataArgs, OutputFormat, PrefsAction},
    config::DashboardConfig,
    dashboard::Dashboard,
    data::Table,
    insight::write_insights_json,
    prefs::{FilePreferences, PreferenceStore},
    roles::Role,
    table::{Alignment, render_pairs, render_table, render_table_aligned},
    view::{SortSpec, TableView, parse_filter},
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("datadash", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Profile(args) => handle_profile(&args),
        Commands::Dashboard(args) => handle_dashboard(&args),
        Commands::Insights(args) => handle_insights(&args),
        Commands::Table(args) => handle_table(&args),
        Commands::Chat(args) => handle_chat(&args),
        Commands::Sample(args) => handle_sample(&args),
        Commands::Config(args) => handle_config(&args),
        Commands::Prefs(args) => handle_prefs(&args),
    }
}

fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Loads the requested table plus the config and RNG every data command needs.
fn load_source(args: &DataArgs) -> Result<(Table, DashboardConfig, StdRng)> {
    let config = DashboardConfig::load_or_default(args.config.as_deref())?;
    let mut rng = seeded_rng(args.seed);
    let table = match (&args.source.input, args.source.sample) {
        (_, Some(dataset)) => {
            info!("Generating sample dataset '{}'", dataset.file_name());
            dataset.generate(&mut rng)
        }
        (Some(path), None) => {
            info!(
                "Loading '{}' with delimiter '{}'",
                path.display(),
                args.delimiter
                    .map(printable_delimiter)
                    .unwrap_or_else(|| "auto".to_string())
            );
            let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
            io_utils::load_table(path, args.delimiter, encoding)?
        }
        (None, None) => bail!("Provide --input or --sample"),
    };
    debug!(
        "Loaded {} row(s) x {} column(s) from {}",
        table.row_count(),
        table.column_count(),
        table.file_name()
    );
    Ok((table, config, rng))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Serializing JSON output")?;
    println!("{json}");
    Ok(())
}

#[derive(Serialize)]
struct ProfileOutput<'a> {
    file_name: &'a str,
    row_count: usize,
    column_count: usize,
    columns: &'a [classify::ColumnProfile],
    roles: &'a roles::RoleAssignment,
}

fn handle_profile(args: &cli::ProfileArgs) -> Result<()> {
    let (table, config, _) = load_source(&args.data)?;
    let dashboard = Dashboard::new(config)?;
    let profile = dashboard.profile(&table);
    let roles = dashboard.roles(&profile);
    match args.format {
        OutputFormat::Json => print_json(&ProfileOutput {
            file_name: table.file_name(),
            row_count: table.row_count(),
            column_count: table.column_count(),
            columns: &profile.columns,
            roles: &roles,
        })?,
        OutputFormat::Text => {
            println!(
                "{} ({} rows, {} columns)\n",
                table.file_name(),
                table.row_count(),
                table.column_count()
            );
            let rows = profile
                .columns
                .iter()
                .map(|c| vec![c.name.clone(), c.kind.to_string()])
                .collect::<Vec<_>>();
            print!("{}", render_table(&["column".into(), "kind".into()], &rows));
            let role_pairs = [
                Role::Value,
                Role::SecondaryValue,
                Role::Count,
                Role::Category,
                Role::Region,
                Role::Date,
            ]
            .iter()
            .map(|role| {
                (
                    role.as_str().to_string(),
                    roles.get(*role).unwrap_or("-").to_string(),
                )
            })
            .collect::<Vec<_>>();
            println!("\nRoles");
            print!("{}", render_pairs(&role_pairs));
        }
    }
    info!("Profiled {} column(s)", table.column_count());
    Ok(())
}

fn handle_dashboard(args: &cli::DashboardArgs) -> Result<()> {
    let (table, config, mut rng) = load_source(&args.data)?;
    let mut dashboard = Dashboard::new(config)?;
    let report = dashboard.build(&table, &mut rng);
    match args.format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Text => {
            let mut selection = PieSelection::default();
            for name in &args.hidden_segments {
                if !selection.toggle(name, &report.charts.pie) {
                    warn!("Segment '{name}' is not shown or is the last visible one; ignoring");
                }
            }
            print!("{}", report.render_text(&selection));
        }
    }
    info!(
        "Dashboard for {} built with {} insight(s)",
        report.file_name,
        report.insights.len()
    );
    Ok(())
}

fn handle_insights(args: &cli::InsightsArgs) -> Result<()> {
    let (table, config, mut rng) = load_source(&args.data)?;
    let mut dashboard = Dashboard::new(config)?;
    let report = dashboard.build(&table, &mut rng);
    match args.format {
        OutputFormat::Json => print_json(&report.insights)?,
        OutputFormat::Text => {
            for insight in &report.insights {
                println!(
                    "[{}%] {}\n  {}",
                    insight.confidence, insight.headline, insight.description
                );
            }
        }
    }
    if let Some(path) = &args.export {
        let mut writer = BufWriter::new(
            File::create(path).with_context(|| format!("Creating export file {path:?}"))?,
        );
        write_insights_json(&mut writer, &report.insights)?;
        writer
            .flush()
            .with_context(|| format!("Flushing export file {path:?}"))?;
        info!(
            "Exported {} insight(s) to {:?}",
            report.insights.len(),
            path
        );
    }
    Ok(())
}

#[derive(Serialize)]
struct TableOutput<'a> {
    columns: Vec<String>,
    page: &'a view::Page,
    rows: Vec<Vec<&'a data::Value>>,
}

fn handle_table(args: &cli::TableArgs) -> Result<()> {
    let (table, config, _) = load_source(&args.data)?;
    let mut view = TableView::new(&table);
    if !args.columns.is_empty() {
        view.set_visible_columns(&args.columns)?;
    }
    if let Some(search) = &args.search {
        view.set_search(search);
    }
    for raw in &args.filters {
        let (column, value) = parse_filter(raw)?;
        view.add_filter(&column, &value)?;
    }
    if let Some(raw) = &args.sort {
        let spec: SortSpec = raw.parse()?;
        view.set_sort(Some(spec))?;
    }

    if let Some(column) = &args.distinct {
        let values = view.distinct_values(column)?;
        match args.format {
            OutputFormat::Json => print_json(&values)?,
            OutputFormat::Text => values.iter().for_each(|v| println!("{v}")),
        }
        return Ok(());
    }

    let page_size = args.page_size.unwrap_or(config.page_size);
    let page = view.page(args.page, page_size);
    match args.format {
        OutputFormat::Json => print_json(&TableOutput {
            columns: view.visible_headers(),
            page: &page,
            rows: page.rows.iter().map(|idx| view.visible_cells(*idx)).collect(),
        })?,
        OutputFormat::Text => {
            let profile = classify::TableProfile::build(&table, config.sample_rows);
            let alignments = view
                .visible_columns()
                .into_iter()
                .map(|idx| match profile.columns[idx].kind {
                    ColumnKind::Numeric => Alignment::Right,
                    _ => Alignment::Left,
                })
                .collect::<Vec<_>>();
            let rows = page
                .rows
                .iter()
                .map(|idx| {
                    view.visible_cells(*idx)
                        .into_iter()
                        .map(|v| v.as_display())
                        .collect()
                })
                .collect::<Vec<Vec<String>>>();
            print!(
                "{}",
                render_table_aligned(&view.visible_headers(), &rows, &alignments)
            );
            println!(
                "\nPage {} of {} ({} matching rows)",
                page.page, page.total_pages, page.total_rows
            );
        }
    }
    Ok(())
}

fn handle_chat(args: &cli::ChatArgs) -> Result<()> {
    let (table, config, mut rng) = load_source(&args.data)?;
    let dashboard = Dashboard::new(config)?;
    let roles = dashboard.roles(&dashboard.profile(&table));
    let messages = match &args.message {
        Some(message) => {
            let Some(question) = chat::ChatMessage::user(message) else {
                bail!("Message cannot be empty");
            };
            let reply = chat::respond(message, &table, &roles, &mut rng)
                .context("Assistant produced no reply")?;
            vec![question, reply]
        }
        None => chat::initial_messages(&table, &roles, &mut rng),
    };
    match args.format {
        OutputFormat::Json => print_json(&messages)?,
        OutputFormat::Text => {
            for message in &messages {
                let speaker = match message.role {
                    chat::ChatRole::User => "you",
                    chat::ChatRole::Assistant => "assistant",
                };
                println!("{speaker}> {}\n", message.content);
                for reference in &message.references {
                    println!("  {}: {}", reference.label, reference.value);
                }
            }
        }
    }
    Ok(())
}

fn handle_sample(args: &cli::SampleArgs) -> Result<()> {
    let mut rng = seeded_rng(args.seed);
    let table = args.dataset.generate(&mut rng);
    let delimiter = args.delimiter.unwrap_or(io_utils::DEFAULT_CSV_DELIMITER);
    let mut writer = io_utils::open_csv_writer(args.output.as_deref(), delimiter)?;
    io_utils::write_table(&mut writer, &table)?;
    info!(
        "Wrote {} row(s) of '{}' with delimiter '{}'",
        table.row_count(),
        table.file_name(),
        printable_delimiter(delimiter)
    );
    Ok(())
}

fn handle_config(args: &cli::ConfigArgs) -> Result<()> {
    let config = DashboardConfig::load_or_default(args.config.as_deref())?;
    config.role_selector()?;
    print!("{}", config.to_yaml()?);
    Ok(())
}

fn handle_prefs(args: &cli::PrefsArgs) -> Result<()> {
    let mut store = FilePreferences::open(&args.file)?;
    match &args.action {
        PrefsAction::Get { key: None } => {
            for (key, value) in store.entries() {
                println!("{key}={value}");
            }
        }
        PrefsAction::Get { key: Some(key) } => {
            let value = match (store.get(key), key.as_str()) {
                (Some(value), _) => value,
                (None, prefs::VISITED_KEY) => (!prefs::is_first_visit(&store)).to_string(),
                (None, prefs::SOUND_ENABLED_KEY) => prefs::sound_enabled(&store).to_string(),
                (None, _) => bail!("Preference '{key}' is not set"),
            };
            println!("{value}");
        }
        PrefsAction::Set { key, value } => {
            store.set(key, value)?;
            info!("Stored preference '{key}' in {:?}", args.file);
        }
    }
    Ok(())
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        b'\n' => "\\n".to_string(),
        other => (other as char).to_string(),
    }
}
