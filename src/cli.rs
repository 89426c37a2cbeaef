use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::sample::SampleDataset;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Analytics dashboard for tabular files: inferred columns, chart aggregates, and insights",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show inferred column kinds and the columns chosen for each chart role
    Profile(ProfileArgs),
    /// Render KPI cards, chart aggregates, and insights
    Dashboard(DashboardArgs),
    /// Print the generated insights, optionally exporting them as JSON
    Insights(InsightsArgs),
    /// Browse rows with search, filters, sorting, and pagination
    Table(TableArgs),
    /// Ask the assistant about the data, or show its opening messages
    Chat(ChatArgs),
    /// Write a generated sample dataset as CSV
    Sample(SampleArgs),
    /// Print the effective dashboard configuration as YAML
    Config(ConfigArgs),
    /// Read or update stored preferences
    Prefs(PrefsArgs),
}

/// Where the table comes from: a file or a generated sample.
#[derive(Debug, Args)]
#[group(required = true, multiple = false)]
pub struct SourceArgs {
    /// Input file (.csv, .tsv, .txt, .json) or '-' for CSV on stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,
    /// Use a generated sample dataset instead of a file
    #[arg(long = "sample", value_enum)]
    pub sample: Option<SampleDataset>,
}

#[derive(Debug, Args)]
pub struct DataArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    /// Field delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// YAML dashboard configuration
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Seed for generated samples, sparklines, and assistant replies
    #[arg(long)]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Default)]
#[value(rename_all = "kebab-case")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Args)]
pub struct ProfileArgs {
    #[command(flatten)]
    pub data: DataArgs,
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Debug, Args)]
pub struct DashboardArgs {
    #[command(flatten)]
    pub data: DataArgs,
    /// Hide a pie segment from the share table (repeatable)
    #[arg(long = "hide-segment", value_name = "NAME")]
    pub hidden_segments: Vec<String>,
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Debug, Args)]
pub struct InsightsArgs {
    #[command(flatten)]
    pub data: DataArgs,
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
    /// Write `[{headline, description, type, confidence}]` JSON to this file
    #[arg(long)]
    pub export: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct TableArgs {
    #[command(flatten)]
    pub data: DataArgs,
    /// Case-insensitive text matched against the visible columns
    #[arg(long)]
    pub search: Option<String>,
    /// Comma-separated columns to show; all columns when omitted
    #[arg(long, value_delimiter = ',')]
    pub columns: Vec<String>,
    /// Keep rows where `column=value`; repeat to allow more values
    #[arg(long = "filter", action = clap::ArgAction::Append)]
    pub filters: Vec<String>,
    /// Sort by `column` or `column:asc|desc`
    #[arg(long)]
    pub sort: Option<String>,
    /// 1-based page number
    #[arg(long, default_value_t = 1)]
    pub page: usize,
    /// Rows per page (defaults to the configured page size)
    #[arg(long = "page-size")]
    pub page_size: Option<usize>,
    /// List the distinct values of this column instead of rows
    #[arg(long = "distinct")]
    pub distinct: Option<String>,
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Debug, Args)]
pub struct ChatArgs {
    #[command(flatten)]
    pub data: DataArgs,
    /// Question for the assistant; omit to print the opening messages
    #[arg(short, long)]
    pub message: Option<String>,
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Debug, Args)]
pub struct SampleArgs {
    /// Dataset to generate
    #[arg(value_enum)]
    pub dataset: SampleDataset,
    /// Destination CSV file (stdout if omitted)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Field delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Random seed
    #[arg(long)]
    pub seed: Option<u64>,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// YAML dashboard configuration to validate and print
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct PrefsArgs {
    /// JSON preference file
    #[arg(long)]
    pub file: PathBuf,
    #[command(subcommand)]
    pub action: PrefsAction,
}

#[derive(Debug, Subcommand)]
pub enum PrefsAction {
    /// Print one preference, or all of them when no key is given
    Get {
        key: Option<String>,
    },
    /// Store a preference
    Set {
        key: String,
        value: String,
    },
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}
