//! Input loading and CSV writing.
//!
//! All file I/O in datadash flows through this module:
//!
//! - **Format resolution**: extension-based (`.csv`/`.txt` → comma, `.tsv` →
//!   tab, `.json` → JSON) with a manual delimiter override. Spreadsheet
//!   workbooks are rejected.
//! - **Encoding**: input decoding via `encoding_rs`, defaulting to UTF-8.
//! - **Field coercion**: every delimited field is trimmed and turned into a
//!   number when it parses as one (see [`Value::from_field`]).
//! - **stdin/stdout**: the `-` path convention routes through standard streams.

use std::{
    fs::{self, File},
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
};

use anyhow::{Context, Result, anyhow};
use csv::QuoteStyle;
use encoding_rs::{Encoding, UTF_8};
use thiserror::Error;

use crate::data::{Table, Value};

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Invalid file format '{extension}'. Please supply CSV, TSV, or JSON files.")]
    UnsupportedFormat { extension: String },
    #[error("File '{name}' appears to be empty or invalid")]
    Empty { name: String },
    #[error("JSON input must be an array of objects or an object with 'columns' and 'rows': {0}")]
    JsonShape(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Delimited(u8),
    Json,
}

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'"))
    } else {
        Ok(UTF_8)
    }
}

pub fn resolve_input_format(path: &Path, delimiter: Option<u8>) -> Result<InputFormat, LoadError> {
    if is_dash(path) {
        return Ok(InputFormat::Delimited(
            delimiter.unwrap_or(DEFAULT_CSV_DELIMITER),
        ));
    }
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "json" => Ok(InputFormat::Json),
        "tsv" => Ok(InputFormat::Delimited(
            delimiter.unwrap_or(DEFAULT_TSV_DELIMITER),
        )),
        "csv" | "txt" => Ok(InputFormat::Delimited(
            delimiter.unwrap_or(DEFAULT_CSV_DELIMITER),
        )),
        _ => Err(LoadError::UnsupportedFormat {
            extension: if extension.is_empty() {
                "<none>".to_string()
            } else {
                format!(".{extension}")
            },
        }),
    }
}

/// Loads a table from `path`, or CSV from stdin when `path` is `-`.
pub fn load_table(
    path: &Path,
    delimiter: Option<u8>,
    encoding: &'static Encoding,
) -> Result<Table> {
    let format = resolve_input_format(path, delimiter)?;
    let file_name = if is_dash(path) {
        "stdin.csv".to_string()
    } else {
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string())
    };
    match format {
        InputFormat::Delimited(delimiter) => {
            let reader: Box<dyn Read> = if is_dash(path) {
                Box::new(std::io::stdin().lock())
            } else {
                Box::new(BufReader::new(
                    File::open(path).with_context(|| format!("Opening input file {path:?}"))?,
                ))
            };
            read_delimited(reader, delimiter, encoding, &file_name)
                .with_context(|| format!("Reading {path:?}"))
        }
        InputFormat::Json => {
            let bytes = fs::read(path).with_context(|| format!("Opening input file {path:?}"))?;
            let text = decode_bytes(&bytes, encoding)?;
            parse_json_table(&text, &file_name).with_context(|| format!("Parsing {path:?}"))
        }
    }
}

pub fn open_csv_reader<R>(reader: R, delimiter: u8) -> csv::Reader<R>
where
    R: Read,
{
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(true)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(true);
    builder.from_reader(reader)
}

pub fn read_delimited<R>(
    reader: R,
    delimiter: u8,
    encoding: &'static Encoding,
    file_name: &str,
) -> Result<Table>
where
    R: Read,
{
    let mut reader = open_csv_reader(reader, delimiter);
    let headers = decode_record(reader.byte_headers()?, encoding)?;
    let mut rows = Vec::new();
    for (idx, record) in reader.byte_records().enumerate() {
        let record = record.with_context(|| format!("Reading row {}", idx + 2))?;
        let decoded = decode_record(&record, encoding)?;
        if decoded.iter().all(|field| field.trim().is_empty()) {
            continue;
        }
        rows.push(decoded.iter().map(|f| Value::from_field(f)).collect());
    }
    if headers.is_empty() || rows.is_empty() {
        return Err(LoadError::Empty {
            name: file_name.to_string(),
        }
        .into());
    }
    Ok(Table::new(file_name, headers, rows))
}

/// Accepts either `[{"col": value, ...}, ...]` or
/// `{"columns": [...], "rows": [[...]] | [{...}]}`.
pub fn parse_json_table(text: &str, file_name: &str) -> Result<Table> {
    let document: serde_json::Value =
        serde_json::from_str(text).context("Decoding JSON document")?;
    let (declared, raw_rows) = match document {
        serde_json::Value::Array(items) => (None, items),
        serde_json::Value::Object(mut map) => {
            let rows = match map.remove("rows") {
                Some(serde_json::Value::Array(rows)) => rows,
                _ => return Err(LoadError::JsonShape("missing 'rows' array".into()).into()),
            };
            let columns = match map.remove("columns") {
                Some(serde_json::Value::Array(cols)) => Some(
                    cols.into_iter()
                        .map(|c| match c {
                            serde_json::Value::String(s) => s,
                            other => other.to_string(),
                        })
                        .collect::<Vec<_>>(),
                ),
                Some(_) => {
                    return Err(LoadError::JsonShape("'columns' must be an array".into()).into());
                }
                None => None,
            };
            (columns, rows)
        }
        _ => return Err(LoadError::JsonShape("unexpected top-level value".into()).into()),
    };

    let mut columns = declared.unwrap_or_default();
    let infer_columns = columns.is_empty();
    if infer_columns {
        for row in &raw_rows {
            if let serde_json::Value::Object(map) = row {
                for key in map.keys() {
                    if !columns.contains(key) {
                        columns.push(key.clone());
                    }
                }
            }
        }
    }

    let mut rows = Vec::with_capacity(raw_rows.len());
    for (idx, row) in raw_rows.into_iter().enumerate() {
        let cells = match row {
            serde_json::Value::Object(mut map) => columns
                .iter()
                .map(|col| map.remove(col).map(json_to_value).unwrap_or_default())
                .collect::<Vec<_>>(),
            serde_json::Value::Array(items) => items.into_iter().map(json_to_value).collect(),
            other => {
                return Err(LoadError::JsonShape(format!(
                    "row {} is {} rather than an object or array",
                    idx + 1,
                    json_kind(&other)
                ))
                .into());
            }
        };
        rows.push(cells);
    }

    if columns.is_empty() || rows.is_empty() {
        return Err(LoadError::Empty {
            name: file_name.to_string(),
        }
        .into());
    }
    Ok(Table::new(file_name, columns, rows))
}

fn json_to_value(value: serde_json::Value) -> Value {
    match value {
        serde_json::Value::Number(n) => n
            .as_f64()
            .map(Value::Number)
            .unwrap_or_else(|| Value::Text(n.to_string())),
        serde_json::Value::String(s) => Value::Text(s),
        serde_json::Value::Null => Value::default(),
        serde_json::Value::Bool(b) => Value::Text(b.to_string()),
        other => Value::Text(other.to_string()),
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

pub fn open_csv_writer(path: Option<&Path>, delimiter: u8) -> Result<csv::Writer<Box<dyn Write>>> {
    let base: Box<dyn Write> = match path {
        Some(p) if !is_dash(p) => Box::new(BufWriter::new(
            File::create(p).with_context(|| format!("Creating output file {p:?}"))?,
        )),
        _ => Box::new(std::io::stdout()),
    };
    let mut builder = csv::WriterBuilder::new();
    builder
        .delimiter(delimiter)
        .quote_style(QuoteStyle::Necessary)
        .double_quote(true);
    Ok(builder.from_writer(base))
}

pub fn write_table<W: Write>(writer: &mut csv::Writer<W>, table: &Table) -> Result<()> {
    writer
        .write_record(table.columns())
        .context("Writing header row")?;
    for (idx, row) in table.rows().iter().enumerate() {
        writer
            .write_record(row.iter().map(|v| v.as_display()))
            .with_context(|| format!("Writing row {}", idx + 2))?;
    }
    writer.flush().context("Flushing CSV output")?;
    Ok(())
}

pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        Err(anyhow!(
            "Failed to decode text with encoding {}",
            encoding.name()
        ))
    } else {
        Ok(text.into_owned())
    }
}

pub fn decode_record(record: &csv::ByteRecord, encoding: &'static Encoding) -> Result<Vec<String>> {
    record
        .iter()
        .map(|field| decode_bytes(field, encoding))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn resolves_formats_from_extension() {
        assert_eq!(
            resolve_input_format(Path::new("a.TSV"), None).unwrap(),
            InputFormat::Delimited(b'\t')
        );
        assert_eq!(
            resolve_input_format(Path::new("a.csv"), Some(b';')).unwrap(),
            InputFormat::Delimited(b';')
        );
        assert_eq!(
            resolve_input_format(Path::new("a.json"), None).unwrap(),
            InputFormat::Json
        );
        let err = resolve_input_format(&PathBuf::from("book.xlsx"), None).unwrap_err();
        assert!(err.to_string().contains(".xlsx"));
    }

    #[test]
    fn read_delimited_coerces_fields_and_pads_rows() {
        let input = "date,region,revenue\n2024-01-15,North,10\n2024-01-20,South\n";
        let table = read_delimited(input.as_bytes(), b',', UTF_8, "t.csv").expect("table");
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.value(0, "revenue"), Some(&Value::Number(10.0)));
        assert_eq!(table.value(1, "revenue"), Some(&Value::Text(String::new())));
        assert_eq!(
            table.value(0, "date"),
            Some(&Value::Text("2024-01-15".into()))
        );
    }

    #[test]
    fn header_only_input_is_empty() {
        let err = read_delimited("a,b\n".as_bytes(), b',', UTF_8, "h.csv").unwrap_err();
        assert!(err.to_string().contains("appears to be empty"));
    }

    #[test]
    fn json_array_of_objects_unions_keys() {
        let text = r#"[{"a": 1, "b": "x"}, {"c": true}]"#;
        let table = parse_json_table(text, "t.json").expect("table");
        assert_eq!(table.columns(), &["a", "b", "c"]);
        assert_eq!(table.value(1, "c"), Some(&Value::Text("true".into())));
        assert_eq!(table.value(1, "a"), Some(&Value::Text(String::new())));
    }

    #[test]
    fn json_columns_and_rows_shape() {
        let text = r#"{"columns": ["n", "v"], "rows": [["a", 2], ["b", 3]]}"#;
        let table = parse_json_table(text, "t.json").expect("table");
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.value(1, "v"), Some(&Value::Number(3.0)));
    }

    #[test]
    fn json_scalar_rows_are_rejected() {
        let err = parse_json_table("[1, 2]", "t.json").unwrap_err();
        assert!(err.to_string().contains("row 1 is a number"));
    }
}
