#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use datadash::data::{Table, Value};
use datadash::io_utils::{load_table, resolve_encoding};
use tempfile::{TempDir, tempdir};

/// Absolute path to a fixture under `tests/data`.
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

/// Loads a fixture with the default delimiter and UTF-8 decoding.
pub fn load_fixture(name: &str) -> Table {
    let encoding = resolve_encoding(None).expect("utf-8 encoding");
    load_table(&fixture_path(name), None, encoding).expect("load fixture")
}

/// Builds a table from string literals, coercing each field like the loader.
pub fn table_from(columns: &[&str], rows: &[&[&str]]) -> Table {
    Table::new(
        "inline.csv",
        columns.iter().map(|c| c.to_string()).collect(),
        rows.iter()
            .map(|row| row.iter().map(|f| Value::from_field(f)).collect())
            .collect(),
    )
}

/// Scratch directory removed on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` to `name` inside the workspace.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        fs::write(&path, contents).expect("write temp file");
        path
    }
}
