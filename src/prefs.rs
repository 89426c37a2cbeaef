//! Key-value preference storage.
//!
//! The dashboard only tracks two keys, `visited` and `sound_enabled`, but the
//! store itself is untyped so callers can inject any backend.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};

pub const VISITED_KEY: &str = "visited";
pub const SOUND_ENABLED_KEY: &str = "sound_enabled";

pub trait PreferenceStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

#[derive(Debug, Default, Clone)]
pub struct MemoryPreferences {
    values: BTreeMap<String, String>,
}

impl PreferenceStore for MemoryPreferences {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Preferences persisted as a flat JSON object. Every `set` rewrites the file.
#[derive(Debug)]
pub struct FilePreferences {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl FilePreferences {
    /// Opens `path`, starting empty when the file does not exist yet.
    pub fn open(path: &Path) -> Result<Self> {
        let values = if path.exists() {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Reading preferences from {path:?}"))?;
            if text.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&text)
                    .with_context(|| format!("Parsing preferences in {path:?}"))?
            }
        } else {
            BTreeMap::new()
        };
        Ok(Self {
            path: path.to_path_buf(),
            values,
        })
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("Creating preference directory {parent:?}"))?;
        }
        let json = serde_json::to_string_pretty(&self.values).context("Serializing preferences")?;
        fs::write(&self.path, json)
            .with_context(|| format!("Writing preferences to {:?}", self.path))
    }
}

impl PreferenceStore for FilePreferences {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        self.save()
    }
}

pub fn is_first_visit(store: &dyn PreferenceStore) -> bool {
    store.get(VISITED_KEY).as_deref() != Some("true")
}

pub fn mark_visited(store: &mut dyn PreferenceStore) -> Result<()> {
    store.set(VISITED_KEY, "true")
}

/// Sound is on unless explicitly stored as `false`.
pub fn sound_enabled(store: &dyn PreferenceStore) -> bool {
    store.get(SOUND_ENABLED_KEY).as_deref() != Some("false")
}

pub fn set_sound_enabled(store: &mut dyn PreferenceStore, enabled: bool) -> Result<()> {
    store.set(SOUND_ENABLED_KEY, if enabled { "true" } else { "false" })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn memory_store_tracks_visits() {
        let mut store = MemoryPreferences::default();
        assert!(is_first_visit(&store));
        assert!(sound_enabled(&store));
        mark_visited(&mut store).unwrap();
        set_sound_enabled(&mut store, false).unwrap();
        assert!(!is_first_visit(&store));
        assert!(!sound_enabled(&store));
    }

    #[test]
    fn file_store_round_trips_through_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("prefs.json");
        {
            let mut store = FilePreferences::open(&path).unwrap();
            mark_visited(&mut store).unwrap();
        }
        let store = FilePreferences::open(&path).unwrap();
        assert!(!is_first_visit(&store));
        assert_eq!(store.entries().count(), 1);
    }

    #[test]
    fn corrupt_file_is_reported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        fs::write(&path, "not json").unwrap();
        let err = FilePreferences::open(&path).unwrap_err();
        assert!(err.to_string().contains("Parsing preferences"));
    }
}
