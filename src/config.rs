//! Dashboard tuning loaded from YAML.
//!
//! Every field has a default, so a config file only needs the keys it
//! changes:
//!
//! ```yaml
//! sample_rows: 25
//! limits:
//!   bars: 8
//! patterns:
//!   value: "revenue|gmv"
//! confidence:
//!   trend: 90
//! ```

use std::{fs, path::Path};

use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    aggregate::ChartLimits,
    cache::DEFAULT_CACHE_CAPACITY,
    classify::DEFAULT_SAMPLE_ROWS,
    insight::ConfidenceTable,
    roles::{RolePatterns, RoleSelector},
    view::DEFAULT_PAGE_SIZE,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DashboardConfig {
    /// Leading rows inspected when classifying a column; 0 scans all rows.
    pub sample_rows: usize,
    pub limits: ChartLimits,
    pub patterns: RolePatterns,
    pub confidence: ConfidenceTable,
    pub cache_capacity: usize,
    pub page_size: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            sample_rows: DEFAULT_SAMPLE_ROWS,
            limits: ChartLimits::default(),
            patterns: RolePatterns::default(),
            confidence: ConfidenceTable::default(),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl DashboardConfig {
    pub fn from_yaml(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text).context("Parsing dashboard config")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text =
            fs::read_to_string(path).with_context(|| format!("Opening config file {path:?}"))?;
        let config = Self::from_yaml(&text).with_context(|| format!("Loading {path:?}"))?;
        debug!("Loaded dashboard config from {path:?}");
        Ok(config)
    }

    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Serializing dashboard config")
    }

    pub fn role_selector(&self) -> Result<RoleSelector> {
        RoleSelector::from_patterns(&self.patterns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config = DashboardConfig::from_yaml("limits:\n  bars: 8\nconfidence:\n  trend: 90\n").unwrap();
        assert_eq!(config.limits.bars, 8);
        assert_eq!(config.limits.pie_segments, 5);
        assert_eq!(config.confidence.trend, 90);
        assert_eq!(config.confidence.volatility, 71);
        assert_eq!(config.page_size, 20);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = DashboardConfig::from_yaml("sample_rowz: 3\n").unwrap_err();
        assert!(format!("{err:#}").contains("sample_rowz"));
    }

    #[test]
    fn yaml_round_trip_through_file() {
        let file = NamedTempFile::new().unwrap();
        let config = DashboardConfig {
            sample_rows: 0,
            ..DashboardConfig::default()
        };
        fs::write(file.path(), config.to_yaml().unwrap()).unwrap();
        assert_eq!(DashboardConfig::load(file.path()).unwrap(), config);
        assert_eq!(DashboardConfig::load_or_default(None).unwrap(), DashboardConfig::default());
    }
}
