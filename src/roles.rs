//! Heuristic column role selection.
//!
//! Each [`Role`] is resolved by a ranked list of [`RoleStrategy`] values; the
//! first strategy that yields a column wins. Roles are resolved in rule order,
//! so a later rule may refer to a column chosen by an earlier one (the region
//! role falls back to the category column, the secondary value skips the
//! primary value column).

use std::{fmt, sync::OnceLock};

use anyhow::{Context, Result};
use log::debug;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::classify::{ColumnKind, TableProfile};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Value,
    SecondaryValue,
    Count,
    Category,
    Region,
    Date,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Value => "value",
            Role::SecondaryValue => "secondary_value",
            Role::Count => "count",
            Role::Category => "category",
            Role::Region => "region",
            Role::Date => "date",
        }
    }
}

/// Columns chosen for each role. `None` means no suitable column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct RoleAssignment {
    pub value: Option<String>,
    pub secondary_value: Option<String>,
    pub count: Option<String>,
    pub category: Option<String>,
    pub region: Option<String>,
    pub date: Option<String>,
}

impl RoleAssignment {
    pub fn get(&self, role: Role) -> Option<&str> {
        match role {
            Role::Value => self.value.as_deref(),
            Role::SecondaryValue => self.secondary_value.as_deref(),
            Role::Count => self.count.as_deref(),
            Role::Category => self.category.as_deref(),
            Role::Region => self.region.as_deref(),
            Role::Date => self.date.as_deref(),
        }
    }

    fn set(&mut self, role: Role, column: Option<String>) {
        let slot = match role {
            Role::Value => &mut self.value,
            Role::SecondaryValue => &mut self.secondary_value,
            Role::Count => &mut self.count,
            Role::Category => &mut self.category,
            Role::Region => &mut self.region,
            Role::Date => &mut self.date,
        };
        *slot = column;
    }
}

pub trait RoleStrategy: fmt::Debug + Send + Sync {
    fn pick(&self, profile: &TableProfile, chosen: &RoleAssignment) -> Option<String>;
}

/// First column of `kind` whose name matches `pattern`.
#[derive(Debug)]
pub struct NamePattern {
    kind: ColumnKind,
    pattern: Regex,
}

impl NamePattern {
    pub fn new(kind: ColumnKind, pattern: &str) -> Result<Self> {
        let pattern = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .with_context(|| format!("Compiling role pattern '{pattern}'"))?;
        Ok(Self { kind, pattern })
    }
}

impl RoleStrategy for NamePattern {
    fn pick(&self, profile: &TableProfile, _chosen: &RoleAssignment) -> Option<String> {
        profile
            .columns_of(self.kind)
            .find(|name| self.pattern.is_match(name))
            .map(str::to_string)
    }
}

/// The `index`-th column of `kind` (zero-based).
#[derive(Debug)]
pub struct Position {
    pub kind: ColumnKind,
    pub index: usize,
}

impl RoleStrategy for Position {
    fn pick(&self, profile: &TableProfile, _chosen: &RoleAssignment) -> Option<String> {
        profile
            .columns_of(self.kind)
            .nth(self.index)
            .map(str::to_string)
    }
}

/// First column of `kind` that is not the column already chosen for `other`.
#[derive(Debug)]
pub struct DistinctFrom {
    pub kind: ColumnKind,
    pub other: Role,
}

impl RoleStrategy for DistinctFrom {
    fn pick(&self, profile: &TableProfile, chosen: &RoleAssignment) -> Option<String> {
        let taken = chosen.get(self.other);
        profile
            .columns_of(self.kind)
            .find(|name| Some(*name) != taken)
            .map(str::to_string)
    }
}

/// Reuses whatever column an earlier rule chose for another role.
#[derive(Debug)]
pub struct SameAs(pub Role);

impl RoleStrategy for SameAs {
    fn pick(&self, _profile: &TableProfile, chosen: &RoleAssignment) -> Option<String> {
        chosen.get(self.0).map(str::to_string)
    }
}

/// Name patterns driving the default rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RolePatterns {
    pub value: String,
    pub count: String,
    pub category: String,
    pub region: String,
}

impl Default for RolePatterns {
    fn default() -> Self {
        Self {
            value: "revenue|sales|amount|value|total".to_string(),
            count: "quantity|count|orders|units".to_string(),
            category: "category|type|region|segment".to_string(),
            region: "region|location|country|area".to_string(),
        }
    }
}

type Rule = (Role, Vec<Box<dyn RoleStrategy>>);

#[derive(Debug, Default)]
pub struct RoleSelector {
    rules: Vec<Rule>,
}

impl RoleSelector {
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Appends a rule. Rules run in insertion order.
    pub fn with_rule(mut self, role: Role, strategies: Vec<Box<dyn RoleStrategy>>) -> Self {
        self.rules.push((role, strategies));
        self
    }

    pub fn from_patterns(patterns: &RolePatterns) -> Result<Self> {
        use ColumnKind::{Categorical, Date, Numeric};
        Ok(Self::empty()
            .with_rule(
                Role::Value,
                vec![
                    Box::new(NamePattern::new(Numeric, &patterns.value)?),
                    Box::new(Position { kind: Numeric, index: 0 }),
                ],
            )
            .with_rule(
                Role::SecondaryValue,
                vec![Box::new(DistinctFrom {
                    kind: Numeric,
                    other: Role::Value,
                })],
            )
            .with_rule(
                Role::Count,
                vec![
                    Box::new(NamePattern::new(Numeric, &patterns.count)?),
                    Box::new(Position { kind: Numeric, index: 1 }),
                ],
            )
            .with_rule(
                Role::Category,
                vec![
                    Box::new(NamePattern::new(Categorical, &patterns.category)?),
                    Box::new(Position {
                        kind: Categorical,
                        index: 0,
                    }),
                ],
            )
            .with_rule(
                Role::Region,
                vec![
                    Box::new(NamePattern::new(Categorical, &patterns.region)?),
                    Box::new(Position {
                        kind: Categorical,
                        index: 1,
                    }),
                    Box::new(SameAs(Role::Category)),
                ],
            )
            .with_rule(Role::Date, vec![Box::new(Position { kind: Date, index: 0 })]))
    }

    pub fn select(&self, profile: &TableProfile) -> RoleAssignment {
        let mut chosen = RoleAssignment::default();
        for (role, strategies) in &self.rules {
            let column = strategies
                .iter()
                .find_map(|strategy| strategy.pick(profile, &chosen));
            debug!("Role '{}' -> {:?}", role.as_str(), column);
            chosen.set(*role, column);
        }
        chosen
    }
}

/// Selector built from [`RolePatterns::default`], compiled once.
pub fn default_selector() -> &'static RoleSelector {
    static DEFAULT_SELECTOR: OnceLock<RoleSelector> = OnceLock::new();
    DEFAULT_SELECTOR.get_or_init(|| {
        RoleSelector::from_patterns(&RolePatterns::default()).expect("built-in role patterns compile")
    })
}

pub fn select_value_column(profile: &TableProfile) -> Option<String> {
    default_selector().select(profile).value
}

pub fn select_category_column(profile: &TableProfile) -> Option<String> {
    default_selector().select(profile).category
}

pub fn select_region_column(profile: &TableProfile) -> Option<String> {
    default_selector().select(profile).region
}

pub fn select_secondary_value_column(profile: &TableProfile) -> Option<String> {
    default_selector().select(profile).secondary_value
}

pub fn select_count_column(profile: &TableProfile) -> Option<String> {
    default_selector().select(profile).count
}

pub fn select_date_column(profile: &TableProfile) -> Option<String> {
    default_selector().select(profile).date
}
