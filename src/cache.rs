//! Memoized chart data keyed by table identity and role selection.

use std::{num::NonZeroUsize, sync::Arc};

use log::debug;
use lru::LruCache;

use crate::{
    aggregate::{ChartData, ChartLimits, build_chart_data},
    data::Table,
    roles::RoleAssignment,
};

pub const DEFAULT_CACHE_CAPACITY: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    fingerprint: String,
    roles: RoleAssignment,
    limits: ChartLimits,
}

#[derive(Debug)]
pub struct DashboardCache {
    entries: LruCache<CacheKey, Arc<ChartData>>,
    hits: u64,
    misses: u64,
}

impl DashboardCache {
    /// A zero capacity is treated as one entry.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
            hits: 0,
            misses: 0,
        }
    }

    pub fn chart_data(
        &mut self,
        table: &Table,
        roles: &RoleAssignment,
        limits: &ChartLimits,
    ) -> Arc<ChartData> {
        let key = CacheKey {
            fingerprint: table.fingerprint().to_string(),
            roles: roles.clone(),
            limits: *limits,
        };
        if let Some(hit) = self.entries.get(&key) {
            self.hits += 1;
            debug!("Chart cache hit for {}", table.file_name());
            return Arc::clone(hit);
        }
        self.misses += 1;
        let data = Arc::new(build_chart_data(table, roles, limits));
        self.entries.put(key, Arc::clone(&data));
        data
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for DashboardCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}
