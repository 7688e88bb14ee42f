//! In-memory response cache with per-entry lifetimes.
//!
//! Only the worker thread touches the cache, so it needs no locking. Nothing
//! is written to disk; a restart starts cold.

use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};
use tracing::debug;

use crate::data::{AggregatedData, ConflictStatus, Sprint};

pub const PROJECT_TTL: Duration = Duration::from_secs(120);
pub const CONFLICTS_TTL: Duration = Duration::from_secs(300);
pub const SPRINTS_TTL: Duration = Duration::from_secs(600);

pub fn project_key(project: &str) -> String {
    format!("project_{}", project)
}

pub fn conflicts_key(repository: &str, spec: &str) -> String {
    format!("conflicts_{}_{}", repository, spec)
}

pub fn sprints_key(project: &str) -> String {
    format!("sprints_{}", project)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub keys: usize,
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    fn merge(self, other: CacheStats) -> CacheStats {
        CacheStats {
            keys: self.keys + other.keys,
            hits: self.hits + other.hits,
            misses: self.misses + other.misses,
        }
    }
}

struct Entry<V> {
    value: V,
    stored_at: Instant,
    ttl: Duration,
}

impl<V> Entry<V> {
    fn is_fresh(&self) -> bool {
        self.stored_at.elapsed() < self.ttl
    }
}

pub struct TtlCache<V> {
    entries: HashMap<String, Entry<V>>,
    default_ttl: Duration,
    hits: u64,
    misses: u64,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            default_ttl,
            hits: 0,
            misses: 0,
        }
    }

    /// Fresh value for `key`; an expired entry is evicted and counts as a miss.
    pub fn get(&mut self, key: &str) -> Option<V> {
        match self.entries.get(key) {
            Some(entry) if entry.is_fresh() => {
                self.hits += 1;
                Some(entry.value.clone())
            }
            Some(_) => {
                self.entries.remove(key);
                self.misses += 1;
                None
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: V) {
        let ttl = self.default_ttl;
        self.insert_with_ttl(key, value, ttl);
    }

    pub fn insert_with_ttl(&mut self, key: impl Into<String>, value: V, ttl: Duration) {
        self.entries.insert(
            key.into(),
            Entry {
                value,
                stored_at: Instant::now(),
                ttl,
            },
        );
    }

    pub fn remove(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            keys: self.entries.len(),
            hits: self.hits,
            misses: self.misses,
        }
    }
}

/// Sprints of a board and the issue keys in each.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SprintData {
    pub sprints: Vec<Sprint>,
    pub sprint_issues: BTreeMap<u64, Vec<String>>,
}

/// All cached upstream responses, one table per kind.
pub struct ResponseCache {
    pub projects: TtlCache<AggregatedData>,
    pub conflicts: TtlCache<ConflictStatus>,
    pub sprints: TtlCache<SprintData>,
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self {
            projects: TtlCache::new(PROJECT_TTL),
            conflicts: TtlCache::new(CONFLICTS_TTL),
            sprints: TtlCache::new(SPRINTS_TTL),
        }
    }
}

impl ResponseCache {
    /// Drop one key from whichever table holds it.
    pub fn clear(&mut self, key: &str) -> bool {
        let removed =
            self.projects.remove(key) | self.conflicts.remove(key) | self.sprints.remove(key);
        debug!(key, removed, "cache key cleared");
        removed
    }

    pub fn clear_all(&mut self) {
        self.projects.clear();
        self.conflicts.clear();
        self.sprints.clear();
        debug!("cache cleared");
    }

    pub fn stats(&self) -> CacheStats {
        self.projects
            .stats()
            .merge(self.conflicts.stats())
            .merge(self.sprints.stats())
    }
}
