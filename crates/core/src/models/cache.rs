use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use super::api::ApiResponse;

/// Default maximum number of cached responses. Mutated state is persisted as
/// one JSON blob per write, so the mapping has to stay small.
pub const DEFAULT_CACHE_CAP: usize = 128;

/// Fallback freshness window for (module, action) pairs without a TTL entry.
pub const DEFAULT_TTL_SECS: u64 = 30;

/// TTL for individually cached per-sector streak values. One kline round-trip
/// per sector at daily granularity — expensive to compute, slow to change.
pub const STREAK_ITEM_TTL: Duration = Duration::from_secs(30 * 60);

/// Freshness window per (module, action) pair.
///
/// Continuously-moving data (index quotes) gets seconds; expensive or
/// slow-moving data (hot lists, sector membership, news) gets minutes.
pub fn ttl_for(module: &str, action: &str) -> Duration {
    let secs = match (module, action) {
        ("market", "indices") => 10,
        ("fund", "info") | ("fund", "batch") => 30,
        ("fund", "detail") | ("fund", "search") => 60,
        ("fund", "hot") => 10 * 60,
        ("sector", "list") => 5 * 60,
        ("sector", "streak") => 10 * 60,
        ("sector", "funds") => 15 * 60,
        ("news", "list") => 5 * 60,
        _ => DEFAULT_TTL_SECS,
    };
    Duration::from_secs(secs)
}

/// One cached payload with its fetch timestamp and per-entry TTL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub data: ApiResponse,
    pub fetched_at: DateTime<Utc>,
    pub ttl_secs: i64,
}

/// Mapping from normalized request key to timestamped payload.
///
/// Reads never refresh timestamps: eviction is purely fetch-order based, so
/// a frequently-read but stale-fetched entry is still the first to go.
/// Payloads that signal an application-level failure are never considered
/// valid; found during a read, they are purged as a side effect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseCache {
    #[serde(default)]
    entries: HashMap<String, CacheEntry>,

    #[serde(skip_serializing, default = "default_cap")]
    cap: usize,
}

fn default_cap() -> usize {
    DEFAULT_CACHE_CAP
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAP)
    }
}

impl ResponseCache {
    pub fn new(cap: usize) -> Self {
        Self {
            entries: HashMap::new(),
            cap,
        }
    }

    /// Adjust the entry cap (e.g. after loading a persisted mapping whose
    /// serialized form does not carry one). Prunes immediately if exceeded.
    pub fn set_cap(&mut self, cap: usize) {
        self.cap = cap;
        self.prune();
    }

    /// Read the payload stored under `key` as of `now`.
    ///
    /// Absent when: no entry, the entry has aged past its TTL (removed), or
    /// the stored payload signals failure (removed). Hits are returned
    /// unchanged and do not touch the entry's timestamp.
    pub fn read_at(&mut self, key: &str, now: DateTime<Utc>) -> Option<ApiResponse> {
        let entry = self.entries.get(key)?;
        let age = now.signed_duration_since(entry.fetched_at).num_seconds();
        if age >= entry.ttl_secs {
            self.entries.remove(key);
            return None;
        }
        if !entry.data.success {
            self.entries.remove(key);
            return None;
        }
        Some(entry.data.clone())
    }

    /// Unconditionally upsert `{data, fetched_at: now, ttl}`, then prune.
    pub fn write_at(&mut self, key: &str, data: ApiResponse, ttl: Duration, now: DateTime<Utc>) {
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                data,
                fetched_at: now,
                ttl_secs: ttl.as_secs() as i64,
            },
        );
        self.prune();
    }

    /// Evict oldest-fetched entries until the mapping is at or under cap.
    pub fn prune(&mut self) {
        if self.entries.len() <= self.cap {
            return;
        }
        let mut by_age: Vec<(String, DateTime<Utc>)> = self
            .entries
            .iter()
            .map(|(k, e)| (k.clone(), e.fetched_at))
            .collect();
        by_age.sort_by_key(|(_, fetched_at)| *fetched_at);
        let excess = self.entries.len() - self.cap;
        for (key, _) in by_age.into_iter().take(excess) {
            self.entries.remove(&key);
        }
    }

    /// Drop every entry whose key starts with `prefix`. Returns the number
    /// removed. Used when a cached view is invalidated by a domain fact
    /// (e.g. a sector newly confirmed empty).
    pub fn invalidate_prefix(&mut self, prefix: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| !key.starts_with(prefix));
        before - self.entries.len()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
