//! C8 Cache Store: TTL'd key/value with pattern-delete, for query-result
//! caching and file-hash memoization.
//!
//! The teacher has no query cache to generalize from, so this is
//! pack-enrichment: built on `moka::sync::Cache`, the crate the
//! `marlonsc-mcb` sibling example reaches for the same concern (see
//! `DESIGN.md`). Small wrapper type, `Arc`-shared, constructed once at
//! startup like the teacher's other top-level state.

use std::time::Duration;

use moka::sync::Cache;

const DEFAULT_TTL_SECS: u64 = 300;
const MAX_CAPACITY: u64 = 10_000;

#[derive(Clone)]
pub struct CacheStore {
    inner: Cache<String, String>,
}

impl CacheStore {
    pub fn new() -> Self {
        Self::with_ttl(Duration::from_secs(DEFAULT_TTL_SECS))
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        let inner = Cache::builder().max_capacity(MAX_CAPACITY).time_to_live(ttl).build();
        Self { inner }
    }

    /// Cache errors never propagate: a missing or unreadable value is just a
    /// miss, per spec §7.5.
    pub fn get(&self, key: &str) -> Option<String> {
        self.inner.get(key)
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        self.inner.insert(key.into(), value.into());
    }

    pub fn delete(&self, key: &str) {
        self.inner.invalidate(key);
    }

    /// Coarse pattern-delete: removes every entry whose key starts with
    /// `prefix`. Used for `search:*` project-scoped invalidation.
    pub fn delete_prefix(&self, prefix: &str) {
        let prefix = prefix.to_string();
        self.inner.invalidate_entries_if(move |k, _v| k.starts_with(&prefix)).ok();
        self.inner.run_pending_tasks();
    }
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get_roundtrips() {
        let cache = CacheStore::new();
        cache.set("k1", "v1");
        assert_eq!(cache.get("k1"), Some("v1".to_string()));
    }

    #[test]
    fn missing_key_is_none() {
        let cache = CacheStore::new();
        assert_eq!(cache.get("nope"), None);
    }

    #[test]
    fn delete_prefix_removes_matching_entries_only() {
        let cache = CacheStore::new();
        cache.set("search:p1:abc", "r1");
        cache.set("search:p1:def", "r2");
        cache.set("search:p2:ghi", "r3");
        cache.delete_prefix("search:p1:");
        assert!(cache.get("search:p1:abc").is_none());
        assert!(cache.get("search:p1:def").is_none());
        assert_eq!(cache.get("search:p2:ghi"), Some("r3".to_string()));
    }
}
