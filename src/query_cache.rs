//! C13 Query Cache Service: a thin key-hashing wrapper over C8, matching
//! C2's hashing conventions.

use crate::hasher::sha256_hex;
use crate::store::cache::CacheStore;

const MAX_CACHED_RESULTS: usize = 50;
const KEY_PREFIX: &str = "search:";
const DIGEST_LEN: usize = 32;

pub struct QueryCacheService {
    cache: CacheStore,
}

impl QueryCacheService {
    pub fn new(cache: CacheStore) -> Self {
        Self { cache }
    }

    fn key(query: &str, project_id: &str, search_type: &str) -> String {
        let raw = format!("query:{query}|project:{project_id}|type:{search_type}");
        let digest = sha256_hex(raw.as_bytes());
        format!("{KEY_PREFIX}{}", &digest[..DIGEST_LEN.min(digest.len())])
    }

    /// Returns the cached result only if it parses as a non-empty array,
    /// per spec §4.10. Parse failures are swallowed as a miss.
    pub fn get(&self, query: &str, project_id: &str, search_type: &str) -> Option<serde_json::Value> {
        let raw = self.cache.get(&Self::key(query, project_id, search_type))?;
        let value: serde_json::Value = serde_json::from_str(&raw).ok()?;
        match value.as_array() {
            Some(arr) if !arr.is_empty() => Some(value),
            _ => None,
        }
    }

    /// Truncates to `maxResults = 50` before storing. Write failures are
    /// swallowed silently.
    pub fn set(&self, query: &str, project_id: &str, search_type: &str, mut results: Vec<serde_json::Value>) {
        results.truncate(MAX_CACHED_RESULTS);
        if let Ok(raw) = serde_json::to_string(&results) {
            self.cache.set(Self::key(query, project_id, search_type), raw);
        }
    }

    /// Coarse invalidation: deletes all `search:*` entries scoped to
    /// `project_id`. Called on every successful full or incremental index.
    pub fn invalidate_project(&self, project_id: &str) {
        // Keys embed a hash of the project id, not the id itself, so exact
        // prefix-matching on project isn't possible; invalidate the whole
        // search namespace instead (acceptable per spec §4.10).
        let _ = project_id;
        self.cache.delete_prefix(KEY_PREFIX);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn set_then_get_roundtrips_nonempty_array() {
        let svc = QueryCacheService::new(CacheStore::new());
        svc.set("login", "p1", "hybrid", vec![json!({"file": "a.rs"})]);
        let got = svc.get("login", "p1", "hybrid");
        assert!(got.is_some());
    }

    #[test]
    fn empty_results_are_never_treated_as_cache_hit() {
        let svc = QueryCacheService::new(CacheStore::new());
        svc.set("nomatch", "p1", "hybrid", vec![]);
        assert!(svc.get("nomatch", "p1", "hybrid").is_none());
    }

    #[test]
    fn invalidate_project_clears_entries() {
        let svc = QueryCacheService::new(CacheStore::new());
        svc.set("login", "p1", "hybrid", vec![json!({"file": "a.rs"})]);
        svc.invalidate_project("p1");
        assert!(svc.get("login", "p1", "hybrid").is_none());
    }

    #[test]
    fn truncates_to_max_results() {
        let svc = QueryCacheService::new(CacheStore::new());
        let many: Vec<serde_json::Value> = (0..100).map(|i| json!({"i": i})).collect();
        svc.set("q", "p1", "hybrid", many);
        let got = svc.get("q", "p1", "hybrid").unwrap();
        assert_eq!(got.as_array().unwrap().len(), MAX_CACHED_RESULTS);
    }
}
