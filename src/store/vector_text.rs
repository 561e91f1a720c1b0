//! C6 Vector+Text Store: per-project `ChunkDocument`s with embedding
//! (cosine) search, an inverted full-text index (BM25-lite), and hybrid
//! Reciprocal Rank Fusion over both.
//!
//! Generalizes `types.rs::TermDocFreq`/`grep_relevance_score`'s IDF-weighted
//! scoring into the text component, and `semantic.rs::semantic_search`'s
//! brute-force cosine loop into the vector component. RRF fusion and the
//! path-match bonus are spec-specified, composed from these two primitives.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::RwLock;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::ChunkDocument;
use crate::store::{read_json_if_exists, write_json_atomic};

const RRF_K0: f64 = 60.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HybridDebug {
    pub vector_score: f64,
    pub text_score: f64,
    pub path_match: bool,
    pub match_source: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HybridResult {
    pub document: ChunkDocument,
    pub score: f64,
    pub match_type: String,
    pub debug: HybridDebug,
}

/// Per-term document frequency, mirroring `types.rs::TermDocFreq`'s
/// Laplace-smoothed IDF.
#[derive(Default)]
struct TermDocFreq {
    total_docs: usize,
    freq: HashMap<String, usize>,
}

impl TermDocFreq {
    fn idf(&self, term: &str) -> f64 {
        let df = self.freq.get(term).copied().unwrap_or(self.total_docs);
        (((self.total_docs as f64 + 1.0) / (df as f64 + 1.0)).ln() + 1.0).max(1.0)
    }

    fn add_doc(&mut self, terms: &HashSet<String>) {
        self.total_docs += 1;
        for t in terms {
            *self.freq.entry(t.clone()).or_insert(0) += 1;
        }
    }

    fn remove_doc(&mut self, terms: &HashSet<String>) {
        self.total_docs = self.total_docs.saturating_sub(1);
        for t in terms {
            if let Some(c) = self.freq.get_mut(t) {
                *c = c.saturating_sub(1);
            }
        }
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_lowercase())
        .collect()
}

struct ProjectIndex {
    docs: DashMap<String, ChunkDocument>,
    /// term -> set of chunk ids containing it, for inverted-index lookup.
    postings: DashMap<String, HashSet<String>>,
    term_doc_freq: RwLock<TermDocFreq>,
}

impl ProjectIndex {
    fn new() -> Self {
        Self {
            docs: DashMap::new(),
            postings: DashMap::new(),
            term_doc_freq: RwLock::new(TermDocFreq::default()),
        }
    }
}

/// Vector+text store, keyed by `project_id`. Construct once at startup and
/// thread into the components that need it, per spec §9's anti-singleton
/// guidance.
pub struct VectorTextStore {
    projects: DashMap<String, ProjectIndex>,
    data_dir: PathBuf,
}

impl VectorTextStore {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            projects: DashMap::new(),
            data_dir,
        }
    }

    fn snapshot_path(&self, project_id: &str) -> PathBuf {
        self.data_dir.join(project_id).join("chunks.json")
    }

    /// Load a project's chunk snapshot from disk into memory, if present and
    /// not already loaded.
    pub fn ensure_loaded(&self, project_id: &str) -> Result<()> {
        if self.projects.contains_key(project_id) {
            return Ok(());
        }
        let index = ProjectIndex::new();
        if let Some(docs) = read_json_if_exists::<Vec<ChunkDocument>>(&self.snapshot_path(project_id))? {
            for doc in docs {
                Self::index_doc(&index, doc);
            }
        }
        self.projects.insert(project_id.to_string(), index);
        Ok(())
    }

    fn index_doc(index: &ProjectIndex, doc: ChunkDocument) {
        let terms: HashSet<String> = tokenize(&doc.content).into_iter().collect();
        for t in &terms {
            index.postings.entry(t.clone()).or_default().insert(doc.id.clone());
        }
        index.term_doc_freq.write().unwrap().add_doc(&terms);
        index.docs.insert(doc.id.clone(), doc);
    }

    fn remove_doc(index: &ProjectIndex, id: &str) {
        if let Some((_, doc)) = index.docs.remove(id) {
            let terms: HashSet<String> = tokenize(&doc.content).into_iter().collect();
            for t in &terms {
                if let Some(mut set) = index.postings.get_mut(t) {
                    set.remove(id);
                }
            }
            index.term_doc_freq.write().unwrap().remove_doc(&terms);
        }
    }

    pub fn upsert(&self, doc: ChunkDocument) -> Result<()> {
        self.ensure_loaded(&doc.project_id)?;
        let index = self.projects.get(&doc.project_id).unwrap();
        Self::remove_doc(&index, &doc.id);
        Self::index_doc(&index, doc);
        Ok(())
    }

    pub fn upsert_many(&self, docs: Vec<ChunkDocument>) -> Result<()> {
        for doc in docs {
            self.upsert(doc)?;
        }
        Ok(())
    }

    pub fn delete(&self, project_id: &str, id: &str) -> Result<()> {
        self.ensure_loaded(project_id)?;
        if let Some(index) = self.projects.get(project_id) {
            Self::remove_doc(&index, id);
        }
        Ok(())
    }

    pub fn delete_by_project(&self, project_id: &str) -> Result<()> {
        self.projects.remove(project_id);
        let path = self.snapshot_path(project_id);
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }

    /// Delete every chunk whose `relative_path` matches `predicate`. Used by
    /// the indexing engine's exclusion-driven eviction and per-file delete.
    pub fn delete_where(&self, project_id: &str, mut predicate: impl FnMut(&str) -> bool) -> Result<usize> {
        self.ensure_loaded(project_id)?;
        let Some(index) = self.projects.get(project_id) else { return Ok(0) };
        let to_remove: Vec<String> = index
            .docs
            .iter()
            .filter(|e| predicate(&e.value().relative_path))
            .map(|e| e.key().clone())
            .collect();
        let removed = to_remove.len();
        for id in to_remove {
            Self::remove_doc(&index, &id);
        }
        Ok(removed)
    }

    pub fn count(&self, project_id: &str) -> usize {
        self.projects.get(project_id).map(|i| i.docs.len()).unwrap_or(0)
    }

    pub fn count_files(&self, project_id: &str) -> usize {
        self.projects
            .get(project_id)
            .map(|i| {
                i.docs
                    .iter()
                    .map(|e| e.value().relative_path.clone())
                    .collect::<HashSet<_>>()
                    .len()
            })
            .unwrap_or(0)
    }

    pub fn flush(&self, project_id: &str) -> Result<()> {
        let Some(index) = self.projects.get(project_id) else { return Ok(()) };
        let docs: Vec<ChunkDocument> = index.docs.iter().map(|e| e.value().clone()).collect();
        write_json_atomic(&self.snapshot_path(project_id), &docs)
    }

    pub fn flush_all(&self) -> Result<()> {
        let ids: Vec<String> = self.projects.iter().map(|e| e.key().clone()).collect();
        for id in ids {
            self.flush(&id)?;
        }
        Ok(())
    }

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() || a.is_empty() {
            return 0.0;
        }
        let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
        let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        if na == 0.0 || nb == 0.0 {
            0.0
        } else {
            dot / (na * nb)
        }
    }

    /// `search(queryVector, projectId, k, minSim)`.
    pub fn search_vector(
        &self,
        project_id: &str,
        query_vector: &[f32],
        k: usize,
        min_sim: f32,
    ) -> Vec<(ChunkDocument, f32)> {
        let zero_vector = query_vector.is_empty() || query_vector.iter().all(|x| *x == 0.0);
        if zero_vector {
            return Vec::new();
        }
        let Some(index) = self.projects.get(project_id) else { return Vec::new() };
        let mut scored: Vec<(ChunkDocument, f32)> = index
            .docs
            .iter()
            .map(|e| {
                let doc = e.value();
                (doc.clone(), Self::cosine(query_vector, &doc.embedding))
            })
            .filter(|(_, score)| *score >= min_sim)
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        scored
    }

    /// `searchByText(q, projectId, k)` — BM25-lite scoring over the inverted
    /// index, same shape as `grep_relevance_score` but over chunk content.
    pub fn search_text(&self, project_id: &str, query: &str, k: usize) -> Vec<(ChunkDocument, f64)> {
        let terms: Vec<String> = tokenize(query);
        if terms.is_empty() {
            return Vec::new();
        }
        let Some(index) = self.projects.get(project_id) else { return Vec::new() };
        let tdf = index.term_doc_freq.read().unwrap();

        let mut candidate_ids: HashSet<String> = HashSet::new();
        for t in &terms {
            if let Some(ids) = index.postings.get(t) {
                candidate_ids.extend(ids.iter().cloned());
            }
        }

        let mut scored: Vec<(ChunkDocument, f64)> = candidate_ids
            .into_iter()
            .filter_map(|id| index.docs.get(&id).map(|d| d.value().clone()))
            .map(|doc| {
                let doc_terms = tokenize(&doc.content);
                let doc_term_set: HashSet<&str> = doc_terms.iter().map(|s| s.as_str()).collect();
                let match_count = terms.iter().filter(|t| doc_term_set.contains(t.as_str())).count();
                let tf = match_count as f64 / (match_count as f64 + 1.5);
                let idf_weights: Vec<f64> = terms.iter().map(|t| tdf.idf(t)).collect();
                let avg_idf = idf_weights.iter().sum::<f64>() / idf_weights.len().max(1) as f64;
                let density = match_count as f64 / (doc_terms.len() as f64).sqrt().max(1.0);
                let score = tf * 10.0 * avg_idf + density;
                (doc, score)
            })
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        scored
    }

    /// `searchHybrid(queryText, queryVector, projectId, k)`.
    ///
    /// Edge cases: empty vector degrades to text-only; empty text degrades
    /// to vector-only; both empty returns empty.
    pub fn search_hybrid(
        &self,
        project_id: &str,
        query_text: &str,
        query_vector: &[f32],
        k: usize,
    ) -> Vec<HybridResult> {
        let vector_empty = query_vector.is_empty() || query_vector.iter().all(|x| *x == 0.0);
        let text_empty = query_text.trim().is_empty();
        if vector_empty && text_empty {
            return Vec::new();
        }

        let fetch_k = (k * 2).max(k);
        let vector_hits = if vector_empty {
            Vec::new()
        } else {
            self.search_vector(project_id, query_vector, fetch_k, 0.0)
        };
        let text_hits = if text_empty {
            Vec::new()
        } else {
            self.search_text(project_id, query_text, fetch_k)
        };

        let max_text_score = text_hits.iter().map(|(_, s)| *s).fold(0.0_f64, f64::max);

        let mut rrf_scores: HashMap<String, f64> = HashMap::new();
        let mut docs_by_id: HashMap<String, ChunkDocument> = HashMap::new();
        let mut vector_rank: HashMap<String, usize> = HashMap::new();
        let mut text_rank: HashMap<String, usize> = HashMap::new();
        let mut vector_score_by_id: HashMap<String, f64> = HashMap::new();
        let mut text_score_by_id: HashMap<String, f64> = HashMap::new();

        for (rank, (doc, score)) in vector_hits.iter().enumerate() {
            *rrf_scores.entry(doc.id.clone()).or_insert(0.0) += 1.0 / (RRF_K0 + rank as f64 + 1.0);
            vector_rank.insert(doc.id.clone(), rank);
            vector_score_by_id.insert(doc.id.clone(), *score as f64);
            docs_by_id.entry(doc.id.clone()).or_insert_with(|| doc.clone());
        }
        for (rank, (doc, score)) in text_hits.iter().enumerate() {
            *rrf_scores.entry(doc.id.clone()).or_insert(0.0) += 1.0 / (RRF_K0 + rank as f64 + 1.0);
            text_rank.insert(doc.id.clone(), rank);
            let normalized = if max_text_score > 0.0 { score / max_text_score } else { 0.0 };
            text_score_by_id.insert(doc.id.clone(), normalized);
            docs_by_id.entry(doc.id.clone()).or_insert_with(|| doc.clone());
        }

        let max_rrf = rrf_scores.values().cloned().fold(0.0_f64, f64::max).max(f64::EPSILON);
        let query_tokens: Vec<String> = query_text
            .split_whitespace()
            .map(|s| s.to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();

        let mut results: Vec<HybridResult> = rrf_scores
            .into_iter()
            .filter_map(|(id, rrf)| docs_by_id.get(&id).map(|d| (id, rrf, d.clone())))
            .map(|(id, rrf, doc)| {
                let mut score = (rrf / max_rrf).min(1.0);
                let mut match_source = Vec::new();
                if vector_rank.contains_key(&id) {
                    match_source.push("semantic".to_string());
                }
                if text_rank.contains_key(&id) {
                    match_source.push("text".to_string());
                }

                let path_lower = doc.relative_path.to_lowercase();
                let path_match = !query_tokens.is_empty()
                    && query_tokens.iter().any(|t| path_lower.contains(t.as_str()));
                if path_match {
                    match_source.push("path".to_string());
                    score = (score + 0.15).min(1.0);
                }

                HybridResult {
                    document: doc,
                    score,
                    match_type: "hybrid".to_string(),
                    debug: HybridDebug {
                        vector_score: vector_score_by_id.get(&id).copied().unwrap_or(0.0),
                        text_score: text_score_by_id.get(&id).copied().unwrap_or(0.0),
                        path_match,
                        match_source,
                    },
                }
            })
            .collect();

        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(k);
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ChunkMetadata;
    use chrono::Utc;

    fn doc(id: &str, project: &str, path: &str, content: &str, embedding: Vec<f32>) -> ChunkDocument {
        ChunkDocument {
            id: id.to_string(),
            project_id: project.to_string(),
            relative_path: path.to_string(),
            content: content.to_string(),
            embedding,
            metadata: ChunkMetadata {
                file_name: path.to_string(),
                extension: "rs".to_string(),
                chunk_index: 0,
                line_start: 1,
                line_end: 10,
                file_hash: "abc".to_string(),
                indexed_at: Utc::now(),
                chunk_type: "code".to_string(),
            },
        }
    }

    #[test]
    fn upsert_then_count() {
        let store = VectorTextStore::new(std::env::temp_dir().join("cs-test-1"));
        store.upsert(doc("p:a:0", "p", "a.rs", "fn login() {}", vec![1.0, 0.0])).unwrap();
        assert_eq!(store.count("p"), 1);
    }

    #[test]
    fn upsert_same_id_overwrites() {
        let store = VectorTextStore::new(std::env::temp_dir().join("cs-test-2"));
        store.upsert(doc("p:a:0", "p", "a.rs", "fn login() {}", vec![1.0, 0.0])).unwrap();
        store.upsert(doc("p:a:0", "p", "a.rs", "fn logout() {}", vec![0.0, 1.0])).unwrap();
        assert_eq!(store.count("p"), 1);
    }

    #[test]
    fn delete_then_count_restores_baseline() {
        let store = VectorTextStore::new(std::env::temp_dir().join("cs-test-3"));
        let d = doc("p:a:0", "p", "a.rs", "fn login() {}", vec![1.0, 0.0]);
        store.upsert(d.clone()).unwrap();
        store.delete("p", &d.id).unwrap();
        assert_eq!(store.count("p"), 0);
    }

    #[test]
    fn hybrid_score_is_bounded_and_has_match_source() {
        let store = VectorTextStore::new(std::env::temp_dir().join("cs-test-4"));
        store.upsert(doc("p:auth:0", "p", "a/auth.rs", "package auth\nfunc Login() {}", vec![1.0, 0.0])).unwrap();
        store.upsert(doc("p:main:0", "p", "b/main.rs", "func main() { auth.Login() }", vec![0.0, 1.0])).unwrap();

        let results = store.search_hybrid("p", "login", &[1.0, 0.0], 5);
        assert!(!results.is_empty());
        for r in &results {
            assert!(r.score > 0.0 && r.score <= 1.0);
            assert!(!r.debug.match_source.is_empty());
        }
        assert!(results[0].document.relative_path.ends_with("auth.rs"));
    }

    #[test]
    fn hybrid_path_bonus_sets_path_match() {
        let store = VectorTextStore::new(std::env::temp_dir().join("cs-test-5"));
        store
            .upsert(doc(
                "p:svc:0",
                "p",
                "authentication-service.ts",
                "export class Service {}",
                vec![0.1, 0.1],
            ))
            .unwrap();
        let results = store.search_hybrid("p", "authentication", &[], 5);
        assert!(results.iter().any(|r| r.debug.path_match && r.debug.match_source.contains(&"path".to_string())));
    }

    #[test]
    fn empty_query_and_vector_returns_empty() {
        let store = VectorTextStore::new(std::env::temp_dir().join("cs-test-6"));
        store.upsert(doc("p:a:0", "p", "a.rs", "fn x() {}", vec![1.0])).unwrap();
        assert!(store.search_hybrid("p", "", &[], 5).is_empty());
    }

    #[test]
    fn delete_where_matches_glob_prefix() {
        let store = VectorTextStore::new(std::env::temp_dir().join("cs-test-7"));
        store.upsert(doc("p:a:0", "p", "Library/Cache.cs", "// x", vec![1.0])).unwrap();
        store.upsert(doc("p:b:0", "p", "App.cs", "// y", vec![1.0])).unwrap();
        let removed = store.delete_where("p", |path| path.starts_with("Library/")).unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.count("p"), 1);
    }
}
