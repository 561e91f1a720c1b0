//! C11 Search Orchestrator: resolves a project, consults the query cache,
//! falls back to hybrid search, and applies post-filters.
//!
//! Generalizes `mcp.rs`'s `resolve_repo`/`resolve_repos_for_search`
//! multi-repo resolution logic to the spec's single/ambiguous-project
//! resolution, wired to C6 (`VectorTextStore`) and C13 (`QueryCacheService`).

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use serde_json::json;

use crate::embedding::EmbeddingProvider;
use crate::error::{CodeSeekerError, Result};
use crate::model::Project;
use crate::query_cache::QueryCacheService;
use crate::store::project::ProjectStore;
use crate::store::vector_text::VectorTextStore;

const MAX_CHUNK_CHARS: usize = 500;

#[derive(Debug, Clone, Default)]
pub struct SearchFilters {
    pub language: Option<String>,
    pub chunk_type: Option<String>,
    pub file_path_substring: Option<String>,
}

#[derive(Debug, Clone)]
pub enum SearchMode {
    Exists,
    Full,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResultItem {
    pub file_path: String,
    pub relative_path: String,
    pub content: String,
    pub score: f64,
    pub line_start: usize,
    pub line_end: usize,
    pub match_source: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResultItem>,
    pub total: usize,
    pub truncated: bool,
    pub cached: bool,
}

pub struct SearchOrchestrator {
    pub vector_text: Arc<VectorTextStore>,
    pub projects: Arc<ProjectStore>,
    pub cache: Arc<QueryCacheService>,
    pub embedder: Arc<dyn EmbeddingProvider>,
}

impl SearchOrchestrator {
    fn resolve_project(&self, project_hint: Option<&str>) -> Result<Project> {
        let project = self.projects.resolve(project_hint)?;
        if self.vector_text.count(&project.id) == 0 {
            return Err(CodeSeekerError::not_indexed(format!(
                "project {} has not been indexed yet, run `index` first",
                project.name
            )));
        }
        Ok(project)
    }

    pub fn search(
        &self,
        query: &str,
        project_hint: Option<&str>,
        limit: usize,
        mode: SearchMode,
        filters: &SearchFilters,
    ) -> Result<SearchResponse> {
        let project = self.resolve_project(project_hint)?;

        if matches!(mode, SearchMode::Exists) {
            let hits = self.vector_text.search_text(&project.id, query, 1);
            return Ok(SearchResponse {
                total: hits.len(),
                results: hits
                    .into_iter()
                    .map(|(doc, score)| SearchResultItem {
                        file_path: Path::new(&project.absolute_path)
                            .join(&doc.relative_path)
                            .to_string_lossy()
                            .to_string(),
                        relative_path: doc.relative_path,
                        content: String::new(),
                        score,
                        line_start: 0,
                        line_end: 0,
                        match_source: vec!["text".to_string()],
                    })
                    .collect(),
                truncated: false,
                cached: false,
            });
        }

        let search_type = "hybrid";
        if let Some(cached) = self.cache.get(query, &project.id, search_type) {
            if let Ok(items) = serde_json::from_value::<Vec<SearchResultItem>>(cached) {
                let truncated = items.len() > limit;
                let mut items = items;
                items.truncate(limit);
                let total = items.len();
                return Ok(SearchResponse { results: items, total, truncated, cached: true });
            }
        }

        let query_vector = self.embedder.embed_one(query).unwrap_or_default();
        let hybrid_hits = self.vector_text.search_hybrid(&project.id, query, &query_vector, limit * 3);

        let mut items: Vec<SearchResultItem> = hybrid_hits
            .into_iter()
            .filter(|h| {
                if let Some(lang) = &filters.language {
                    if !h.document.metadata.extension.eq_ignore_ascii_case(lang) {
                        return false;
                    }
                }
                if let Some(substr) = &filters.file_path_substring {
                    if !h.document.relative_path.contains(substr.as_str()) {
                        return false;
                    }
                }
                if let Some(chunk_type) = &filters.chunk_type {
                    if !h.document.metadata.chunk_type.eq_ignore_ascii_case(chunk_type) {
                        return false;
                    }
                }
                true
            })
            .map(|h| {
                let mut content = h.document.content.clone();
                if content.len() > MAX_CHUNK_CHARS {
                    content.truncate(MAX_CHUNK_CHARS);
                    content.push('\u{2026}');
                }
                SearchResultItem {
                    file_path: Path::new(&project.absolute_path)
                        .join(&h.document.relative_path)
                        .to_string_lossy()
                        .to_string(),
                    relative_path: h.document.relative_path,
                    content,
                    score: h.score,
                    line_start: h.document.metadata.line_start,
                    line_end: h.document.metadata.line_end,
                    match_source: h.debug.match_source,
                }
            })
            .collect();

        let truncated = items.len() > limit;
        items.truncate(limit);
        let total = items.len();

        if !items.is_empty() {
            if let Ok(values) = items
                .iter()
                .map(serde_json::to_value)
                .collect::<std::result::Result<Vec<_>, _>>()
            {
                self.cache.set(query, &project.id, search_type, values);
            }
        }

        Ok(SearchResponse { results: items, total, truncated, cached: false })
    }

    /// `max_lines` caps the numbered content read back per file; results are
    /// deduped by `relative_path` first (`search` can return several chunks
    /// from the same file, ranked by score) so each file is read once.
    pub fn search_and_read(
        &self,
        query: &str,
        project_hint: Option<&str>,
        limit: usize,
        max_lines: usize,
        filters: &SearchFilters,
    ) -> Result<serde_json::Value> {
        let response = self.search(query, project_hint, limit, SearchMode::Full, filters)?;
        let project = self.resolve_project(project_hint)?;
        let mut seen_paths = std::collections::HashSet::new();
        let mut enriched = Vec::new();
        for item in response.results {
            if !seen_paths.insert(item.relative_path.clone()) {
                continue;
            }
            let absolute = Path::new(&project.absolute_path).join(&item.relative_path);
            let full_content = std::fs::read_to_string(&absolute).unwrap_or_default();
            let total_lines = full_content.lines().count();
            let numbered_content = full_content
                .lines()
                .take(max_lines)
                .enumerate()
                .map(|(i, line)| format!("{:>6}  {line}", i + 1))
                .collect::<Vec<_>>()
                .join("\n");
            enriched.push(json!({
                "filePath": item.file_path,
                "relativePath": item.relative_path,
                "snippet": item.content,
                "content": numbered_content,
                "totalLines": total_lines,
                "fileTruncated": total_lines > max_lines,
                "score": item.score,
                "lineStart": item.line_start,
                "lineEnd": item.line_end,
            }));
        }
        Ok(json!({ "results": enriched, "total": response.total, "truncated": response.truncated }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashEmbeddingProvider;
    use crate::model::{ChunkDocument, ChunkMetadata};
    use crate::store::cache::CacheStore;
    use chrono::Utc;

    fn setup() -> (SearchOrchestrator, Project) {
        let dir = tempfile::tempdir().unwrap();
        let vt = Arc::new(VectorTextStore::new(dir.path().join("vt")));
        let projects = Arc::new(ProjectStore::new(dir.path().join("proj")).unwrap());
        let cache = Arc::new(QueryCacheService::new(CacheStore::new()));
        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(HashEmbeddingProvider::new(16));

        let project = projects.get_or_create(dir.path().to_str().unwrap(), Some("demo")).unwrap();
        vt.upsert(ChunkDocument {
            id: ChunkDocument::make_id(&project.id, "src/auth.rs", 0),
            project_id: project.id.clone(),
            relative_path: "src/auth.rs".to_string(),
            content: "fn authenticate_user() {}".to_string(),
            embedding: embedder.embed_one("fn authenticate_user() {}").unwrap(),
            metadata: ChunkMetadata {
                file_name: "auth.rs".into(),
                extension: "rs".into(),
                chunk_index: 0,
                line_start: 1,
                line_end: 1,
                file_hash: "abc".into(),
                indexed_at: Utc::now(),
                chunk_type: "function".into(),
            },
        })
        .unwrap();

        let orchestrator = SearchOrchestrator {
            vector_text: vt,
            projects,
            cache,
            embedder,
        };
        (orchestrator, project)
    }

    #[test]
    fn search_without_index_is_not_indexed_error() {
        let dir = tempfile::tempdir().unwrap();
        let vt = Arc::new(VectorTextStore::new(dir.path().join("vt")));
        let projects = Arc::new(ProjectStore::new(dir.path().join("proj")).unwrap());
        let cache = Arc::new(QueryCacheService::new(CacheStore::new()));
        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(HashEmbeddingProvider::new(16));
        projects.get_or_create("/tmp/empty", Some("empty")).unwrap();
        let orchestrator = SearchOrchestrator { vector_text: vt, projects, cache, embedder };

        let err = orchestrator
            .search("auth", None, 10, SearchMode::Full, &SearchFilters::default())
            .unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::NotIndexed);
    }

    #[test]
    fn full_search_finds_and_caches_results() {
        let (orchestrator, project) = setup();
        let first = orchestrator
            .search("authenticate", Some(&project.id), 10, SearchMode::Full, &SearchFilters::default())
            .unwrap();
        assert!(!first.results.is_empty());
        assert!(!first.cached);

        let second = orchestrator
            .search("authenticate", Some(&project.id), 10, SearchMode::Full, &SearchFilters::default())
            .unwrap();
        assert!(second.cached);
    }

    #[test]
    fn exists_mode_returns_no_content() {
        let (orchestrator, project) = setup();
        let result = orchestrator
            .search("authenticate", Some(&project.id), 10, SearchMode::Exists, &SearchFilters::default())
            .unwrap();
        assert!(result.results.iter().all(|r| r.content.is_empty()));
    }

    #[test]
    fn language_filter_excludes_other_extensions() {
        let (orchestrator, project) = setup();
        let filters = SearchFilters {
            language: Some("py".to_string()),
            ..Default::default()
        };
        let result = orchestrator
            .search("authenticate", Some(&project.id), 10, SearchMode::Full, &filters)
            .unwrap();
        assert!(result.results.is_empty());
    }

    #[test]
    fn chunk_type_filter_matches_and_excludes() {
        let (orchestrator, project) = setup();
        let matching = SearchFilters {
            chunk_type: Some("function".to_string()),
            ..Default::default()
        };
        let result = orchestrator
            .search("authenticate", Some(&project.id), 10, SearchMode::Full, &matching)
            .unwrap();
        assert!(!result.results.is_empty());

        let excluding = SearchFilters {
            chunk_type: Some("class".to_string()),
            ..Default::default()
        };
        let result = orchestrator
            .search("authenticate", Some(&project.id), 10, SearchMode::Full, &excluding)
            .unwrap();
        assert!(result.results.is_empty());
    }

    #[test]
    fn search_and_read_dedupes_by_file_and_caps_lines() {
        let (orchestrator, project) = setup();
        let embedder = HashEmbeddingProvider::new(16);
        orchestrator
            .vector_text
            .upsert(ChunkDocument {
                id: ChunkDocument::make_id(&project.id, "src/auth.rs", 1),
                project_id: project.id.clone(),
                relative_path: "src/auth.rs".to_string(),
                content: "fn authenticate_admin() {}".to_string(),
                embedding: embedder.embed_one("fn authenticate_admin() {}").unwrap(),
                metadata: ChunkMetadata {
                    file_name: "auth.rs".into(),
                    extension: "rs".into(),
                    chunk_index: 1,
                    line_start: 5,
                    line_end: 6,
                    file_hash: "abc".into(),
                    indexed_at: Utc::now(),
                    chunk_type: "function".into(),
                },
            })
            .unwrap();

        let result = orchestrator
            .search_and_read("authenticate", Some(&project.id), 10, 500, &SearchFilters::default())
            .unwrap();
        let results = result["results"].as_array().unwrap();
        assert_eq!(results.len(), 1, "both chunks are from src/auth.rs, so only one file should be read");
    }
}
