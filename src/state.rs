//! Shared application state: one instance wires every store, service, and
//! background manager together, constructed once in `main.rs` and handed to
//! the MCP dispatch loop, mirroring `types.rs::ServerState`'s role as the
//! single object passed to every tool handler.

use std::path::PathBuf;
use std::sync::Arc;

use crate::embedding::{EmbeddingProvider, FastEmbedProvider, HashEmbeddingProvider, ModelPreset};
use crate::graph_analysis::GraphAnalyzer;
use crate::indexing::IndexingEngine;
use crate::jobs::JobManager;
use crate::query_cache::QueryCacheService;
use crate::search::SearchOrchestrator;
use crate::store::cache::CacheStore;
use crate::store::graph::GraphStore;
use crate::store::project::ProjectStore;
use crate::store::vector_text::VectorTextStore;

pub struct AppState {
    pub data_dir: PathBuf,
    pub projects: Arc<ProjectStore>,
    pub vector_text: Arc<VectorTextStore>,
    pub graph: Arc<GraphStore>,
    pub cache: Arc<CacheStore>,
    pub query_cache: Arc<QueryCacheService>,
    pub jobs: Arc<JobManager>,
    pub indexing: Arc<IndexingEngine>,
    pub search: Arc<SearchOrchestrator>,
    pub graph_analysis: Arc<GraphAnalyzer>,
}

impl AppState {
    pub fn new(data_dir: PathBuf, embedding_model: ModelPreset) -> crate::error::Result<Self> {
        std::fs::create_dir_all(&data_dir)?;

        let projects = Arc::new(ProjectStore::new(data_dir.join("projects"))?);
        let vector_text = Arc::new(VectorTextStore::new(data_dir.join("vector_text")));
        let graph = Arc::new(GraphStore::new(data_dir.join("graph")));
        let cache = Arc::new(CacheStore::new());
        let query_cache = Arc::new(QueryCacheService::new((*cache).clone()));
        let jobs = JobManager::new();

        let embedder: Arc<dyn EmbeddingProvider> = build_embedder(embedding_model);

        let indexing = Arc::new(IndexingEngine {
            vector_text: vector_text.clone(),
            graph: graph.clone(),
            projects: projects.clone(),
            embedder: embedder.clone(),
            cache: cache.clone(),
        });

        let search = Arc::new(SearchOrchestrator {
            vector_text: vector_text.clone(),
            projects: projects.clone(),
            cache: query_cache.clone(),
            embedder: embedder.clone(),
        });

        let graph_analysis = Arc::new(GraphAnalyzer {
            graph: graph.clone(),
            vector_text: vector_text.clone(),
        });

        Ok(Self {
            data_dir,
            projects,
            vector_text,
            graph,
            cache,
            query_cache,
            jobs,
            indexing,
            search,
            graph_analysis,
        })
    }
}

/// Builds the real `fastembed` provider when the `semantic` feature is
/// compiled in; otherwise falls back to the deterministic hash-based
/// provider used for tests and lean builds, matching `semantic.rs`'s own
/// feature-gated fallback.
#[cfg(feature = "semantic")]
fn build_embedder(preset: ModelPreset) -> Arc<dyn EmbeddingProvider> {
    match FastEmbedProvider::new(preset) {
        Ok(provider) => Arc::new(provider),
        Err(err) => {
            tracing::warn!(error = %err, "falling back to hash embedding provider");
            Arc::new(HashEmbeddingProvider::new(preset.dim()))
        }
    }
}

#[cfg(not(feature = "semantic"))]
fn build_embedder(preset: ModelPreset) -> Arc<dyn EmbeddingProvider> {
    Arc::new(HashEmbeddingProvider::new(preset.dim()))
}
