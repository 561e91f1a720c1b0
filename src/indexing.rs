//! C10 Indexing Engine: orchestrates C1-C7 into full/incremental index,
//! single-file re-index, delete, and exclusion-driven eviction.
//!
//! Generalizes `main.rs`'s repo-scan-then-semantic-index pipeline (parallel
//! scan, background semantic-index thread) into the spec's
//! scanning -> indexing -> graph -> complete phases, reusing the teacher's
//! `std::thread::spawn` background-work idiom instead of an async runtime.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use tracing::warn;

use crate::chunker;
use crate::embedding::EmbeddingProvider;
use crate::error::Result;
use crate::hasher::sha256_hex;
use crate::jobs::CancellationToken;
use crate::model::{ChunkDocument, ChunkMetadata, EdgeType, ExclusionPattern, GraphEdge, GraphNode, NodeType};
use crate::parser;
use crate::safety::GlobMatcher;
use crate::scanner;
use crate::store::cache::CacheStore;
use crate::store::graph::GraphStore;
use crate::store::project::ProjectStore;
use crate::store::vector_text::VectorTextStore;

pub const MAX_FILES: usize = 50_000;
const MAX_GRAPH_SOURCE_NODES: usize = 30_000;
const MAX_GRAPH_OTHER_NODES: usize = 15_000;
const MAX_GRAPH_CONFIG_NODES: usize = 5_000;

const SOURCE_PREFIXES: [&str; 4] = ["src/", "lib/", "app/", "Assets/Scripts/"];
const CODE_EXTENSIONS: [&str; 12] = [
    "rs", "ts", "tsx", "js", "jsx", "mjs", "cjs", "py", "go", "c", "cpp", "java",
];
const JS_RESOLVE_EXTENSIONS: [&str; 5] = ["ts", "tsx", "js", "jsx", "mjs"];

/// Result of a full `index_project` run.
#[derive(Debug, Clone, serde::Serialize)]
pub struct IndexResult {
    pub files_processed: usize,
    pub chunks_created: usize,
    pub nodes_created: usize,
    pub edges_created: usize,
    pub cancelled: bool,
    pub limit_warning: Option<String>,
}

/// Result of `index_single_file`.
#[derive(Debug, Clone, serde::Serialize)]
pub struct FileIndexResult {
    pub success: bool,
    pub chunks_created: usize,
    pub nodes_created: Option<usize>,
}

pub struct IndexingEngine {
    pub vector_text: Arc<VectorTextStore>,
    pub graph: Arc<GraphStore>,
    pub projects: Arc<ProjectStore>,
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub cache: Arc<CacheStore>,
}

/// Reports progress via the same shape the job manager stores, without
/// depending on `JobManager` directly so tests can pass a plain closure.
pub type ProgressFn<'a> = dyn Fn(&str, usize, usize, usize, usize, usize) + Send + Sync + 'a;

impl IndexingEngine {
    fn file_priority(relative_path: &str) -> u8 {
        let normalized = relative_path.replace('\\', "/");
        if SOURCE_PREFIXES.iter().any(|p| normalized.starts_with(p)) {
            0
        } else {
            let ext = Path::new(&normalized)
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("");
            if CODE_EXTENSIONS.contains(&ext) {
                1
            } else {
                2
            }
        }
    }

    pub fn index_project(
        &self,
        project_path: &Path,
        project_id: &str,
        exclusions: &[GlobMatcher],
        token: &CancellationToken,
        on_progress: Option<&ProgressFn>,
    ) -> Result<IndexResult> {
        let emit = |phase: &str, fp: usize, ft: usize, cc: usize, nc: usize, ec: usize| {
            if let Some(f) = on_progress {
                f(phase, fp, ft, cc, nc, ec);
            }
        };

        emit("scanning", 0, 0, 0, 0, 0);
        let extensions = scanner::default_extensions();
        let mut files = scanner::scan(project_path, &extensions, exclusions, None);
        files.sort_by_key(|f| Self::file_priority(f));

        let mut limit_warning = None;
        if files.len() > MAX_FILES {
            limit_warning = Some(format!(
                "project has {} files, indexing the first {MAX_FILES} after prioritization",
                files.len()
            ));
            files.truncate(MAX_FILES);
        }
        let total = files.len();

        emit("indexing", 0, total, 0, 0, 0);
        let mut chunks_created = 0usize;
        let mut nodes_created = 0usize;
        let mut edges_created = 0usize;

        self.graph.upsert_node(GraphNode {
            id: format!("{project_id}:__root__"),
            node_type: NodeType::Module,
            name: project_id.to_string(),
            file_path: String::new(),
            project_id: project_id.to_string(),
            properties: Default::default(),
        })?;
        nodes_created += 1;

        let mut namespace_map: HashMap<String, String> = HashMap::new();
        let mut parsed_by_file: HashMap<String, (parser::ParsedStructure, String)> = HashMap::new();

        for (i, relative_path) in files.iter().enumerate() {
            if token.is_cancelled() {
                return Ok(IndexResult {
                    files_processed: i,
                    chunks_created,
                    nodes_created,
                    edges_created,
                    cancelled: true,
                    limit_warning,
                });
            }

            let absolute = scanner::resolve(project_path, relative_path);
            let Ok(content) = std::fs::read_to_string(&absolute) else { continue };
            if content.len() < 50 {
                continue;
            }

            let ext = Path::new(relative_path)
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("")
                .to_string();
            let file_hash = sha256_hex(content.as_bytes());
            let structure = parser::parse(&content, &ext);

            let chunks = chunker::chunk(&content);
            if !chunks.is_empty() {
                let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
                let embeddings = self.embedder.embed_batch(&texts)?;
                let now = Utc::now();
                let mut docs = Vec::with_capacity(chunks.len());
                for (idx, (c, embedding)) in chunks.iter().zip(embeddings).enumerate() {
                    docs.push(ChunkDocument {
                        id: ChunkDocument::make_id(project_id, relative_path, idx),
                        project_id: project_id.to_string(),
                        relative_path: relative_path.clone(),
                        content: c.content.clone(),
                        embedding,
                        metadata: ChunkMetadata {
                            file_name: Path::new(relative_path)
                                .file_name()
                                .map(|n| n.to_string_lossy().to_string())
                                .unwrap_or_else(|| relative_path.clone()),
                            extension: ext.clone(),
                            chunk_index: idx,
                            line_start: c.line_start,
                            line_end: c.line_end,
                            file_hash: file_hash.clone(),
                            indexed_at: now,
                            chunk_type: classify_chunk_type(&c.content, &structure),
                        },
                    });
                }
                chunks_created += docs.len();
                self.vector_text.upsert_many(docs)?;
            }

            parsed_by_file.insert(relative_path.clone(), (structure, ext.clone()));
            if relative_path.contains("Scripts/") && ext == "cs" {
                if let Some(ns) = infer_cs_namespace(relative_path) {
                    namespace_map.insert(relative_path.clone(), ns);
                }
            }

            if i % 25 == 0 {
                emit("indexing", i, total, chunks_created, nodes_created, edges_created);
            }
        }

        emit("graph", total, total, chunks_created, nodes_created, edges_created);
        let mut source_quota = MAX_GRAPH_SOURCE_NODES;
        let mut other_quota = MAX_GRAPH_OTHER_NODES;
        let mut config_quota = MAX_GRAPH_CONFIG_NODES;

        for relative_path in &files {
            if token.is_cancelled() {
                return Ok(IndexResult {
                    files_processed: files.len(),
                    chunks_created,
                    nodes_created,
                    edges_created,
                    cancelled: true,
                    limit_warning,
                });
            }

            let priority = Self::file_priority(relative_path);
            let quota = match priority {
                0 => &mut source_quota,
                1 => &mut other_quota,
                _ => &mut config_quota,
            };
            if *quota == 0 {
                continue;
            }

            let file_node_id = format!("{project_id}:{relative_path}");
            self.graph.upsert_node(GraphNode {
                id: file_node_id.clone(),
                node_type: NodeType::File,
                name: relative_path.clone(),
                file_path: relative_path.clone(),
                project_id: project_id.to_string(),
                properties: Default::default(),
            })?;
            nodes_created += 1;
            *quota = quota.saturating_sub(1);
            self.graph.upsert_edge(
                project_id,
                GraphEdge {
                    id: GraphEdge::make_id(&format!("{project_id}:__root__"), &file_node_id, EdgeType::Contains),
                    source: format!("{project_id}:__root__"),
                    target: file_node_id.clone(),
                    edge_type: EdgeType::Contains,
                    properties: Default::default(),
                },
            )?;
            edges_created += 1;

            let Some((structure, _ext)) = parsed_by_file.get(relative_path) else { continue };
            let (n, e) = self.emit_member_nodes(project_id, relative_path, &file_node_id, structure)?;
            nodes_created += n;
            edges_created += e;
        }

        for relative_path in &files {
            let Some((structure, ext)) = parsed_by_file.get(relative_path) else { continue };
            if JS_RESOLVE_EXTENSIONS.contains(&ext.as_str()) {
                edges_created += self.emit_js_import_edges(project_id, relative_path, structure, &files)?;
            } else if ext == "cs" {
                edges_created += self.emit_cs_import_edges(project_id, relative_path, structure, &namespace_map)?;
            }
        }

        self.vector_text.flush(project_id)?;
        self.graph.flush(project_id)?;

        emit("complete", files.len(), total, chunks_created, nodes_created, edges_created);
        Ok(IndexResult {
            files_processed: files.len(),
            chunks_created,
            nodes_created,
            edges_created,
            cancelled: false,
            limit_warning,
        })
    }

    fn emit_member_nodes(
        &self,
        project_id: &str,
        relative_path: &str,
        file_node_id: &str,
        structure: &parser::ParsedStructure,
    ) -> Result<(usize, usize)> {
        let mut nodes = 0usize;
        let mut edges = 0usize;
        for class in &structure.classes {
            let class_node_id = format!("{file_node_id}::{}", class.name);
            self.graph.upsert_node(GraphNode {
                id: class_node_id.clone(),
                node_type: NodeType::Class,
                name: class.name.clone(),
                file_path: relative_path.to_string(),
                project_id: project_id.to_string(),
                properties: Default::default(),
            })?;
            nodes += 1;
            self.graph.upsert_edge(
                project_id,
                GraphEdge {
                    id: GraphEdge::make_id(file_node_id, &class_node_id, EdgeType::Contains),
                    source: file_node_id.to_string(),
                    target: class_node_id.clone(),
                    edge_type: EdgeType::Contains,
                    properties: Default::default(),
                },
            )?;
            edges += 1;

            for method in &class.methods {
                let method_node_id = format!("{file_node_id}::{}.{method}", class.name);
                self.graph.upsert_node(GraphNode {
                    id: method_node_id.clone(),
                    node_type: NodeType::Function,
                    name: format!("{}.{method}", class.name),
                    file_path: relative_path.to_string(),
                    project_id: project_id.to_string(),
                    properties: Default::default(),
                })?;
                nodes += 1;
                // Contains edge is file -> member, a flat relation, not class -> member.
                self.graph.upsert_edge(
                    project_id,
                    GraphEdge {
                        id: GraphEdge::make_id(file_node_id, &method_node_id, EdgeType::Contains),
                        source: file_node_id.to_string(),
                        target: method_node_id,
                        edge_type: EdgeType::Contains,
                        properties: Default::default(),
                    },
                )?;
                edges += 1;
            }
        }

        for function in &structure.functions {
            let fn_node_id = format!("{file_node_id}::{}", function.name);
            self.graph.upsert_node(GraphNode {
                id: fn_node_id.clone(),
                node_type: NodeType::Function,
                name: function.name.clone(),
                file_path: relative_path.to_string(),
                project_id: project_id.to_string(),
                properties: Default::default(),
            })?;
            nodes += 1;
            self.graph.upsert_edge(
                project_id,
                GraphEdge {
                    id: GraphEdge::make_id(file_node_id, &fn_node_id, EdgeType::Contains),
                    source: file_node_id.to_string(),
                    target: fn_node_id,
                    edge_type: EdgeType::Contains,
                    properties: Default::default(),
                },
            )?;
            edges += 1;
        }

        for interface in &structure.interfaces {
            let node_id = format!("{file_node_id}::{}", interface.name);
            self.graph.upsert_node(GraphNode {
                id: node_id.clone(),
                node_type: NodeType::Class,
                name: interface.name.clone(),
                file_path: relative_path.to_string(),
                project_id: project_id.to_string(),
                properties: Default::default(),
            })?;
            nodes += 1;
            self.graph.upsert_edge(
                project_id,
                GraphEdge {
                    id: GraphEdge::make_id(file_node_id, &node_id, EdgeType::Contains),
                    source: file_node_id.to_string(),
                    target: node_id,
                    edge_type: EdgeType::Contains,
                    properties: Default::default(),
                },
            )?;
            edges += 1;
        }

        Ok((nodes, edges))
    }

    fn emit_js_import_edges(
        &self,
        project_id: &str,
        relative_path: &str,
        structure: &parser::ParsedStructure,
        scanned: &[String],
    ) -> Result<usize> {
        let scanned_set: HashSet<&str> = scanned.iter().map(|s| s.as_str()).collect();
        let dir = Path::new(relative_path).parent().unwrap_or_else(|| Path::new(""));
        let mut edges = 0usize;
        for import in &structure.imports {
            if !import.from.starts_with('.') {
                continue;
            }
            let joined = dir.join(&import.from);
            let candidate = joined.to_string_lossy().replace('\\', "/");
            let mut resolved = None;
            if scanned_set.contains(candidate.as_str()) {
                resolved = Some(candidate.clone());
            } else {
                for ext in JS_RESOLVE_EXTENSIONS {
                    let with_ext = format!("{candidate}.{ext}");
                    if scanned_set.contains(with_ext.as_str()) {
                        resolved = Some(with_ext);
                        break;
                    }
                    let index_path = format!("{candidate}/index.{ext}");
                    if scanned_set.contains(index_path.as_str()) {
                        resolved = Some(index_path);
                        break;
                    }
                }
            }
            if let Some(target_path) = resolved {
                let source_id = format!("{project_id}:{relative_path}");
                let target_id = format!("{project_id}:{target_path}");
                self.graph.upsert_edge(
                    project_id,
                    GraphEdge {
                        id: GraphEdge::make_id(&source_id, &target_id, EdgeType::Imports),
                        source: source_id,
                        target: target_id,
                        edge_type: EdgeType::Imports,
                        properties: Default::default(),
                    },
                )?;
                edges += 1;
            }
        }
        Ok(edges)
    }

    fn emit_cs_import_edges(
        &self,
        project_id: &str,
        relative_path: &str,
        structure: &parser::ParsedStructure,
        namespace_map: &HashMap<String, String>,
    ) -> Result<usize> {
        let mut edges = 0usize;
        let source_id = format!("{project_id}:{relative_path}");
        for import in &structure.imports {
            let ns = &import.from;
            if ns.starts_with("System") || ns.starts_with("UnityEngine") || ns.starts_with("UnityEditor") {
                continue;
            }
            for (other_path, other_ns) in namespace_map {
                if other_path == relative_path || other_ns != ns {
                    continue;
                }
                let target_id = format!("{project_id}:{other_path}");
                self.graph.upsert_edge(
                    project_id,
                    GraphEdge {
                        id: GraphEdge::make_id(&source_id, &target_id, EdgeType::Imports),
                        source: source_id.clone(),
                        target: target_id,
                        edge_type: EdgeType::Imports,
                        properties: Default::default(),
                    },
                )?;
                edges += 1;
            }
        }
        Ok(edges)
    }

    /// Delete the file's existing chunks, re-embed and re-upsert, then
    /// delete-and-re-emit its graph sub-tree and import edges.
    pub fn index_single_file(
        &self,
        project_path: &Path,
        relative_path: &str,
        project_id: &str,
    ) -> Result<FileIndexResult> {
        self.vector_text.delete_where(project_id, |p| p == relative_path)?;
        self.graph.delete_file_subtree(project_id, relative_path)?;

        let absolute = scanner::resolve(project_path, relative_path);
        let Ok(content) = std::fs::read_to_string(&absolute) else {
            return Ok(FileIndexResult { success: false, chunks_created: 0, nodes_created: None });
        };
        if content.len() < 50 {
            return Ok(FileIndexResult { success: true, chunks_created: 0, nodes_created: Some(0) });
        }

        let ext = Path::new(relative_path)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_string();
        let file_hash = sha256_hex(content.as_bytes());
        let structure = parser::parse(&content, &ext);
        let chunks = chunker::chunk(&content);
        let mut chunks_created = 0;
        if !chunks.is_empty() {
            let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
            let embeddings = self.embedder.embed_batch(&texts)?;
            let now = Utc::now();
            let mut docs = Vec::with_capacity(chunks.len());
            for (idx, (c, embedding)) in chunks.iter().zip(embeddings).enumerate() {
                docs.push(ChunkDocument {
                    id: ChunkDocument::make_id(project_id, relative_path, idx),
                    project_id: project_id.to_string(),
                    relative_path: relative_path.to_string(),
                    content: c.content.clone(),
                    embedding,
                    metadata: ChunkMetadata {
                        file_name: Path::new(relative_path)
                            .file_name()
                            .map(|n| n.to_string_lossy().to_string())
                            .unwrap_or_else(|| relative_path.to_string()),
                        extension: ext.clone(),
                        chunk_index: idx,
                        line_start: c.line_start,
                        line_end: c.line_end,
                        file_hash: file_hash.clone(),
                        indexed_at: now,
                        chunk_type: classify_chunk_type(&c.content, &structure),
                    },
                });
            }
            chunks_created = docs.len();
            self.vector_text.upsert_many(docs)?;
        }

        let file_node_id = format!("{project_id}:{relative_path}");
        self.graph.upsert_node(GraphNode {
            id: file_node_id.clone(),
            node_type: NodeType::File,
            name: relative_path.to_string(),
            file_path: relative_path.to_string(),
            project_id: project_id.to_string(),
            properties: Default::default(),
        })?;
        let (nodes_created, _) = self.emit_member_nodes(project_id, relative_path, &file_node_id, &structure)?;

        self.vector_text.flush(project_id)?;
        self.graph.flush(project_id)?;
        self.cache.delete_prefix("search:");

        Ok(FileIndexResult {
            success: true,
            chunks_created,
            nodes_created: Some(nodes_created + 1),
        })
    }

    pub fn delete_file(&self, project_id: &str, relative_path: &str) -> Result<()> {
        self.vector_text.delete_where(project_id, |p| p == relative_path)?;
        self.graph.delete_file_subtree(project_id, relative_path)?;
        self.vector_text.flush(project_id)?;
        self.graph.flush(project_id)?;
        self.cache.delete_prefix("search:");
        Ok(())
    }

    /// `exclude` appends patterns and evicts any chunk already matching
    /// them; `include` drops patterns (re-indexing elsewhere repopulates);
    /// `list` is read-only.
    pub fn apply_exclusions(
        &self,
        project_id: &str,
        data_dir: &Path,
        patterns: &[String],
        action: &str,
    ) -> Result<Vec<ExclusionPattern>> {
        let path = data_dir.join(project_id).join("exclusions.json");
        let mut set: crate::model::ExclusionPatternSet =
            crate::store::read_json_if_exists(&path)?.unwrap_or_default();

        match action {
            "exclude" => {
                let now = Utc::now();
                for pattern in patterns {
                    if !set.patterns.iter().any(|p| &p.pattern == pattern) {
                        set.patterns.push(ExclusionPattern {
                            pattern: pattern.clone(),
                            reason: None,
                            added_at: now,
                        });
                    }
                }
                set.last_modified = Some(now);
                crate::store::write_json_atomic(&path, &set)?;

                let matchers: Vec<GlobMatcher> = patterns
                    .iter()
                    .filter_map(|p| crate::safety::compile_glob(p).ok())
                    .collect();
                self.vector_text
                    .delete_where(project_id, |rel| matchers.iter().any(|m| m.is_match(rel)))?;
                self.vector_text.flush(project_id)?;
            }
            "include" => {
                set.patterns.retain(|p| !patterns.contains(&p.pattern));
                set.last_modified = Some(Utc::now());
                crate::store::write_json_atomic(&path, &set)?;
            }
            "list" => {}
            other => warn!(action = other, "unknown exclusion action, treating as list"),
        }

        Ok(set.patterns)
    }
}

/// Classifies a chunk as `"class"`, `"function"`, `"interface"`, or
/// `"code"` by checking whether a name from the file's already-parsed
/// `ParsedStructure` occurs in the chunk's content. `ParsedClass`/
/// `ParsedFunction`/`ParsedInterface` carry no line ranges, so this is a
/// substring check rather than a line-range overlap; checked in
/// class/interface/function order since a method's chunk usually still
/// contains its enclosing class name.
fn classify_chunk_type(content: &str, structure: &parser::ParsedStructure) -> String {
    if structure.classes.iter().any(|c| !c.name.is_empty() && content.contains(&c.name)) {
        return "class".to_string();
    }
    if structure.interfaces.iter().any(|i| !i.name.is_empty() && content.contains(&i.name)) {
        return "interface".to_string();
    }
    if structure.functions.iter().any(|f| !f.name.is_empty() && content.contains(&f.name)) {
        return "function".to_string();
    }
    "code".to_string()
}

fn infer_cs_namespace(relative_path: &str) -> Option<String> {
    let normalized = relative_path.replace('\\', "/");
    let idx = normalized.find("Scripts/")?;
    let rest = &normalized[idx + "Scripts/".len()..];
    let dir = Path::new(rest).parent()?;
    if dir.as_os_str().is_empty() {
        return None;
    }
    Some(dir.to_string_lossy().replace('/', "."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashEmbeddingProvider;
    use std::fs;

    fn engine(dir: &Path) -> IndexingEngine {
        IndexingEngine {
            vector_text: Arc::new(VectorTextStore::new(dir.join("vt"))),
            graph: Arc::new(GraphStore::new(dir.join("graph"))),
            projects: Arc::new(ProjectStore::new(dir.join("proj")).unwrap()),
            embedder: Arc::new(HashEmbeddingProvider::new(16)),
            cache: Arc::new(CacheStore::new()),
        }
    }

    #[test]
    fn index_project_creates_chunks_and_file_nodes() {
        let dir = tempfile::tempdir().unwrap();
        let repo = dir.path().join("repo");
        fs::create_dir_all(repo.join("src")).unwrap();
        fs::write(
            repo.join("src/main.rs"),
            "fn main() {\n".to_string() + &"    println!(\"hi\");\n".repeat(10) + "}\n",
        )
        .unwrap();

        let eng = engine(dir.path());
        let token = CancellationToken::new();
        eng.index_project(&repo, "p1", &[], &token, None).unwrap();
        assert!(eng.vector_text.count("p1") > 0);
    }

    #[test]
    fn cancellation_stops_before_completion() {
        let dir = tempfile::tempdir().unwrap();
        let repo = dir.path().join("repo");
        fs::create_dir_all(&repo).unwrap();
        for i in 0..5 {
            fs::write(
                repo.join(format!("f{i}.rs")),
                "fn x() {\n".to_string() + &"    let _ = 1;\n".repeat(10) + "}\n",
            )
            .unwrap();
        }
        let eng = engine(dir.path());
        let token = CancellationToken::new();
        token.cancel();
        let result = eng.index_project(&repo, "p1", &[], &token, None).unwrap();
        assert!(result.cancelled);
    }

    #[test]
    fn infer_cs_namespace_uses_scripts_root() {
        assert_eq!(
            infer_cs_namespace("Assets/Scripts/Gameplay/Player.cs"),
            Some("Gameplay".to_string())
        );
        assert_eq!(infer_cs_namespace("Assets/Scripts/Player.cs"), None);
    }

    #[test]
    fn apply_exclusions_evicts_matching_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let repo = dir.path().join("repo");
        fs::create_dir_all(&repo).unwrap();
        fs::write(
            repo.join("secret.rs"),
            "fn x() {\n".to_string() + &"    let _ = 1;\n".repeat(10) + "}\n",
        )
        .unwrap();
        let eng = engine(dir.path());
        let token = CancellationToken::new();
        eng.index_project(&repo, "p1", &[], &token, None).unwrap();
        assert!(eng.vector_text.count("p1") > 0);

        eng.apply_exclusions("p1", &dir.path().join("proj"), &["secret.rs".to_string()], "exclude")
            .unwrap();
        assert_eq!(eng.vector_text.count("p1"), 0);
    }
}
