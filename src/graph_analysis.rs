//! C12 Graph Analysis: BFS seed+expand traversal over C7, with seed
//! resolution from either an explicit file path or a hybrid-search query.
//!
//! Grounded on `graph.rs`'s edge-kind filtering and `mcp.rs`'s
//! "resolve, else list up to N candidates" error idiom (used there for
//! repo resolution, reused here for seed resolution).

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use serde::Serialize;

use crate::error::{CodeSeekerError, Result};
use crate::model::{EdgeType, GraphEdge, GraphNode, NodeType};
use crate::store::graph::{Direction, GraphStore};
use crate::store::vector_text::VectorTextStore;

const DEFAULT_MAX_NODES: usize = 50;
const MAX_DEPTH: u8 = 3;
const MAX_CANDIDATE_LIST: usize = 15;
const MAX_QUERY_SEEDS: usize = 5;

#[derive(Debug, Clone, Serialize)]
pub struct GraphStats {
    pub total_nodes: usize,
    pub file_nodes: usize,
    pub class_nodes: usize,
    pub function_nodes: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RelationshipsResult {
    pub seed_nodes: Vec<GraphNode>,
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    pub truncated: bool,
    pub stats: GraphStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct RelationshipsQuery {
    pub query: Option<String>,
    pub filepaths: Vec<String>,
    pub depth: u8,
    pub types: Option<Vec<EdgeType>>,
    pub direction: Direction,
    pub max_nodes: usize,
}

impl Default for Direction {
    fn default() -> Self {
        Direction::Both
    }
}

pub struct GraphAnalyzer {
    pub graph: Arc<GraphStore>,
    pub vector_text: Arc<VectorTextStore>,
}

impl GraphAnalyzer {
    pub fn relationships(&self, project_id: &str, query: RelationshipsQuery) -> Result<RelationshipsResult> {
        let max_nodes = if query.max_nodes == 0 { DEFAULT_MAX_NODES } else { query.max_nodes };
        let depth = query.depth.clamp(1, MAX_DEPTH).min(MAX_DEPTH);

        let seed_paths = self.resolve_seed_paths(project_id, &query)?;
        let all_file_nodes = self.graph.find_nodes(project_id, Some(NodeType::File));
        let seed_nodes = self.match_seeds(&all_file_nodes, &seed_paths)?;

        let mut visited: HashSet<String> = HashSet::new();
        let mut edge_seen: HashSet<(String, String, EdgeType)> = HashSet::new();
        let mut nodes: Vec<GraphNode> = Vec::new();
        let mut edges: Vec<GraphEdge> = Vec::new();
        let mut truncated = false;

        let mut queue: VecDeque<(String, u8)> = VecDeque::new();
        for seed in &seed_nodes {
            if visited.insert(seed.id.clone()) {
                nodes.push(seed.clone());
                queue.push_back((seed.id.clone(), 0));
            }
        }

        while let Some((node_id, current_depth)) = queue.pop_front() {
            if visited.len() >= max_nodes {
                truncated = true;
                break;
            }
            if current_depth >= depth {
                continue;
            }

            let node_edges = self.graph.get_edges(project_id, &node_id, query.direction);
            for edge in node_edges {
                if let Some(types) = &query.types {
                    if !types.contains(&edge.edge_type) {
                        continue;
                    }
                }
                let key = (edge.source.clone(), edge.target.clone(), edge.edge_type);
                if edge_seen.insert(key) {
                    edges.push(edge.clone());
                }

                let other = if edge.source == node_id { &edge.target } else { &edge.source };
                if visited.len() >= max_nodes {
                    truncated = true;
                    break;
                }
                if visited.insert(other.clone()) {
                    if let Some(n) = self.graph.get_node(project_id, other) {
                        nodes.push(n);
                    }
                    queue.push_back((other.clone(), current_depth + 1));
                }
            }
        }

        let stats = GraphStats {
            total_nodes: nodes.len(),
            file_nodes: nodes.iter().filter(|n| n.node_type == NodeType::File).count(),
            class_nodes: nodes.iter().filter(|n| n.node_type == NodeType::Class).count(),
            function_nodes: nodes.iter().filter(|n| n.node_type == NodeType::Function).count(),
        };

        let recommendation = if truncated {
            Some(format!(
                "traversal stopped at {max_nodes} nodes; narrow `types`, reduce `depth`, or pass a more specific seed to see more"
            ))
        } else {
            None
        };

        Ok(RelationshipsResult { seed_nodes, nodes, edges, truncated, stats, recommendation })
    }

    fn resolve_seed_paths(&self, project_id: &str, query: &RelationshipsQuery) -> Result<Vec<String>> {
        if !query.filepaths.is_empty() {
            return Ok(query.filepaths.clone());
        }
        if let Some(q) = &query.query {
            let empty_vec: Vec<f32> = Vec::new();
            let hits = self.vector_text.search_hybrid(project_id, q, &empty_vec, MAX_QUERY_SEEDS);
            let mut seen = HashSet::new();
            let paths: Vec<String> = hits
                .into_iter()
                .map(|h| h.document.relative_path)
                .filter(|p| seen.insert(p.clone()))
                .take(MAX_QUERY_SEEDS)
                .collect();
            if paths.is_empty() {
                return Err(CodeSeekerError::bad_input("query matched no indexed files to seed the traversal"));
            }
            return Ok(paths);
        }
        Err(CodeSeekerError::bad_input("relationships requires either `query` or `filepath`/`filepaths`"))
    }

    fn match_seeds(&self, file_nodes: &[GraphNode], seeds: &[String]) -> Result<Vec<GraphNode>> {
        let mut matched = Vec::new();
        for seed in seeds {
            let normalized_seed = seed.replace('\\', "/");
            let base_name = std::path::Path::new(&normalized_seed)
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| normalized_seed.clone());

            let found = file_nodes.iter().find(|n| {
                let normalized_path = n.file_path.replace('\\', "/");
                normalized_path == normalized_seed
                    || normalized_path.ends_with(&normalized_seed)
                    || normalized_path.contains(&format!("/{normalized_seed}"))
                    || n.name == base_name
            });
            if let Some(n) = found {
                matched.push(n.clone());
            }
        }

        if matched.is_empty() {
            let available: Vec<String> = file_nodes
                .iter()
                .take(MAX_CANDIDATE_LIST)
                .map(|n| n.file_path.clone())
                .collect();
            return Err(CodeSeekerError::not_found(format!(
                "no file node matches the given seed(s); available files include: {}",
                available.join(", ")
            )));
        }
        Ok(matched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashEmbeddingProvider;
    use crate::model::{ChunkDocument, ChunkMetadata};
    use chrono::Utc;

    fn setup() -> (GraphAnalyzer, &'static str) {
        let dir = tempfile::tempdir().unwrap();
        let graph = Arc::new(GraphStore::new(dir.path().join("graph")));
        let vector_text = Arc::new(VectorTextStore::new(dir.path().join("vt")));
        let project_id = "p1";

        let nodes = [
            ("app", NodeType::File, "index.ts"),
            ("user_controller", NodeType::File, "user.ts"),
            ("auth_service", NodeType::File, "auth.ts"),
        ];
        for (id, t, path) in nodes {
            graph
                .upsert_node(GraphNode {
                    id: id.to_string(),
                    node_type: t,
                    name: id.to_string(),
                    file_path: path.to_string(),
                    project_id: project_id.to_string(),
                    properties: Default::default(),
                })
                .unwrap();
        }
        graph
            .upsert_edges(
                project_id,
                vec![
                    GraphEdge {
                        id: GraphEdge::make_id("app", "user_controller", EdgeType::Imports),
                        source: "app".into(),
                        target: "user_controller".into(),
                        edge_type: EdgeType::Imports,
                        properties: Default::default(),
                    },
                    GraphEdge {
                        id: GraphEdge::make_id("user_controller", "auth_service", EdgeType::Imports),
                        source: "user_controller".into(),
                        target: "auth_service".into(),
                        edge_type: EdgeType::Imports,
                        properties: Default::default(),
                    },
                ],
            )
            .unwrap();

        let embedder = HashEmbeddingProvider::new(16);
        vector_text
            .upsert(ChunkDocument {
                id: ChunkDocument::make_id(project_id, "auth.ts", 0),
                project_id: project_id.to_string(),
                relative_path: "auth.ts".to_string(),
                content: "authenticate".to_string(),
                embedding: embedder.embed_one("authenticate").unwrap(),
                metadata: ChunkMetadata {
                    file_name: "auth.ts".into(),
                    extension: "ts".into(),
                    chunk_index: 0,
                    line_start: 1,
                    line_end: 1,
                    file_hash: "abc".into(),
                    indexed_at: Utc::now(),
                    chunk_type: "code".into(),
                },
            })
            .unwrap();

        (GraphAnalyzer { graph, vector_text }, "p1")
    }

    #[test]
    fn traversal_from_explicit_seed_reaches_two_hops() {
        let (analyzer, project_id) = setup();
        let query = RelationshipsQuery {
            filepaths: vec!["index.ts".to_string()],
            depth: 2,
            max_nodes: 50,
            direction: Direction::Out,
            ..Default::default()
        };
        let result = analyzer.relationships(project_id, query).unwrap();
        assert_eq!(result.stats.file_nodes, 3);
        assert!(!result.truncated);
    }

    #[test]
    fn unmatched_seed_lists_candidates() {
        let (analyzer, project_id) = setup();
        let query = RelationshipsQuery {
            filepaths: vec!["nowhere.ts".to_string()],
            depth: 1,
            max_nodes: 50,
            direction: Direction::Both,
            ..Default::default()
        };
        let err = analyzer.relationships(project_id, query).unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::NotFound);
    }

    #[test]
    fn max_nodes_stops_traversal_and_sets_truncated() {
        let (analyzer, project_id) = setup();
        let query = RelationshipsQuery {
            filepaths: vec!["index.ts".to_string()],
            depth: 3,
            max_nodes: 1,
            direction: Direction::Out,
            ..Default::default()
        };
        let result = analyzer.relationships(project_id, query).unwrap();
        assert!(result.truncated);
    }

    #[test]
    fn query_seed_resolves_via_hybrid_search() {
        let (analyzer, project_id) = setup();
        let query = RelationshipsQuery {
            query: Some("authenticate".to_string()),
            depth: 1,
            max_nodes: 50,
            direction: Direction::Both,
            ..Default::default()
        };
        let result = analyzer.relationships(project_id, query).unwrap();
        assert!(!result.seed_nodes.is_empty());
    }
}
