//! C7 Graph Store: typed nodes and directed edges with deterministic ids,
//! so duplicate upserts are no-ops.
//!
//! Generalizes `graph.rs::CodeGraph`'s `by_source`/`by_target`
//! adjacency-index pattern from untyped call/import edges into the spec's
//! typed `GraphNode`/`GraphEdge` model.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

use crate::error::Result;
use crate::model::{EdgeType, GraphEdge, GraphNode, NodeType};
use crate::store::{read_json_if_exists, write_json_atomic};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    In,
    Out,
    Both,
}

#[derive(Default)]
struct ProjectGraph {
    nodes: HashMap<String, GraphNode>,
    edges: HashMap<String, GraphEdge>,
    by_source: HashMap<String, Vec<String>>,
    by_target: HashMap<String, Vec<String>>,
}

impl ProjectGraph {
    fn insert_edge(&mut self, edge: GraphEdge) {
        if self.edges.contains_key(&edge.id) {
            return;
        }
        self.by_source.entry(edge.source.clone()).or_default().push(edge.id.clone());
        self.by_target.entry(edge.target.clone()).or_default().push(edge.id.clone());
        self.edges.insert(edge.id.clone(), edge);
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, Default)]
struct GraphSnapshot {
    nodes: Vec<GraphNode>,
    edges: Vec<GraphEdge>,
}

pub struct GraphStore {
    projects: RwLock<HashMap<String, ProjectGraph>>,
    data_dir: PathBuf,
}

impl GraphStore {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            projects: RwLock::new(HashMap::new()),
            data_dir,
        }
    }

    fn snapshot_path(&self, project_id: &str) -> PathBuf {
        self.data_dir.join(project_id).join("graph.json")
    }

    fn ensure_loaded(&self, project_id: &str) -> Result<()> {
        if self.projects.read().unwrap().contains_key(project_id) {
            return Ok(());
        }
        let mut graph = ProjectGraph::default();
        if let Some(snapshot) = read_json_if_exists::<GraphSnapshot>(&self.snapshot_path(project_id))? {
            for node in snapshot.nodes {
                graph.nodes.insert(node.id.clone(), node);
            }
            for edge in snapshot.edges {
                graph.insert_edge(edge);
            }
        }
        self.projects.write().unwrap().insert(project_id.to_string(), graph);
        Ok(())
    }

    pub fn upsert_node(&self, node: GraphNode) -> Result<()> {
        self.ensure_loaded(&node.project_id)?;
        let mut projects = self.projects.write().unwrap();
        let graph = projects.get_mut(&node.project_id).unwrap();
        graph.nodes.entry(node.id.clone()).or_insert(node);
        Ok(())
    }

    pub fn upsert_nodes(&self, nodes: Vec<GraphNode>) -> Result<()> {
        for node in nodes {
            self.upsert_node(node)?;
        }
        Ok(())
    }

    pub fn upsert_edge(&self, project_id: &str, edge: GraphEdge) -> Result<()> {
        self.ensure_loaded(project_id)?;
        let mut projects = self.projects.write().unwrap();
        projects.get_mut(project_id).unwrap().insert_edge(edge);
        Ok(())
    }

    pub fn upsert_edges(&self, project_id: &str, edges: Vec<GraphEdge>) -> Result<()> {
        self.ensure_loaded(project_id)?;
        let mut projects = self.projects.write().unwrap();
        let graph = projects.get_mut(project_id).unwrap();
        for edge in edges {
            graph.insert_edge(edge);
        }
        Ok(())
    }

    pub fn get_node(&self, project_id: &str, id: &str) -> Option<GraphNode> {
        self.ensure_loaded(project_id).ok()?;
        self.projects.read().unwrap().get(project_id)?.nodes.get(id).cloned()
    }

    pub fn find_nodes(&self, project_id: &str, node_type: Option<NodeType>) -> Vec<GraphNode> {
        let _ = self.ensure_loaded(project_id);
        self.projects
            .read()
            .unwrap()
            .get(project_id)
            .map(|g| {
                g.nodes
                    .values()
                    .filter(|n| node_type.map_or(true, |t| n.node_type == t))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn get_edges(&self, project_id: &str, node_id: &str, direction: Direction) -> Vec<GraphEdge> {
        let _ = self.ensure_loaded(project_id);
        let projects = self.projects.read().unwrap();
        let Some(graph) = projects.get(project_id) else { return Vec::new() };

        let mut ids: Vec<String> = Vec::new();
        if matches!(direction, Direction::Out | Direction::Both) {
            if let Some(v) = graph.by_source.get(node_id) {
                ids.extend(v.iter().cloned());
            }
        }
        if matches!(direction, Direction::In | Direction::Both) {
            if let Some(v) = graph.by_target.get(node_id) {
                ids.extend(v.iter().cloned());
            }
        }
        ids.sort();
        ids.dedup();
        ids.into_iter().filter_map(|id| graph.edges.get(&id).cloned()).collect()
    }

    pub fn get_neighbors(&self, project_id: &str, node_id: &str, edge_type: Option<EdgeType>) -> Vec<GraphNode> {
        let edges = self.get_edges(project_id, node_id, Direction::Both);
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        for edge in edges {
            if let Some(t) = edge_type {
                if edge.edge_type != t {
                    continue;
                }
            }
            let other = if edge.source == node_id { &edge.target } else { &edge.source };
            if seen.insert(other.clone()) {
                if let Some(n) = self.get_node(project_id, other) {
                    out.push(n);
                }
            }
        }
        out
    }

    pub fn delete_by_project(&self, project_id: &str) -> Result<()> {
        self.projects.write().unwrap().remove(project_id);
        let path = self.snapshot_path(project_id);
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }

    /// Best-effort per-file removal: drops nodes whose `file_path` equals
    /// `relative_path` and any edge touching them. Per spec §9's open
    /// question, this is not authoritative — a full re-index remains the
    /// only guaranteed-clean cleanup path.
    pub fn delete_file_subtree(&self, project_id: &str, relative_path: &str) -> Result<usize> {
        self.ensure_loaded(project_id)?;
        let mut projects = self.projects.write().unwrap();
        let Some(graph) = projects.get_mut(project_id) else { return Ok(0) };

        let dead: Vec<String> = graph
            .nodes
            .iter()
            .filter(|(_, n)| n.file_path == relative_path)
            .map(|(id, _)| id.clone())
            .collect();
        let removed = dead.len();
        for id in &dead {
            graph.nodes.remove(id);
        }
        let dead_set: std::collections::HashSet<&String> = dead.iter().collect();
        let dead_edges: Vec<String> = graph
            .edges
            .iter()
            .filter(|(_, e)| dead_set.contains(&e.source) || dead_set.contains(&e.target))
            .map(|(id, _)| id.clone())
            .collect();
        for id in dead_edges {
            if let Some(edge) = graph.edges.remove(&id) {
                if let Some(v) = graph.by_source.get_mut(&edge.source) {
                    v.retain(|e| e != &id);
                }
                if let Some(v) = graph.by_target.get_mut(&edge.target) {
                    v.retain(|e| e != &id);
                }
            }
        }
        Ok(removed)
    }

    pub fn flush(&self, project_id: &str) -> Result<()> {
        let projects = self.projects.read().unwrap();
        let Some(graph) = projects.get(project_id) else { return Ok(()) };
        let snapshot = GraphSnapshot {
            nodes: graph.nodes.values().cloned().collect(),
            edges: graph.edges.values().cloned().collect(),
        };
        write_json_atomic(&self.snapshot_path(project_id), &snapshot)
    }

    pub fn flush_all(&self) -> Result<()> {
        let ids: Vec<String> = self.projects.read().unwrap().keys().cloned().collect();
        for id in ids {
            self.flush(&id)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, project: &str, node_type: NodeType, file_path: &str) -> GraphNode {
        GraphNode {
            id: id.to_string(),
            node_type,
            name: id.to_string(),
            file_path: file_path.to_string(),
            project_id: project.to_string(),
            properties: Default::default(),
        }
    }

    #[test]
    fn upsert_node_is_idempotent() {
        let store = GraphStore::new(std::env::temp_dir().join("cs-graph-1"));
        let n = node("f1", "p", NodeType::File, "a.rs");
        store.upsert_node(n.clone()).unwrap();
        store.upsert_node(n).unwrap();
        assert_eq!(store.find_nodes("p", None).len(), 1);
    }

    #[test]
    fn upsert_edge_is_idempotent_by_deterministic_id() {
        let store = GraphStore::new(std::env::temp_dir().join("cs-graph-2"));
        store.upsert_node(node("a", "p", NodeType::File, "a.rs")).unwrap();
        store.upsert_node(node("b", "p", NodeType::File, "b.rs")).unwrap();
        let edge = GraphEdge {
            id: GraphEdge::make_id("a", "b", EdgeType::Imports),
            source: "a".to_string(),
            target: "b".to_string(),
            edge_type: EdgeType::Imports,
            properties: Default::default(),
        };
        store.upsert_edge("p", edge.clone()).unwrap();
        store.upsert_edge("p", edge).unwrap();
        assert_eq!(store.get_edges("p", "a", Direction::Out).len(), 1);
    }

    #[test]
    fn traversal_output_endpoints_are_consistent() {
        let store = GraphStore::new(std::env::temp_dir().join("cs-graph-3"));
        store.upsert_node(node("app", "p", NodeType::File, "index.ts")).unwrap();
        store.upsert_node(node("user_controller", "p", NodeType::File, "user.ts")).unwrap();
        store.upsert_node(node("auth_service", "p", NodeType::File, "auth.ts")).unwrap();
        store
            .upsert_edges(
                "p",
                vec![
                    GraphEdge {
                        id: GraphEdge::make_id("app", "user_controller", EdgeType::Imports),
                        source: "app".into(),
                        target: "user_controller".into(),
                        edge_type: EdgeType::Imports,
                        properties: Default::default(),
                    },
                    GraphEdge {
                        id: GraphEdge::make_id("app", "auth_service", EdgeType::Imports),
                        source: "app".into(),
                        target: "auth_service".into(),
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

        let out_edges = store.get_edges("p", "app", Direction::Out);
        assert_eq!(out_edges.len(), 2);
    }

    #[test]
    fn delete_file_subtree_removes_nodes_and_edges() {
        let store = GraphStore::new(std::env::temp_dir().join("cs-graph-4"));
        store.upsert_node(node("a", "p", NodeType::File, "a.rs")).unwrap();
        store.upsert_node(node("b", "p", NodeType::File, "b.rs")).unwrap();
        store
            .upsert_edge(
                "p",
                GraphEdge {
                    id: GraphEdge::make_id("a", "b", EdgeType::Imports),
                    source: "a".into(),
                    target: "b".into(),
                    edge_type: EdgeType::Imports,
                    properties: Default::default(),
                },
            )
            .unwrap();
        let removed = store.delete_file_subtree("p", "a.rs").unwrap();
        assert_eq!(removed, 1);
        assert!(store.get_edges("p", "a", Direction::Out).is_empty());
    }
}
