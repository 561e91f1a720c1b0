//! Data model types shared across stores (spec §3). Grounded on
//! `types.rs`'s per-repo state structs, generalized from an ad-hoc manifest
//! shape into the typed records this system persists.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single indexed repository. `id` is content-derived (MD5 of the
/// canonical absolute path, see `hasher::project_id`) and never changes
/// across re-indexes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub absolute_path: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

/// Unit stored in the vector+text store (C6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkDocument {
    /// `{projectId}:{relativePath}:{chunkIndex}` — uniquely identifies a
    /// chunk within a project; re-upsert with the same id overwrites.
    pub id: String,
    pub project_id: String,
    pub relative_path: String,
    pub content: String,
    pub embedding: Vec<f32>,
    pub metadata: ChunkMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub file_name: String,
    pub extension: String,
    pub chunk_index: usize,
    pub line_start: usize,
    pub line_end: usize,
    pub file_hash: String,
    pub indexed_at: DateTime<Utc>,
    /// One of `"class"`, `"function"`, `"interface"`, `"code"` — derived
    /// from whether a parsed class/function/interface name from the file's
    /// `ParsedStructure` appears in this chunk's content. Old persisted
    /// chunks without this field default to `"code"`.
    #[serde(default = "default_chunk_type")]
    pub chunk_type: String,
}

fn default_chunk_type() -> String {
    "code".to_string()
}

impl ChunkDocument {
    pub fn make_id(project_id: &str, relative_path: &str, chunk_index: usize) -> String {
        format!("{project_id}:{relative_path}:{chunk_index}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    File,
    Class,
    Function,
    Method,
    Module,
}

impl NodeType {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeType::File => "file",
            NodeType::Class => "class",
            NodeType::Function => "function",
            NodeType::Method => "method",
            NodeType::Module => "module",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub name: String,
    pub file_path: String,
    pub project_id: String,
    #[serde(default)]
    pub properties: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeType {
    Contains,
    Imports,
    Exports,
    Calls,
    Extends,
    Implements,
    Uses,
    DependsOn,
}

impl EdgeType {
    pub fn as_str(self) -> &'static str {
        match self {
            EdgeType::Contains => "contains",
            EdgeType::Imports => "imports",
            EdgeType::Exports => "exports",
            EdgeType::Calls => "calls",
            EdgeType::Extends => "extends",
            EdgeType::Implements => "implements",
            EdgeType::Uses => "uses",
            EdgeType::DependsOn => "depends_on",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "contains" => Some(EdgeType::Contains),
            "imports" => Some(EdgeType::Imports),
            "exports" => Some(EdgeType::Exports),
            "calls" => Some(EdgeType::Calls),
            "extends" => Some(EdgeType::Extends),
            "implements" => Some(EdgeType::Implements),
            "uses" => Some(EdgeType::Uses),
            "depends_on" => Some(EdgeType::DependsOn),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub edge_type: EdgeType,
    #[serde(default)]
    pub properties: HashMap<String, serde_json::Value>,
}

impl GraphEdge {
    /// Deterministic edge id so re-upsert is idempotent.
    pub fn make_id(source: &str, target: &str, edge_type: EdgeType) -> String {
        format!("{source}--{}-->{target}", edge_type.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub query_hash: String,
    pub project_id: String,
    pub results: serde_json::Value,
    pub cached_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Running,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobProgress {
    pub phase: String,
    pub files_processed: usize,
    pub files_total: usize,
    pub chunks_created: usize,
    pub nodes_created: usize,
    pub edges_created: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_warning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scanning_status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexingJob {
    pub project_id: String,
    pub project_name: String,
    pub project_path: String,
    pub status: JobStatus,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub progress: JobProgress,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExclusionPattern {
    pub pattern: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub added_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExclusionPatternSet {
    pub patterns: Vec<ExclusionPattern>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_id_format() {
        let id = ChunkDocument::make_id("proj1", "src/a.rs", 2);
        assert_eq!(id, "proj1:src/a.rs:2");
    }

    #[test]
    fn edge_id_is_deterministic() {
        let a = GraphEdge::make_id("n1", "n2", EdgeType::Imports);
        let b = GraphEdge::make_id("n1", "n2", EdgeType::Imports);
        assert_eq!(a, b);
        let c = GraphEdge::make_id("n1", "n2", EdgeType::Calls);
        assert_ne!(a, c);
    }

    #[test]
    fn edge_type_roundtrips_through_str() {
        for t in [
            EdgeType::Contains,
            EdgeType::Imports,
            EdgeType::Exports,
            EdgeType::Calls,
            EdgeType::Extends,
            EdgeType::Implements,
            EdgeType::Uses,
            EdgeType::DependsOn,
        ] {
            assert_eq!(EdgeType::parse(t.as_str()), Some(t));
        }
    }
}
