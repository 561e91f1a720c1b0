//! MCP stdio JSON-RPC surface: tool definitions, dispatch, and the stdio
//! read/respond loop, generalizing `mcp.rs::run_mcp`/`dispatch_jsonrpc`'s
//! shape unchanged onto the spec's tool surface (§6).
//!
//! Keeps the teacher's error-envelope convention verbatim: `isError` is
//! never set `true` on the JSON-RPC envelope, since that kills sibling tool
//! calls in Claude Code's client; failures are instead prefixed into the
//! text content so the calling agent can detect and recover from them.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{json, Value};
use tracing::info;

use crate::error::CodeSeekerError;
use crate::graph_analysis::RelationshipsQuery;
use crate::jobs::CancellationToken;
use crate::model::EdgeType;
use crate::safety::{compile_glob, validate_project_path};
use crate::search::{SearchFilters, SearchMode};
use crate::state::AppState;
use crate::store::graph::Direction;

const SUPPORTED_VERSIONS: &[&str] = &["2025-11-25", "2025-06-18"];
const LATEST_VERSION: &str = "2025-11-25";

fn negotiate_version(client_version: &str) -> &'static str {
    SUPPORTED_VERSIONS
        .iter()
        .find(|&&v| v == client_version)
        .copied()
        .unwrap_or(LATEST_VERSION)
}

fn tool_definitions() -> Value {
    let ro = json!({ "readOnlyHint": true, "destructiveHint": false, "idempotentHint": true, "openWorldHint": false });
    let mutating = json!({ "readOnlyHint": false, "destructiveHint": false, "idempotentHint": true, "openWorldHint": false });

    json!([
        {
            "name": "search",
            "annotations": ro,
            "description": "Hybrid semantic + full-text search over an indexed project. Use this first for discovery.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "query": { "type": "string" },
                    "project": { "type": "string", "description": "Project id or absolute path; omit if only one project is indexed" },
                    "limit": { "type": "integer", "description": "Default 10" },
                    "search_type": { "type": "string", "enum": ["hybrid", "fts", "vector", "graph"], "description": "Default hybrid" },
                    "mode": { "type": "string", "enum": ["full", "exists"], "description": "Default full" },
                    "language": { "type": "string" },
                    "path": { "type": "string", "description": "Substring the file's relative path must contain" },
                    "chunk_type": { "type": "string", "enum": ["class", "function", "interface", "code"], "description": "Filter to chunks classified as this kind" }
                },
                "required": ["query"]
            }
        },
        {
            "name": "search_and_read",
            "annotations": ro,
            "description": "Like search, but returns full file content for the top matches, deduped by file.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "query": { "type": "string" },
                    "project": { "type": "string" },
                    "limit": { "type": "integer" },
                    "max_files": { "type": "integer", "description": "Default 1, max 3" },
                    "max_lines": { "type": "integer", "description": "Per-file content cap. Default 500, max 1000" }
                },
                "required": ["query"]
            }
        },
        {
            "name": "read_with_context",
            "annotations": ro,
            "description": "Read a file plus up to 5 related chunks found via a query derived from its name and first meaningful lines.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "filepath": { "type": "string" },
                    "include_related": { "type": "boolean", "description": "Default true" },
                    "project": { "type": "string" }
                },
                "required": ["filepath"]
            }
        },
        {
            "name": "show_dependencies",
            "annotations": ro,
            "description": "Traverse the code knowledge graph from one or more seed files (or a query) to show imports/calls/contains relationships.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "filepath": { "type": "string" },
                    "filepaths": { "type": "array", "items": { "type": "string" } },
                    "query": { "type": "string" },
                    "depth": { "type": "integer", "description": "1-3, default 1" },
                    "direction": { "type": "string", "enum": ["in", "out", "both"], "description": "Default both" },
                    "relationship_types": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Filter to these edge types, e.g. [\"imports\"]; default all"
                    },
                    "max_nodes": { "type": "integer", "description": "Default 50" },
                    "project": { "type": "string" }
                }
            }
        },
        {
            "name": "projects",
            "annotations": ro,
            "description": "List all indexed projects with file/chunk counts and indexing status.",
            "inputSchema": { "type": "object", "properties": {} }
        },
        {
            "name": "index",
            "annotations": mutating,
            "description": "Start indexing a project. Returns immediately; indexing runs in the background.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "path": { "type": "string", "description": "Absolute path to the project root" },
                    "name": { "type": "string" }
                },
                "required": ["path"]
            }
        },
        {
            "name": "sync",
            "annotations": mutating,
            "description": "Incrementally re-index changed files, or trigger a full re-index.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "project": { "type": "string" },
                    "changes": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "type": { "type": "string", "enum": ["created", "modified", "deleted"] },
                                "path": { "type": "string" }
                            }
                        }
                    },
                    "full_reindex": { "type": "boolean", "description": "Default false" }
                }
            }
        },
        {
            "name": "exclude",
            "annotations": mutating,
            "description": "Manage the project's path-exclusion pattern set.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "action": { "type": "string", "enum": ["exclude", "include", "list"] },
                    "project": { "type": "string" },
                    "paths": { "type": "array", "items": { "type": "string" } },
                    "reason": { "type": "string" }
                },
                "required": ["action", "project"]
            }
        },
        {
            "name": "install_parsers",
            "annotations": ro,
            "description": "Report which language parsers are available in this build.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "languages": { "type": "array", "items": { "type": "string" } },
                    "list_available": { "type": "boolean" }
                }
            }
        },
        {
            "name": "find_duplicates",
            "annotations": ro,
            "description": "Not implemented by the core — duplicate detection is an external collaborator consuming this core's search/graph outputs.",
            "inputSchema": { "type": "object", "properties": { "project": { "type": "string" } } }
        },
        {
            "name": "find_dead_code",
            "annotations": ro,
            "description": "Not implemented by the core — dead-code analysis is an external collaborator consuming this core's graph outputs.",
            "inputSchema": { "type": "object", "properties": { "project": { "type": "string" } } }
        }
    ])
}

/// Dispatch one tool call, returning `(text, is_error)`. `is_error` governs
/// only whether the text is prefixed with a warning marker — never the
/// envelope's `isError` field.
fn handle_tool_call(state: &Arc<AppState>, name: &str, args: &Value) -> (String, bool) {
    let result = match name {
        "search" => handle_search(state, args),
        "search_and_read" => handle_search_and_read(state, args),
        "read_with_context" => handle_read_with_context(state, args),
        "show_dependencies" => handle_show_dependencies(state, args),
        "projects" => handle_projects(state),
        "index" => handle_index(state, args),
        "sync" => handle_sync(state, args),
        "exclude" => handle_exclude(state, args),
        "install_parsers" => handle_install_parsers(args),
        "find_duplicates" | "find_dead_code" => Ok(json!({
            "status": "not_implemented_by_core",
            "message": format!("{name} is not implemented by the core index; it consumes this server's search/graph outputs externally")
        })),
        _ => return (format!("unknown tool: {name}"), true),
    };

    match result {
        Ok(value) => (serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string()), false),
        Err(err) => (err.actionable(), true),
    }
}

fn handle_search(state: &Arc<AppState>, args: &Value) -> crate::error::Result<Value> {
    let query = args["query"].as_str().ok_or_else(|| CodeSeekerError::bad_input("`query` is required"))?;
    let project = args["project"].as_str();
    let limit = args["limit"].as_u64().unwrap_or(10) as usize;
    let mode = if args["mode"].as_str() == Some("exists") { SearchMode::Exists } else { SearchMode::Full };
    let filters = SearchFilters {
        language: args["language"].as_str().map(str::to_string),
        chunk_type: args["chunk_type"].as_str().map(str::to_string),
        file_path_substring: args["path"].as_str().map(str::to_string),
    };
    let response = state.search.search(query, project, limit, mode, &filters)?;
    Ok(json!({
        "query": query,
        "total_results": response.total,
        "truncated": response.truncated,
        "cached": response.cached,
        "results": response.results,
    }))
}

fn handle_search_and_read(state: &Arc<AppState>, args: &Value) -> crate::error::Result<Value> {
    let query = args["query"].as_str().ok_or_else(|| CodeSeekerError::bad_input("`query` is required"))?;
    let project = args["project"].as_str();
    let limit = args["max_files"].as_u64().unwrap_or(1).min(3) as usize;
    let max_lines = args["max_lines"].as_u64().unwrap_or(500).min(1000) as usize;
    let filters = SearchFilters::default();
    state.search.search_and_read(query, project, limit.max(1), max_lines.max(1), &filters)
}

fn handle_read_with_context(state: &Arc<AppState>, args: &Value) -> crate::error::Result<Value> {
    const MAX_CONTENT_CHARS: usize = 10_000;
    const MAX_RELATED: usize = 5;
    const MAX_RELATED_CHARS: usize = 300;

    let filepath = args["filepath"].as_str().ok_or_else(|| CodeSeekerError::bad_input("`filepath` is required"))?;
    let include_related = args["include_related"].as_bool().unwrap_or(true);
    let project_hint = args["project"].as_str();
    let project = state.projects.resolve(project_hint)?;

    let absolute = Path::new(&project.absolute_path).join(filepath);
    let content = std::fs::read_to_string(&absolute)
        .map_err(|e| CodeSeekerError::io(format!("failed to read {filepath}: {e}")))?;
    let (truncated_content, was_truncated) = if content.len() > MAX_CONTENT_CHARS {
        let mut s = content[..MAX_CONTENT_CHARS].to_string();
        s.push_str("\n... [truncated]");
        (s, true)
    } else {
        (content.clone(), false)
    };

    let mut related = Vec::new();
    if include_related {
        let file_name = Path::new(filepath).file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
        let meaningful_lines: Vec<&str> = content
            .lines()
            .filter(|l| {
                let t = l.trim();
                !t.is_empty()
                    && !t.starts_with("//")
                    && !t.starts_with('#')
                    && !t.starts_with("import ")
                    && !t.starts_with("using ")
                    && !t.starts_with("namespace ")
            })
            .take(5)
            .collect();
        let derived_query = format!("{file_name} {}", meaningful_lines.join(" "));

        let filters = SearchFilters::default();
        if let Ok(response) = state.search.search(&derived_query, project_hint, MAX_RELATED + 5, SearchMode::Full, &filters) {
            for item in response.results {
                if item.relative_path == filepath {
                    continue;
                }
                if related.len() >= MAX_RELATED {
                    break;
                }
                let mut snippet = item.content;
                if snippet.len() > MAX_RELATED_CHARS {
                    snippet.truncate(MAX_RELATED_CHARS);
                    snippet.push('\u{2026}');
                }
                related.push(json!({ "relativePath": item.relative_path, "snippet": snippet }));
            }
        }
    }

    Ok(json!({
        "filePath": filepath,
        "content": truncated_content,
        "truncated": was_truncated,
        "related": related,
    }))
}

fn handle_show_dependencies(state: &Arc<AppState>, args: &Value) -> crate::error::Result<Value> {
    let project_hint = args["project"].as_str();
    let project = state.projects.resolve(project_hint)?;

    let mut filepaths: Vec<String> = Vec::new();
    if let Some(fp) = args["filepath"].as_str() {
        filepaths.push(fp.to_string());
    }
    if let Some(arr) = args["filepaths"].as_array() {
        filepaths.extend(arr.iter().filter_map(|v| v.as_str()).map(str::to_string));
    }

    let direction = match args["direction"].as_str() {
        Some("in") => Direction::In,
        Some("out") => Direction::Out,
        _ => Direction::Both,
    };

    let types = args["relationship_types"].as_array().map(|arr| {
        arr.iter()
            .filter_map(|v| v.as_str())
            .filter_map(EdgeType::parse)
            .collect::<Vec<_>>()
    });

    let query = RelationshipsQuery {
        query: args["query"].as_str().map(str::to_string),
        filepaths,
        depth: args["depth"].as_u64().unwrap_or(1) as u8,
        types,
        direction,
        max_nodes: args["max_nodes"].as_u64().unwrap_or(50) as usize,
    };

    let result = state.graph_analysis.relationships(&project.id, query)?;
    serde_json::to_value(result).map_err(CodeSeekerError::from)
}

fn handle_projects(state: &Arc<AppState>) -> crate::error::Result<Value> {
    let projects: Vec<Value> = state
        .projects
        .list()
        .into_iter()
        .map(|p| {
            let job = state.jobs.get(&p.id);
            json!({
                "name": p.name,
                "path": p.absolute_path,
                "files": state.vector_text.count_files(&p.id),
                "chunks": state.vector_text.count(&p.id),
                "last_indexed": p.updated_at,
                "indexing_status": job.as_ref().map(|j| j.status),
                "indexing_progress": job.as_ref().map(|j| &j.progress),
            })
        })
        .collect();

    Ok(json!({
        "storage_mode": std::env::var("CODESEEKER_STORAGE_MODE").unwrap_or_else(|_| "embedded".to_string()),
        "total_projects": projects.len(),
        "projects": projects,
    }))
}

fn handle_index(state: &Arc<AppState>, args: &Value) -> crate::error::Result<Value> {
    let path = args["path"].as_str().ok_or_else(|| CodeSeekerError::bad_input("`path` is required"))?;
    let validated = validate_project_path(Path::new(path))?;
    let name = args["name"].as_str();
    let project = state.projects.get_or_create(&validated.to_string_lossy(), name)?;

    let token = match state.jobs.start(&project.id, &project.name, &project.absolute_path) {
        Ok(t) => t,
        Err(_) => {
            return Ok(json!({
                "status": "already_indexing",
                "project_name": project.name,
                "project_path": project.absolute_path,
                "message": "an index job is already running for this project",
            }))
        }
    };

    spawn_index_job(state.clone(), project.id.clone(), project.absolute_path.clone(), token);

    Ok(json!({
        "status": "indexing_started",
        "project_name": project.name,
        "project_path": project.absolute_path,
        "message": "indexing started in the background; poll `projects` for status",
    }))
}

fn spawn_index_job(state: Arc<AppState>, project_id: String, project_path: String, token: CancellationToken) {
    std::thread::spawn(move || {
        let root = PathBuf::from(&project_path);
        let exclusions = load_exclusion_matchers(&state.data_dir, &project_id);
        let jobs = state.jobs.clone();
        let result = state.indexing.index_project(&root, &project_id, &exclusions, &token, None);
        match result {
            Ok(r) if r.cancelled => jobs.fail(&project_id, "cancelled by user"),
            Ok(r) => {
                state.query_cache.invalidate_project(&project_id);
                jobs.complete(&project_id, serde_json::to_value(&r).unwrap_or(Value::Null));
            }
            Err(e) => jobs.fail(&project_id, e.actionable()),
        }
    });
}

fn load_exclusion_matchers(data_dir: &Path, project_id: &str) -> Vec<crate::safety::GlobMatcher> {
    let path = data_dir.join(project_id).join("exclusions.json");
    let set: crate::model::ExclusionPatternSet = crate::store::read_json_if_exists(&path).ok().flatten().unwrap_or_default();
    set.patterns.iter().filter_map(|p| compile_glob(&p.pattern).ok()).collect()
}

fn handle_sync(state: &Arc<AppState>, args: &Value) -> crate::error::Result<Value> {
    let project_hint = args["project"].as_str();
    let project = state.projects.resolve(project_hint)?;
    let full_reindex = args["full_reindex"].as_bool().unwrap_or(false);

    if full_reindex {
        let token = state.jobs.start(&project.id, &project.name, &project.absolute_path)?;
        spawn_index_job(state.clone(), project.id.clone(), project.absolute_path.clone(), token);
        return Ok(json!({ "status": "reindex_started", "project": project.id }));
    }

    let mut created = 0;
    let mut modified = 0;
    let mut deleted = 0;
    if let Some(changes) = args["changes"].as_array() {
        let root = PathBuf::from(&project.absolute_path);
        for change in changes {
            let change_type = change["type"].as_str().unwrap_or("");
            let Some(rel_path) = change["path"].as_str() else { continue };
            match change_type {
                "created" | "modified" => {
                    state.indexing.index_single_file(&root, rel_path, &project.id)?;
                    if change_type == "created" { created += 1 } else { modified += 1 }
                }
                "deleted" => {
                    state.indexing.delete_file(&project.id, rel_path)?;
                    deleted += 1;
                }
                _ => {}
            }
        }
    }
    state.query_cache.invalidate_project(&project.id);
    Ok(json!({ "created": created, "modified": modified, "deleted": deleted }))
}

fn handle_exclude(state: &Arc<AppState>, args: &Value) -> crate::error::Result<Value> {
    let action = args["action"].as_str().unwrap_or("list");
    let project_hint = args["project"].as_str().ok_or_else(|| CodeSeekerError::bad_input("`project` is required"))?;
    let project = state.projects.resolve(Some(project_hint))?;
    let paths: Vec<String> = args["paths"]
        .as_array()
        .map(|a| a.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
        .unwrap_or_default();

    let patterns = state.indexing.apply_exclusions(&project.id, &state.data_dir, &paths, action)?;
    state.query_cache.invalidate_project(&project.id);
    Ok(json!({ "patterns": patterns }))
}

fn handle_install_parsers(_args: &Value) -> crate::error::Result<Value> {
    let treesitter_enabled = cfg!(feature = "treesitter");
    Ok(json!({
        "treesitter_enabled": treesitter_enabled,
        "languages": ["rust", "typescript", "javascript", "python", "go", "c", "cpp", "java"],
        "note": if treesitter_enabled {
            "tree-sitter grammars are compiled in"
        } else {
            "built without the `treesitter` feature; falling back to regex-based extraction"
        }
    }))
}

/// Process a single JSON-RPC request and return the response, or `None` for
/// notifications. Caller is responsible for init-ordering enforcement.
pub fn dispatch_jsonrpc(state: &Arc<AppState>, msg: &Value) -> Option<Value> {
    let method = msg["method"].as_str().unwrap_or("");
    let id = msg.get("id").cloned();

    if id.is_none() || method.starts_with("notifications/") {
        return None;
    }

    let response = match method {
        "initialize" => {
            let client_version = msg["params"]["protocolVersion"].as_str().unwrap_or("");
            json!({
                "jsonrpc": "2.0",
                "id": id,
                "result": {
                    "protocolVersion": negotiate_version(client_version),
                    "capabilities": { "tools": { "listChanged": true } },
                    "serverInfo": { "name": "codeseeker", "version": env!("CARGO_PKG_VERSION") },
                    "instructions": "codeseeker — hybrid semantic/full-text/graph search over indexed repositories. Call `index` once per project, then `search` for discovery, `show_dependencies` for the code graph, `read_with_context` for a file plus related chunks."
                }
            })
        }
        "tools/list" => json!({ "jsonrpc": "2.0", "id": id, "result": { "tools": tool_definitions() } }),
        "tools/call" => {
            let tool_name = msg["params"]["name"].as_str().unwrap_or("");
            let arguments = msg["params"].get("arguments").cloned().unwrap_or_else(|| json!({}));
            let (text, is_error) = handle_tool_call(state, tool_name, &arguments);
            let content_text = if is_error { format!("\u{26a0} Error: {text}") } else { text };
            json!({
                "jsonrpc": "2.0",
                "id": id,
                "result": { "content": [{ "type": "text", "text": content_text }], "isError": false }
            })
        }
        "ping" => json!({ "jsonrpc": "2.0", "id": id, "result": {} }),
        _ => json!({ "jsonrpc": "2.0", "id": id, "error": { "code": -32601, "message": "Method not found" } }),
    };

    Some(response)
}

/// Run the MCP stdio server loop: read JSON-RPC from stdin, write responses
/// to stdout. Enforces init ordering (`-32002` before `initialize`) and
/// never panics on malformed input (`-32700` parse error instead).
pub fn run_mcp(state: Arc<AppState>) {
    let stdin = io::stdin();
    let stdout = io::stdout();
    let reader = stdin.lock();
    let mut initialized = false;

    info!(projects = state.projects.list().len(), "MCP server ready");

    for line in reader.lines() {
        let line = match line {
            Ok(l) => l,
            Err(_) => break,
        };
        if line.trim().is_empty() {
            continue;
        }

        let msg: Value = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(_) => {
                let err = json!({ "jsonrpc": "2.0", "id": null, "error": { "code": -32700, "message": "Parse error" } });
                write_line(&stdout, &err);
                continue;
            }
        };

        let method = msg["method"].as_str().unwrap_or("");
        if method == "notifications/initialized" || method == "notifications/cancelled" {
            continue;
        }

        if !initialized && method != "initialize" && method != "ping" {
            if let Some(id) = msg.get("id").cloned() {
                let err = json!({
                    "jsonrpc": "2.0",
                    "id": id,
                    "error": { "code": -32002, "message": "Server not initialized. Send 'initialize' first." }
                });
                write_line(&stdout, &err);
            }
            continue;
        }

        if let Some(response) = dispatch_jsonrpc(&state, &msg) {
            if method == "initialize" {
                initialized = true;
            }
            write_line(&stdout, &response);
        }
    }
}

fn write_line(stdout: &io::Stdout, value: &Value) {
    let mut out = stdout.lock();
    let _ = writeln!(out, "{}", value);
    let _ = out.flush();
}
