//! Structured error type for the core, grounded on
//! `codegraph-storage/src/error.rs`'s `ErrorKind` + wrapper-struct pattern.

use thiserror::Error;

/// Classifies a `CodeSeekerError` so MCP tool handlers can decide whether to
/// retry, ask the caller to `index` first, or refuse outright. Maps 1:1 onto
/// spec §7's seven error kinds, split where a kind needs a dedicated variant
/// (`AmbiguousProject` vs `NotIndexed`, `AlreadyIndexing` vs `Cancelled`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    BadInput,
    NotIndexed,
    AmbiguousProject,
    DangerousPath,
    Io,
    Serialization,
    AlreadyIndexing,
    Cancelled,
    NotFound,
    Embedding,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::BadInput => "bad_input",
            ErrorKind::NotIndexed => "not_indexed",
            ErrorKind::AmbiguousProject => "ambiguous_project",
            ErrorKind::DangerousPath => "dangerous_path",
            ErrorKind::Io => "io",
            ErrorKind::Serialization => "serialization",
            ErrorKind::AlreadyIndexing => "already_indexing",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Embedding => "embedding",
        }
    }

    /// Hint a tool handler can fold into its response text so the calling
    /// agent knows what to try next, per spec §7's "actionable error" rule.
    pub fn next_action(&self) -> &'static str {
        match self {
            ErrorKind::BadInput => "fix the request arguments and retry",
            ErrorKind::NotIndexed => "call `index` for this project first",
            ErrorKind::AmbiguousProject => "pass an explicit `project` id from `projects`",
            ErrorKind::DangerousPath => "request refused; path is outside allowed project roots",
            ErrorKind::Io => "check filesystem permissions and retry",
            ErrorKind::Serialization => "stored data is unreadable; consider a full re-index",
            ErrorKind::AlreadyIndexing => "an index job is already running for this project",
            ErrorKind::Cancelled => "the job was cancelled; call `index` again if needed",
            ErrorKind::NotFound => "the requested id does not exist",
            ErrorKind::Embedding => "embedding provider unavailable; retry or check model setup",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("[{kind}] {message}")]
pub struct CodeSeekerError {
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
    pub kind: ErrorKind,
    pub message: String,
}

impl CodeSeekerError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn bad_input(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadInput, message)
    }

    pub fn not_indexed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotIndexed, message)
    }

    pub fn ambiguous_project(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::AmbiguousProject, message)
    }

    pub fn dangerous_path(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::DangerousPath, message)
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Io, message)
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Serialization, message)
    }

    pub fn already_indexing(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::AlreadyIndexing, message)
    }

    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Cancelled, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn embedding(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Embedding, message)
    }

    /// Render `"{message} ({next_action})"` — the shape MCP tool handlers
    /// fold into their response text rather than the JSON-RPC error envelope.
    pub fn actionable(&self) -> String {
        format!("{} ({})", self.message, self.kind.next_action())
    }
}

impl From<std::io::Error> for CodeSeekerError {
    fn from(err: std::io::Error) -> Self {
        CodeSeekerError::io(err.to_string()).with_source(err)
    }
}

impl From<serde_json::Error> for CodeSeekerError {
    fn from(err: serde_json::Error) -> Self {
        CodeSeekerError::serialization(format!("JSON error: {err}")).with_source(err)
    }
}

impl From<toml::de::Error> for CodeSeekerError {
    fn from(err: toml::de::Error) -> Self {
        CodeSeekerError::serialization(format!("TOML error: {err}")).with_source(err)
    }
}

pub type Result<T> = std::result::Result<T, CodeSeekerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_kind_and_message() {
        let err = CodeSeekerError::not_indexed("project foo has no index");
        let msg = format!("{err}");
        assert_eq!(msg, "[not_indexed] project foo has no index");
    }

    #[test]
    fn actionable_appends_next_action() {
        let err = CodeSeekerError::ambiguous_project("multiple projects match");
        assert!(err.actionable().contains("pass an explicit `project` id"));
    }

    #[test]
    fn io_conversion_preserves_source() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: CodeSeekerError = io_err.into();
        assert_eq!(err.kind, ErrorKind::Io);
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn json_conversion_is_serialization_kind() {
        let json_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err: CodeSeekerError = json_err.into();
        assert_eq!(err.kind, ErrorKind::Serialization);
    }
}
