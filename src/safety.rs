//! C15 Path Safety & Exclusion Matcher.
//!
//! `validate_project_path` generalizes `types.rs::validate_path`'s
//! traversal/containment check with an OS-sensitive and secrets-directory
//! denylist. `compile_glob` hand-implements the escape -> `**` -> `*` -> `?`
//! substitution the data model's `ExclusionPatternSet` glob semantics call
//! for, using the `regex` crate already in the teacher's dependency set
//! rather than adding a glob-matching crate.

use std::path::{Path, PathBuf};

use regex::Regex;

use crate::error::{CodeSeekerError, Result};

const SENSITIVE_ROOTS: &[&str] = &[
    "/etc", "/var", "/usr", "/bin", "/sbin", "/lib", "/boot", "/root", "/proc", "/sys", "/dev",
];

const SENSITIVE_ROOTS_WINDOWS: &[&str] = &["c:\\windows", "c:\\program files", "c:\\programdata"];

const SECRET_DIRS: &[&str] = &[".ssh", ".gnupg", ".aws"];

/// Reject paths with `..` components, paths under an OS-sensitive root, or
/// paths under a user-secrets directory at any depth.
pub fn validate_project_path(p: &Path) -> Result<PathBuf> {
    for component in p.components() {
        if component.as_os_str() == ".." {
            return Err(CodeSeekerError::dangerous_path(format!(
                "path traversal rejected: {}",
                p.display()
            )));
        }
    }

    let lower = p.to_string_lossy().to_lowercase();
    for root in SENSITIVE_ROOTS {
        if lower == *root || lower.starts_with(&format!("{root}/")) {
            return Err(CodeSeekerError::dangerous_path(format!(
                "refusing to operate under system directory {root}"
            )));
        }
    }
    for root in SENSITIVE_ROOTS_WINDOWS {
        if lower.starts_with(root) {
            return Err(CodeSeekerError::dangerous_path(format!(
                "refusing to operate under system directory {root}"
            )));
        }
    }
    for secret in SECRET_DIRS {
        if p.components().any(|c| c.as_os_str() == *secret) {
            return Err(CodeSeekerError::dangerous_path(format!(
                "refusing to operate under secrets directory {secret}"
            )));
        }
    }

    Ok(p.to_path_buf())
}

/// A compiled exclusion glob pattern.
pub struct GlobMatcher {
    regex: Regex,
    /// True when the original pattern contained a `/`, anchoring it at the
    /// path start rather than allowing a match at any `/` boundary.
    anchored: bool,
}

impl GlobMatcher {
    pub fn is_match(&self, rel_path: &str) -> bool {
        let normalized = rel_path.replace('\\', "/");
        if self.anchored {
            self.regex.is_match(&normalized)
        } else {
            // Unanchored patterns match at the path start or at any `/` boundary.
            self.regex.is_match(&normalized)
                || normalized
                    .match_indices('/')
                    .any(|(i, _)| self.regex.is_match(&normalized[i + 1..]))
        }
    }
}

/// Compile a glob pattern per the data model's semantics: `**` matches any
/// path including `/`; `*` matches any non-`/` run; `?` matches any one
/// character; a pattern without a leading `**/` anchors at the path start or
/// a `/` boundary (handled by `GlobMatcher::is_match`, not the regex itself).
pub fn compile_glob(pattern: &str) -> Result<GlobMatcher> {
    let anchored = pattern.contains('/');
    let mut out = String::from("^");
    let mut chars = pattern.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            // Escape everything regex-special first so literal punctuation
            // in the glob doesn't leak into the regex.
            '.' | '+' | '(' | ')' | '|' | '^' | '$' | '[' | ']' | '{' | '}' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            '*' => {
                if chars.peek() == Some(&'*') {
                    chars.next();
                    // `**/` collapses to "zero or more path segments".
                    if chars.peek() == Some(&'/') {
                        chars.next();
                        out.push_str("(?:.*/)?");
                    } else {
                        out.push_str(".*");
                    }
                } else {
                    out.push_str("[^/]*");
                }
            }
            '?' => out.push('.'),
            other => out.push(other),
        }
    }
    out.push('$');

    let regex = Regex::new(&out)
        .map_err(|e| CodeSeekerError::bad_input(format!("invalid exclusion pattern: {e}")))?;
    Ok(GlobMatcher { regex, anchored })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_traversal() {
        assert!(validate_project_path(Path::new("/home/user/../etc/passwd")).is_err());
    }

    #[test]
    fn rejects_system_directory() {
        assert!(validate_project_path(Path::new("/etc/passwd")).is_err());
    }

    #[test]
    fn rejects_secrets_directory_at_any_depth() {
        assert!(validate_project_path(Path::new("/home/user/.ssh/id_rsa")).is_err());
        assert!(validate_project_path(Path::new("/home/user/project/.aws/credentials")).is_err());
    }

    #[test]
    fn accepts_ordinary_project_path() {
        assert!(validate_project_path(Path::new("/home/user/projects/myapp")).is_ok());
    }

    #[test]
    fn double_star_matches_any_depth() {
        let m = compile_glob("Library/**").unwrap();
        assert!(m.is_match("Library/PluginCache.cs"));
        assert!(m.is_match("Library/nested/deep/file.cs"));
        assert!(!m.is_match("src/Library.cs"));
    }

    #[test]
    fn single_star_does_not_cross_slash() {
        // `*.log` has no leading `**/`, so it's unanchored: gitignore-style,
        // it matches `app.log` at any path boundary, same as
        // `double_star_matches_any_depth`'s "any depth" semantics.
        let m = compile_glob("*.log").unwrap();
        assert!(m.is_match("app.log"));
        assert!(m.is_match("logs/app.log"));

        // What "does not cross slash" actually constrains is `*` itself: it
        // only consumes one path segment, so it can't stand in for a `/`.
        let m = compile_glob("a*b.log").unwrap();
        assert!(m.is_match("ab.log"));
        assert!(!m.is_match("a/b.log"));
    }

    #[test]
    fn question_mark_matches_one_char() {
        let m = compile_glob("file?.txt").unwrap();
        assert!(m.is_match("file1.txt"));
        assert!(!m.is_match("file12.txt"));
    }
}
