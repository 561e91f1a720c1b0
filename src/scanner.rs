//! C4 File Scanner: walk a project, apply exclusions, return indexable files.
//!
//! Generalizes `scan.rs::walk_files_parallel`'s `ignore::WalkBuilder` +
//! parallel filter-entry idiom to the spec's fixed skip-directory set, user
//! exclusion globs (C15), extension allowlist, and coarse progress callback.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use ignore::WalkBuilder;
use once_cell::sync::Lazy;

use crate::safety::GlobMatcher;

/// Directories excluded at any depth regardless of user configuration.
pub static DEFAULT_SKIP_DIRS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "node_modules",
        "vendor",
        ".git",
        "dist",
        "build",
        "out",
        "target",
        "bin",
        "obj",
        "__pycache__",
        "Library",
        "Temp",
    ]
    .into_iter()
    .collect()
});

/// Extensions the scanner considers indexable: code plus common config/doc
/// formats, matching the parser registry's supported languages.
pub static DEFAULT_EXTENSIONS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "rs", "ts", "tsx", "js", "jsx", "mjs", "cjs", "py", "pyi", "go", "c", "h", "cpp", "cc",
        "cxx", "hpp", "hh", "hxx", "java", "cs", "json", "toml", "yaml", "yml", "md", "txt",
    ]
    .into_iter()
    .collect()
});

#[derive(Debug, Clone, Default)]
pub struct ScanProgress {
    pub folders_scanned: usize,
    pub files_found: usize,
    pub current_folder: String,
}

pub type ProgressFn<'a> = dyn Fn(ScanProgress) + Send + Sync + 'a;

/// `scan(root, onProgress) -> [relativePath]`. Never follows symlinks; skips
/// unreadable directories silently; drops files whose stat fails.
pub fn scan(
    root: &Path,
    extensions: &HashSet<String>,
    exclusions: &[GlobMatcher],
    on_progress: Option<&ProgressFn>,
) -> Vec<String> {
    let results: Mutex<Vec<String>> = Mutex::new(Vec::new());
    let folders_seen = AtomicUsize::new(0);
    let files_found = AtomicUsize::new(0);

    let ext_filter: Option<&HashSet<String>> = if extensions.is_empty() { None } else { Some(extensions) };

    WalkBuilder::new(root)
        .hidden(true)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .follow_links(false)
        .threads(rayon::current_num_threads().min(12))
        .filter_entry(|entry| {
            if entry.file_type().is_some_and(|ft| ft.is_dir()) {
                let name = entry.file_name().to_string_lossy();
                return !DEFAULT_SKIP_DIRS.contains(name.as_ref());
            }
            true
        })
        .build_parallel()
        .run(|| {
            Box::new(|entry| {
                let entry = match entry {
                    Ok(e) => e,
                    Err(_) => return ignore::WalkState::Continue,
                };

                if entry.file_type().is_some_and(|ft| ft.is_dir()) {
                    let n = folders_seen.fetch_add(1, Ordering::Relaxed) + 1;
                    if n % 10 == 0 {
                        if let Some(cb) = on_progress {
                            cb(ScanProgress {
                                folders_scanned: n,
                                files_found: files_found.load(Ordering::Relaxed),
                                current_folder: entry.path().to_string_lossy().to_string(),
                            });
                        }
                    }
                    return ignore::WalkState::Continue;
                }

                if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                    return ignore::WalkState::Continue;
                }

                let abs_path = entry.path().to_path_buf();
                if abs_path.symlink_metadata().map(|m| m.is_symlink()).unwrap_or(true)
                    && abs_path.metadata().is_err()
                {
                    return ignore::WalkState::Continue;
                }

                let ext = abs_path.extension().and_then(|e| e.to_str()).unwrap_or("");
                if let Some(exts) = ext_filter {
                    if !exts.contains(ext) {
                        return ignore::WalkState::Continue;
                    }
                }

                let rel_path = match abs_path.strip_prefix(root) {
                    Ok(p) => p.to_string_lossy().replace('\\', "/"),
                    Err(_) => return ignore::WalkState::Continue,
                };

                if exclusions.iter().any(|m| m.is_match(&rel_path)) {
                    return ignore::WalkState::Continue;
                }

                files_found.fetch_add(1, Ordering::Relaxed);
                results.lock().unwrap().push(rel_path);
                ignore::WalkState::Continue
            })
        });

    let mut out = results.into_inner().unwrap();
    out.sort();
    out
}

pub fn default_extensions() -> HashSet<String> {
    DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect()
}

pub fn resolve(root: &Path, relative_path: &str) -> PathBuf {
    root.join(relative_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn scan_finds_included_files_and_skips_excluded_dirs() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("main.rs"), "fn main() {}").unwrap();
        fs::create_dir(dir.path().join("node_modules")).unwrap();
        fs::write(dir.path().join("node_modules/lib.js"), "ignored").unwrap();

        let files = scan(dir.path(), &default_extensions(), &[], None);
        assert!(files.contains(&"main.rs".to_string()));
        assert!(!files.iter().any(|f| f.starts_with("node_modules")));
    }

    #[test]
    fn scan_applies_user_exclusion_globs() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("Library")).unwrap();
        fs::write(dir.path().join("Library/Cache.cs"), "// cache").unwrap();
        fs::write(dir.path().join("App.cs"), "// app").unwrap();

        let matcher = crate::safety::compile_glob("Library/**").unwrap();
        let files = scan(dir.path(), &default_extensions(), std::slice::from_ref(&matcher), None);
        assert!(files.contains(&"App.cs".to_string()));
        assert!(!files.contains(&"Library/Cache.cs".to_string()));
    }

    #[test]
    fn scan_respects_extension_filter() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.rs"), "fn a() {}").unwrap();
        fs::write(dir.path().join("a.bin"), vec![0u8, 1, 2]).unwrap();

        let mut exts = HashSet::new();
        exts.insert("rs".to_string());
        let files = scan(dir.path(), &exts, &[], None);
        assert_eq!(files, vec!["a.rs".to_string()]);
    }
}
