//! Ambient configuration (§2.3): `.codeseeker.toml` project overrides plus
//! environment variables, following the teacher's `ScanConfig`/
//! `.codescope.toml` convention (`types.rs`, `init.rs`).

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::embedding::ModelPreset;
use crate::error::Result;

const CONFIG_FILE_NAME: &str = ".codeseeker.toml";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub extensions: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default)]
    pub embedding_model: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub extensions: Vec<String>,
    pub exclude: Vec<String>,
    pub embedding_model: ModelPreset,
    pub storage_mode: String,
    pub data_dir: PathBuf,
}

impl Config {
    /// Loads `.codeseeker.toml` from `project_root` if present, overlaid with
    /// `CODESEEKER_STORAGE_MODE` / `CODESEEKER_DATA_DIR` environment
    /// variables. Missing or unreadable config files fall back to defaults
    /// rather than erroring — a malformed project file must not block startup.
    pub fn load(project_root: &Path) -> Result<Self> {
        let path = project_root.join(CONFIG_FILE_NAME);
        let file_config = std::fs::read_to_string(&path)
            .ok()
            .and_then(|content| toml::from_str::<FileConfig>(&content).ok())
            .unwrap_or_default();

        let embedding_model = file_config
            .embedding_model
            .as_deref()
            .and_then(ModelPreset::parse)
            .unwrap_or_default();

        let storage_mode = std::env::var("CODESEEKER_STORAGE_MODE").unwrap_or_else(|_| "embedded".to_string());
        let data_dir = std::env::var("CODESEEKER_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_data_dir());

        Ok(Self {
            extensions: file_config.extensions,
            exclude: file_config.exclude,
            embedding_model,
            storage_mode,
            data_dir,
        })
    }
}

/// `~/.codeseeker` (or `%APPDATA%/codeseeker` on Windows), mirroring the
/// teacher's `config_dir()`/`data_dir()` helpers.
pub fn default_data_dir() -> PathBuf {
    if let Some(dir) = dirs_home() {
        dir.join(".codeseeker")
    } else {
        PathBuf::from(".codeseeker")
    }
}

fn dirs_home() -> Option<PathBuf> {
    #[cfg(unix)]
    {
        std::env::var_os("HOME").map(PathBuf::from)
    }
    #[cfg(windows)]
    {
        std::env::var_os("USERPROFILE").map(PathBuf::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_config_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.storage_mode, "embedded");
        assert_eq!(config.embedding_model, ModelPreset::MiniLm);
    }

    #[test]
    fn config_file_overrides_embedding_model() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".codeseeker.toml"), "embedding_model = \"bge-small\"\n").unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.embedding_model, ModelPreset::BgeSmall);
    }

    #[test]
    fn malformed_config_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".codeseeker.toml"), "not valid toml =====").unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.embedding_model, ModelPreset::MiniLm);
    }
}
