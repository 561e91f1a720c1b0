//! C9 Project Store: project identity, path, metadata, timestamps.
//!
//! Generalizes `types.rs::RepoState`/`ServerState` (one entry per repo,
//! `BTreeMap`-keyed) into a persisted `Project` registry.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::RwLock;

use chrono::Utc;

use crate::error::{CodeSeekerError, Result};
use crate::hasher::project_id;
use crate::model::Project;
use crate::store::{read_json_if_exists, write_json_atomic};

pub struct ProjectStore {
    projects: RwLock<BTreeMap<String, Project>>,
    registry_path: PathBuf,
}

impl ProjectStore {
    pub fn new(data_dir: PathBuf) -> Result<Self> {
        let registry_path = data_dir.join("projects.json");
        let loaded: Vec<Project> = read_json_if_exists(&registry_path)?.unwrap_or_default();
        let projects = loaded.into_iter().map(|p| (p.id.clone(), p)).collect();
        Ok(Self {
            projects: RwLock::new(projects),
            registry_path,
        })
    }

    /// Create, or return the existing, project for `absolute_path`. Ids are
    /// content-derived from the path, so re-indexing never changes them.
    pub fn get_or_create(&self, absolute_path: &str, name: Option<&str>) -> Result<Project> {
        let id = project_id(absolute_path);
        {
            let projects = self.projects.read().unwrap();
            if let Some(p) = projects.get(&id) {
                return Ok(p.clone());
            }
        }
        let now = Utc::now();
        let project = Project {
            id: id.clone(),
            name: name
                .map(|s| s.to_string())
                .unwrap_or_else(|| derive_name(absolute_path)),
            absolute_path: absolute_path.to_string(),
            created_at: now,
            updated_at: now,
            metadata: Default::default(),
        };
        self.projects.write().unwrap().insert(id, project.clone());
        self.flush()?;
        Ok(project)
    }

    pub fn get(&self, id: &str) -> Option<Project> {
        self.projects.read().unwrap().get(id).cloned()
    }

    pub fn find_by_path(&self, absolute_path: &str) -> Option<Project> {
        self.projects
            .read()
            .unwrap()
            .values()
            .find(|p| p.absolute_path == absolute_path)
            .cloned()
    }

    pub fn list(&self) -> Vec<Project> {
        self.projects.read().unwrap().values().cloned().collect()
    }

    pub fn touch(&self, id: &str) -> Result<()> {
        let mut projects = self.projects.write().unwrap();
        if let Some(p) = projects.get_mut(id) {
            p.updated_at = Utc::now();
        }
        drop(projects);
        self.flush()
    }

    pub fn delete(&self, id: &str) -> Result<()> {
        self.projects.write().unwrap().remove(id);
        self.flush()
    }

    /// Resolve an optional `project` argument (id or absolute path) against
    /// the registry, per spec §4.8's ambiguous/not-indexed resolution.
    pub fn resolve(&self, project_hint: Option<&str>) -> Result<Project> {
        let projects = self.projects.read().unwrap();
        match project_hint {
            Some(hint) => projects
                .get(hint)
                .cloned()
                .or_else(|| projects.values().find(|p| p.absolute_path == hint).cloned())
                .ok_or_else(|| CodeSeekerError::not_indexed(format!("no indexed project matches {hint}"))),
            None => {
                if projects.len() == 1 {
                    Ok(projects.values().next().unwrap().clone())
                } else if projects.is_empty() {
                    Err(CodeSeekerError::not_indexed("no project has been indexed yet"))
                } else {
                    let candidates: Vec<String> = projects.values().map(|p| p.name.clone()).collect();
                    Err(CodeSeekerError::ambiguous_project(format!(
                        "multiple projects indexed, pass `project` explicitly: {}",
                        candidates.join(", ")
                    )))
                }
            }
        }
    }

    fn flush(&self) -> Result<()> {
        let projects: Vec<Project> = self.projects.read().unwrap().values().cloned().collect();
        write_json_atomic(&self.registry_path, &projects)
    }
}

fn derive_name(absolute_path: &str) -> String {
    PathBuf::from(absolute_path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| absolute_path.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_or_create_is_idempotent_by_path() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProjectStore::new(dir.path().to_path_buf()).unwrap();
        let a = store.get_or_create("/home/user/repo", None).unwrap();
        let b = store.get_or_create("/home/user/repo", None).unwrap();
        assert_eq!(a.id, b.id);
        assert_eq!(store.list().len(), 1);
    }

    #[test]
    fn resolve_single_project_needs_no_hint() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProjectStore::new(dir.path().to_path_buf()).unwrap();
        store.get_or_create("/home/user/repo", None).unwrap();
        assert!(store.resolve(None).is_ok());
    }

    #[test]
    fn resolve_multiple_projects_without_hint_is_ambiguous() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProjectStore::new(dir.path().to_path_buf()).unwrap();
        store.get_or_create("/home/user/repo-a", None).unwrap();
        store.get_or_create("/home/user/repo-b", None).unwrap();
        let err = store.resolve(None).unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::AmbiguousProject);
    }

    #[test]
    fn resolve_missing_project_is_not_indexed() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProjectStore::new(dir.path().to_path_buf()).unwrap();
        let err = store.resolve(Some("nope")).unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::NotIndexed);
    }
}
