//! C14 Job Manager: background indexing lifecycle — mutex, cancellation
//! tokens, progress, TTL cleanup of finished jobs.
//!
//! Generalizes the teacher's single background semantic-indexing thread
//! (`main.rs`) plus its periodic session-pruning task (`main.rs`'s
//! `tokio::spawn` interval loop) into a per-project job table, replacing
//! the interval loop with a `std::thread` sleep loop since this system has
//! no async runtime.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use tracing::info;

use crate::error::{CodeSeekerError, Result};
use crate::model::{IndexingJob, JobProgress, JobStatus};

const JOB_TTL: Duration = Duration::from_secs(3600);
const CLEANUP_INTERVAL: Duration = Duration::from_secs(600);

/// Cooperative cancellation flag, checked at file and phase boundaries by
/// the indexing loop.
#[derive(Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

struct JobEntry {
    job: IndexingJob,
    token: CancellationToken,
}

/// `[absent] --start()--> running --complete/cancel--> completed|failed --TTL--> [absent]`.
pub struct JobManager {
    jobs: Mutex<HashMap<String, JobEntry>>,
}

impl JobManager {
    pub fn new() -> Arc<Self> {
        let manager = Arc::new(Self { jobs: Mutex::new(HashMap::new()) });
        manager.clone().spawn_cleanup_sweeper();
        manager
    }

    /// Fails fast with `already_indexing` if a `running` job exists for
    /// `project_id`; otherwise registers the job and returns its
    /// cancellation token for the caller to hand to the indexing loop. The
    /// mutex is released once the job is registered.
    pub fn start(&self, project_id: &str, project_name: &str, project_path: &str) -> Result<CancellationToken> {
        let mut jobs = self.jobs.lock().unwrap();
        if let Some(entry) = jobs.get(project_id) {
            if entry.job.status == JobStatus::Running {
                return Err(CodeSeekerError::already_indexing(format!(
                    "project {project_name} is already being indexed"
                )));
            }
        }

        let token = CancellationToken::new();
        let job = IndexingJob {
            project_id: project_id.to_string(),
            project_name: project_name.to_string(),
            project_path: project_path.to_string(),
            status: JobStatus::Running,
            started_at: Utc::now(),
            completed_at: None,
            progress: JobProgress::default(),
            result: None,
            error: None,
        };
        jobs.insert(project_id.to_string(), JobEntry { job, token: token.clone() });
        Ok(token)
    }

    pub fn update_progress(&self, project_id: &str, progress: JobProgress) {
        if let Some(entry) = self.jobs.lock().unwrap().get_mut(project_id) {
            entry.job.progress = progress;
        }
    }

    pub fn complete(&self, project_id: &str, result: serde_json::Value) {
        if let Some(entry) = self.jobs.lock().unwrap().get_mut(project_id) {
            entry.job.status = JobStatus::Completed;
            entry.job.completed_at = Some(Utc::now());
            entry.job.result = Some(result);
        }
    }

    pub fn fail(&self, project_id: &str, error: impl Into<String>) {
        if let Some(entry) = self.jobs.lock().unwrap().get_mut(project_id) {
            entry.job.status = JobStatus::Failed;
            entry.job.completed_at = Some(Utc::now());
            entry.job.error = Some(error.into());
        }
    }

    /// Flips the cancellation token for a running job. The job transitions
    /// to `failed` with a `cancelled` message once the indexing loop
    /// observes the token at the next boundary — not synchronously here.
    pub fn cancel(&self, project_id: &str) -> Result<()> {
        let jobs = self.jobs.lock().unwrap();
        match jobs.get(project_id) {
            Some(entry) if entry.job.status == JobStatus::Running => {
                entry.token.cancel();
                Ok(())
            }
            Some(_) => Err(CodeSeekerError::bad_input(format!("project {project_id} has no running job"))),
            None => Err(CodeSeekerError::not_found(format!("no job found for project {project_id}"))),
        }
    }

    pub fn get(&self, project_id: &str) -> Option<IndexingJob> {
        self.jobs.lock().unwrap().get(project_id).map(|e| e.job.clone())
    }

    pub fn list(&self) -> Vec<IndexingJob> {
        self.jobs.lock().unwrap().values().map(|e| e.job.clone()).collect()
    }

    pub fn is_running(&self, project_id: &str) -> bool {
        self.jobs
            .lock()
            .unwrap()
            .get(project_id)
            .is_some_and(|e| e.job.status == JobStatus::Running)
    }

    /// Removes non-`running` jobs whose `completed_at` is older than
    /// `JOB_TTL`. `running` jobs are never evicted.
    fn sweep(&self) {
        let now = Utc::now();
        let mut jobs = self.jobs.lock().unwrap();
        jobs.retain(|_, entry| {
            if entry.job.status == JobStatus::Running {
                return true;
            }
            match entry.job.completed_at {
                Some(completed_at) => {
                    let age = now.signed_duration_since(completed_at);
                    age.to_std().map(|d| d < JOB_TTL).unwrap_or(true)
                }
                None => true,
            }
        });
    }

    fn spawn_cleanup_sweeper(self: Arc<Self>) {
        std::thread::spawn(move || loop {
            std::thread::sleep(CLEANUP_INTERVAL);
            self.sweep();
            info!("job cleanup sweep complete");
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_twice_for_same_project_is_already_indexing() {
        let manager = JobManager::new();
        manager.start("p1", "demo", "/repo").unwrap();
        let err = manager.start("p1", "demo", "/repo").unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::AlreadyIndexing);
    }

    #[test]
    fn start_after_completion_succeeds() {
        let manager = JobManager::new();
        manager.start("p1", "demo", "/repo").unwrap();
        manager.complete("p1", serde_json::json!({"chunks": 10}));
        assert!(manager.start("p1", "demo", "/repo").is_ok());
    }

    #[test]
    fn cancel_flips_token_observed_by_loop() {
        let manager = JobManager::new();
        let token = manager.start("p1", "demo", "/repo").unwrap();
        assert!(!token.is_cancelled());
        manager.cancel("p1").unwrap();
        assert!(token.is_cancelled());
    }

    #[test]
    fn cancel_unknown_project_is_not_found() {
        let manager = JobManager::new();
        let err = manager.cancel("nope").unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::NotFound);
    }

    #[test]
    fn list_reflects_registered_jobs() {
        let manager = JobManager::new();
        manager.start("p1", "demo", "/repo").unwrap();
        assert_eq!(manager.list().len(), 1);
    }
}
