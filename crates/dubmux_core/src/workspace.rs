//! Per-job scratch directories.
//!
//! Every intermediate file of a job lives in a [`JobWorkspace`] under the
//! configured temp root. The directory is deleted when the workspace is
//! dropped, on every exit path.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tempfile::TempDir;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WorkspaceError {
    #[error("Job '{0}' already has an active workspace")]
    Busy(String),

    #[error("Failed to create workspace under {root}: {source}")]
    Io {
        root: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Hands out workspaces and tracks which job ids hold one.
#[derive(Debug)]
pub struct WorkspacePool {
    root: PathBuf,
    active: Mutex<HashSet<String>>,
}

impl WorkspacePool {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            active: Mutex::new(HashSet::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create a fresh directory for `job_id`.
    ///
    /// Fails with [`WorkspaceError::Busy`] while another workspace for the
    /// same id is alive.
    pub fn acquire(self: &Arc<Self>, job_id: &str) -> Result<JobWorkspace, WorkspaceError> {
        {
            let mut active = self.active.lock();
            if !active.insert(job_id.to_string()) {
                return Err(WorkspaceError::Busy(job_id.to_string()));
            }
        }

        let dir = fs::create_dir_all(&self.root)
            .and_then(|_| {
                tempfile::Builder::new()
                    .prefix(&format!("job-{}-", sanitize(job_id)))
                    .tempdir_in(&self.root)
            })
            .map_err(|source| {
                self.active.lock().remove(job_id);
                WorkspaceError::Io {
                    root: self.root.clone(),
                    source,
                }
            })?;

        tracing::debug!("Workspace for {} at {}", job_id, dir.path().display());

        Ok(JobWorkspace {
            job_id: job_id.to_string(),
            dir,
            pool: Arc::clone(self),
        })
    }

    pub fn is_active(&self, job_id: &str) -> bool {
        self.active.lock().contains(job_id)
    }

    pub fn active_count(&self) -> usize {
        self.active.lock().len()
    }
}

/// A job's scratch directory. Removed on drop.
#[derive(Debug)]
pub struct JobWorkspace {
    job_id: String,
    dir: TempDir,
    pool: Arc<WorkspacePool>,
}

impl JobWorkspace {
    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Path of a file inside the workspace.
    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

impl Drop for JobWorkspace {
    fn drop(&mut self) {
        self.pool.active.lock().remove(&self.job_id);
    }
}

fn sanitize(job_id: &str) -> String {
    job_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}
