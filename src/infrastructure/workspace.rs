use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use tracing::{debug, warn};

use crate::domain::error::WorkspaceError;

/// Directory holding per-job scratch files.
#[derive(Clone, Debug)]
pub struct Workspace {
    dir: PathBuf,
}

impl Workspace {
    /// Creates the directory if needed. Failure here is a startup failure.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, WorkspaceError> {
        let workspace = Self { dir: dir.into() };
        workspace.ensure_dir().await?;

        Ok(workspace)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Reserves the input/output pair for `job_id`. Both files are removed when
    /// the returned entry is dropped.
    pub async fn acquire(&self, job_id: &str) -> Result<WorkspaceEntry, WorkspaceError> {
        if !is_safe_file_stem(job_id) {
            return Err(WorkspaceError::InvalidJobId(job_id.to_string()));
        }

        // Someone may have removed the directory since startup.
        self.ensure_dir().await?;

        Ok(WorkspaceEntry {
            input: self.dir.join(format!("{}_input.png", job_id)),
            output: self.dir.join(format!("{}_output.png", job_id)),
        })
    }

    async fn ensure_dir(&self) -> Result<(), WorkspaceError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| WorkspaceError::Io {
                path: self.dir.clone(),
                source,
            })
    }
}

fn is_safe_file_stem(job_id: &str) -> bool {
    !job_id.is_empty()
        && job_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Scratch files owned by one processing attempt.
#[derive(Debug)]
pub struct WorkspaceEntry {
    input: PathBuf,
    output: PathBuf,
}

impl WorkspaceEntry {
    pub fn input_path(&self) -> &Path {
        &self.input
    }

    pub fn output_path(&self) -> &Path {
        &self.output
    }

    pub async fn write_input(&self, bytes: &[u8]) -> Result<(), WorkspaceError> {
        tokio::fs::write(&self.input, bytes)
            .await
            .map_err(|source| WorkspaceError::Io {
                path: self.input.clone(),
                source,
            })
    }

    pub async fn read_output(&self) -> Result<Vec<u8>, WorkspaceError> {
        tokio::fs::read(&self.output)
            .await
            .map_err(|source| WorkspaceError::Io {
                path: self.output.clone(),
                source,
            })
    }
}

impl Drop for WorkspaceEntry {
    // Also runs when the processing future is cancelled, so no awaiting here.
    fn drop(&mut self) {
        for path in [&self.input, &self.output] {
            match std::fs::remove_file(path) {
                Ok(()) => debug!(path = %path.display(), "Removed temp file"),
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    debug!(path = %path.display(), "Temp file already absent")
                }
                Err(e) => warn!(path = %path.display(), error = %e, "Cleanup failed"),
            }
        }
    }
}
