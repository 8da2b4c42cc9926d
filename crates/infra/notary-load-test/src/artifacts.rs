//! On-disk payload artifacts.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::{error::ArtifactIoError, workload::Payload};

/// Directory in which generated payloads are persisted during a run.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    /// Creates a store rooted at `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Root directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the artifact for payload `index`.
    pub fn path_for(&self, index: usize) -> PathBuf {
        self.dir.join(format!("payload-{index:05}.bin"))
    }

    /// Writes every payload, returning the written paths in payload order.
    pub async fn persist(&self, payloads: &[Payload]) -> Result<Vec<PathBuf>, ArtifactIoError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| ArtifactIoError { path: self.dir.clone(), source })?;

        let mut paths = Vec::with_capacity(payloads.len());
        for (index, payload) in payloads.iter().enumerate() {
            let path = self.path_for(index);
            tokio::fs::write(&path, payload.bytes())
                .await
                .map_err(|source| ArtifactIoError { path: path.clone(), source })?;
            paths.push(path);
        }
        debug!(count = paths.len(), dir = %self.dir.display(), "persisted payload artifacts");
        Ok(paths)
    }

    /// Removes previously written artifacts.
    pub async fn remove(&self, paths: &[PathBuf]) -> Result<(), ArtifactIoError> {
        for path in paths {
            tokio::fs::remove_file(path)
                .await
                .map_err(|source| ArtifactIoError { path: path.clone(), source })?;
        }
        debug!(count = paths.len(), "removed payload artifacts");
        Ok(())
    }
}
