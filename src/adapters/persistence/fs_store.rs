//! Filesystem Artifact Store - Atomic Key-Value Persistence
//!
//! Stores each artifact as a file under the data directory, written
//! atomically (write to tmp file, then rename). This guarantees the
//! dashboard never reads a partially written `latest`/`history` and a
//! crashed run never corrupts the closes ledger.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, instrument};

use crate::ports::artifact_store::ArtifactStore;

/// Filesystem-backed artifact store.
pub struct FsArtifactStore {
    data_dir: PathBuf,
}

impl FsArtifactStore {
    /// Create a store rooted at the given directory, creating it if
    /// needed.
    pub async fn new(data_dir: &str) -> Result<Self> {
        let dir = Path::new(data_dir);
        fs::create_dir_all(dir)
            .await
            .context("Failed to create data directory")?;

        Ok(Self {
            data_dir: dir.to_path_buf(),
        })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.data_dir.join(key)
    }
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(key);
        if !path.exists() {
            debug!(key, "Artifact not found, first run");
            return Ok(None);
        }
        let bytes = fs::read(&path)
            .await
            .with_context(|| format!("Failed to read artifact {key}"))?;
        Ok(Some(bytes))
    }

    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    async fn write(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path_for(key);
        let tmp = self.data_dir.join(format!("{key}.tmp"));

        fs::write(&tmp, bytes)
            .await
            .with_context(|| format!("Failed to write tmp file for {key}"))?;

        // Atomic rename: readers see the old or new artifact, never a mix.
        fs::rename(&tmp, &path)
            .await
            .with_context(|| format!("Failed to rename artifact {key} into place"))?;

        debug!(key, path = %path.display(), "Artifact written");
        Ok(())
    }
}
