//! Artifact Store Port - Opaque Key-Value Persistence
//!
//! The pipeline persists three artifacts: the `latest` snapshot JSON,
//! the `history` series JSON, and the gzip-compressed `closes` ledger.
//! Where those bytes live (filesystem, object store) is an adapter
//! concern; the use-case layer only reads and writes keys.

use async_trait::async_trait;

/// Trait for artifact persistence providers.
#[async_trait]
pub trait ArtifactStore: Send + Sync + 'static {
    /// Read an artifact's bytes, or `None` if the key has never been
    /// written (first run).
    async fn read(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>>;

    /// Write an artifact's bytes, replacing any previous value. The
    /// write must be atomic: readers never observe a partial artifact.
    async fn write(&self, key: &str, bytes: &[u8]) -> anyhow::Result<()>;
}
