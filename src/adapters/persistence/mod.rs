//! Persistence adapters.
//!
//! - `fs_store`: filesystem-backed `ArtifactStore` with atomic writes
//! - `closes_codec`: gzip-CSV codec for the rolling close ledger

pub mod closes_codec;
pub mod fs_store;

pub use fs_store::FsArtifactStore;
