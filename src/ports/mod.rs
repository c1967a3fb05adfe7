//! Ports Layer - Hexagonal Architecture Boundaries
//!
//! Defines the interfaces (traits) that the use-case layer requires
//! from the outside world. Adapters implement these traits.
//!
//! Port categories:
//! - `CloseSource`: daily close-price acquisition (quote API or bulk file)
//! - `ArtifactStore`: opaque key-value persistence for dashboard artifacts

pub mod artifact_store;
pub mod close_source;

pub use artifact_store::ArtifactStore;
pub use close_source::{CloseSource, FetchOutcome, FetchWindow};
