//! Use Cases Layer - Application Business Logic
//!
//! Orchestrates domain logic with port interfaces to implement the
//! daily batch run.
//!
//! Use cases:
//! - `universe`: symbol-list loading and normalization
//! - `pipeline`: the once-per-trading-day orchestrator

pub mod pipeline;
pub mod universe;

pub use pipeline::{Pipeline, RunMode, RunReport};
