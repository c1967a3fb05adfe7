//! Adapters Layer - Concrete Implementations of Ports
//!
//! - `sources`: the two close-price acquisition strategies plus the
//!   shared retry policy
//! - `persistence`: filesystem artifact store and the closes-ledger codec

pub mod persistence;
pub mod sources;
