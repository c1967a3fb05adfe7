//! Close-price source adapters.
//!
//! Two interchangeable `CloseSource` strategies selected by
//! configuration: the vendor quote API and the exchange bulk
//! end-of-day file. Both share the same retry policy.

pub mod bulk_file;
pub mod quote_api;
pub mod retry;

pub use bulk_file::BulkFileSource;
pub use quote_api::QuoteApiSource;
pub use retry::RetryPolicy;
