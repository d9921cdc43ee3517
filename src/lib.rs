//! # arXiv Digest
//!
//! Search arXiv with boolean keyword and category queries, then translate and
//! summarize every abstract through a pluggable text-transform engine.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`models`]: Core data structures (SearchRequest, RawEntry, EnrichedEntry, ResultTable)
//! - [`sources`]: Query construction, the search endpoint client and the feed parser
//! - [`enrich`]: The text-transform capability and the bounded enrichment scheduler
//! - [`pipeline`]: The `search` entry point tying the stages together
//! - [`export`]: Writing result tables to CSV or JSON files
//! - [`utils`]: HTTP client and retry helpers
//! - [`config`]: Configuration management
//! - [`ui`]: Terminal rendering for the command-line front-end

pub mod config;
pub mod enrich;
pub mod export;
pub mod models;
pub mod pipeline;
pub mod sources;
pub mod ui;
pub mod utils;

// Re-export commonly used types
pub use enrich::{EnrichmentScheduler, TextTransform};
pub use models::{EnrichedEntry, ResultTable, SearchRequest};
pub use pipeline::{Pipeline, SearchError};
pub use sources::Source;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
