//! Core data models for search requests, feed entries and results.

mod entry;
pub mod presets;
mod search;

pub use entry::{EnrichedEntry, RawEntry, ResultTable};
pub use search::{
    split_terms, BooleanOp, SearchQuery, SearchRequest, SortChoice, SortField, SortOrder,
};
