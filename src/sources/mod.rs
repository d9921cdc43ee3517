//! Search sources: query construction, the search endpoint client and feed parsing.
//!
//! A [`Source`] turns a resolved [`SearchQuery`] into the raw feed bytes returned by
//! the search endpoint. [`build_query`] produces the boolean expression and sort
//! directive from user terms, and [`parse_feed`] turns the feed into ordered
//! [`RawEntry`](crate::models::RawEntry) values.
//!
//! ```rust
//! use arxiv_digest::models::{BooleanOp, SortChoice};
//! use arxiv_digest::sources::build_query;
//!
//! let keywords = vec!["A".to_string(), "B".to_string()];
//! let categories = vec!["cs.AI".to_string()];
//! let (query, _, _) = build_query(
//!     &keywords,
//!     BooleanOp::Or,
//!     &categories,
//!     BooleanOp::Or,
//!     SortChoice::default(),
//! );
//! assert_eq!(query, "(all:A OR all:B) AND (all:cs.AI)");
//! ```

mod arxiv;
mod feed;
pub mod mock;
mod query;

pub use arxiv::{ArxivSource, ARXIV_API_URL};
pub use feed::parse_feed;
pub use mock::MockSource;
pub use query::{axis_expression, build_query};

use crate::models::SearchQuery;
use async_trait::async_trait;

/// A search endpoint returning an Atom feed.
///
/// Each call is independent; implementations hold no per-search state.
#[async_trait]
pub trait Source: Send + Sync + std::fmt::Debug {
    /// Unique identifier for this source
    fn id(&self) -> &str;

    /// Human-readable name of this source
    fn name(&self) -> &str;

    /// Issue one request for `query` and return the raw feed
    async fn fetch(&self, query: &SearchQuery) -> Result<Vec<u8>, SourceError>;
}

/// Errors that can occur when interacting with a source
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The endpoint answered with a non-success status
    #[error("HTTP {status}: {message}")]
    Network { status: u16, message: String },

    /// The request never produced a response (connect, timeout, body read)
    #[error("Transport error: {0}")]
    Transport(String),

    /// The payload is not a well-formed feed
    #[error("Parse error: {0}")]
    Parse(String),

    /// The endpoint reported an error inside an otherwise valid feed
    #[error("API error: {0}")]
    Api(String),

    /// Invalid request parameters
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl SourceError {
    /// HTTP status carried by this error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            SourceError::Network { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => SourceError::Network {
                status: status.as_u16(),
                message: err.to_string(),
            },
            None => SourceError::Transport(err.to_string()),
        }
    }
}
