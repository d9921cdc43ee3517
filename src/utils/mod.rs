//! Utility modules supporting search operations.
//!
//! - [`HttpClient`]: shared reqwest client with sensible timeouts
//! - [`RetryConfig`] / [`with_retry`]: retry transient fetch failures with exponential backoff
//!
//! # Retry with Backoff
//!
//! ```rust,no_run
//! use arxiv_digest::models::{SearchQuery, SortField, SortOrder};
//! use arxiv_digest::sources::{ArxivSource, Source};
//! use arxiv_digest::utils::{with_retry, HttpClient, RetryConfig};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let source = ArxivSource::new(HttpClient::new()?);
//! let query = SearchQuery {
//!     query: "(all:transformer)".to_string(),
//!     sort_by: SortField::SubmittedDate,
//!     sort_order: SortOrder::Descending,
//!     max_results: 5,
//! };
//! let feed = with_retry(RetryConfig::default().max_attempts(3), || source.fetch(&query)).await?;
//! # Ok(())
//! # }
//! ```

mod http;
mod retry;

pub use http::{HttpClient, DEFAULT_TIMEOUT};
pub use retry::{is_transient, with_retry, RetryConfig};
