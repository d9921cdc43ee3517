//! arXiv search endpoint client.

use async_trait::async_trait;

use crate::models::SearchQuery;
use crate::sources::{Source, SourceError};
use crate::utils::HttpClient;

/// Base URL for arXiv API
pub const ARXIV_API_URL: &str = "http://export.arxiv.org/api/query";

/// arXiv research source
///
/// Issues exactly one GET per [`Source::fetch`]; retrying is left to the caller.
#[derive(Debug, Clone)]
pub struct ArxivSource {
    client: HttpClient,
    endpoint: String,
}

impl ArxivSource {
    /// Create a new arXiv source against the public endpoint
    pub fn new(client: HttpClient) -> Self {
        Self::with_endpoint(client, ARXIV_API_URL)
    }

    /// Create against a custom endpoint (mirrors, tests)
    pub fn with_endpoint(client: HttpClient, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    /// The endpoint requests are sent to
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Query parameters for one request
    fn query_params(query: &SearchQuery) -> [(&'static str, String); 5] {
        [
            ("search_query", query.query.clone()),
            ("sortBy", query.sort_by.as_param().to_string()),
            ("sortOrder", query.sort_order.as_param().to_string()),
            ("start", "0".to_string()),
            ("max_results", query.max_results.to_string()),
        ]
    }
}

#[async_trait]
impl Source for ArxivSource {
    fn id(&self) -> &str {
        "arxiv"
    }

    fn name(&self) -> &str {
        "arXiv"
    }

    async fn fetch(&self, query: &SearchQuery) -> Result<Vec<u8>, SourceError> {
        tracing::debug!(
            endpoint = %self.endpoint,
            query = %query.query,
            max_results = query.max_results,
            "Fetching arXiv feed"
        );

        let response = self
            .client
            .client()
            .get(&self.endpoint)
            .header("Accept", "application/atom+xml")
            .query(&Self::query_params(query))
            .send()
            .await
            .map_err(|e| SourceError::Transport(format!("Failed to fetch arXiv results: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Network {
                status: status.as_u16(),
                message: format!(
                    "arXiv API returned status: {}",
                    status.canonical_reason().unwrap_or("unknown")
                ),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| SourceError::Transport(format!("Failed to read response: {}", e)))?;

        tracing::debug!(bytes = bytes.len(), "Received arXiv feed");
        Ok(bytes.to_vec())
    }
}
