//! The search pipeline: query, fetch, parse, enrich, assemble, export.
//!
//! [`Pipeline::search`] is the single entry point a front-end needs. Stage
//! failures (configuration, network, parse) abort the whole search and come
//! back as a [`SearchError`]; transform failures never do, they only leave
//! sentinel text in the affected fields.
//!
//! ```rust,no_run
//! use arxiv_digest::config::Config;
//! use arxiv_digest::models::SearchRequest;
//! use arxiv_digest::pipeline::Pipeline;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let pipeline = Pipeline::from_config(&Config::default())?;
//! let request = SearchRequest::from_input("A, B", "cs.AI").max_results(2);
//! let table = pipeline.search(&request).await?;
//! for entry in &table {
//!     println!("{}: {}", entry.title, entry.translated_summary);
//! }
//! # Ok(())
//! # }
//! ```

mod aggregate;

pub use aggregate::assemble;

use std::future::Future;
use std::sync::Arc;

use crate::config::{Config, InvalidConfig};
use crate::enrich::{ChatCompletionsTransform, EnrichmentScheduler, ProgressHook, TransformSettings};
use crate::export::{ExportError, TableExporter};
use crate::models::{ResultTable, SearchQuery, SearchRequest};
use crate::sources::{build_query, parse_feed, ArxivSource, Source, SourceError};
use crate::utils::{with_retry, HttpClient, RetryConfig};

/// Errors that abort a search
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// Invalid request or configuration, rejected before any network call
    #[error("Configuration error: {0}")]
    Config(String),

    /// The search endpoint answered with a non-success status
    #[error("Network error (HTTP {status}): {message}")]
    Network { status: u16, message: String },

    /// The search endpoint could not be reached
    #[error("Transport error: {0}")]
    Transport(String),

    /// The feed was not well-formed
    #[error("Parse error: {0}")]
    Parse(String),

    /// The search endpoint rejected the query inside its feed
    #[error("Search API error: {0}")]
    Api(String),

    /// The caller cancelled the search
    #[error("Search cancelled")]
    Cancelled,

    /// The enriched entries do not line up with the parsed feed
    #[error("Result alignment error: expected {expected} entries, got {actual}")]
    Alignment { expected: usize, actual: usize },

    /// Writing the result table failed
    #[error("Export failed: {0}")]
    Export(#[from] ExportError),
}

impl SearchError {
    /// Process exit code for the command-line front-end
    pub fn exit_code(&self) -> i32 {
        match self {
            SearchError::Config(_) => 2,
            SearchError::Network { .. } | SearchError::Transport(_) | SearchError::Api(_) => 3,
            SearchError::Parse(_) => 4,
            SearchError::Cancelled => 130,
            SearchError::Alignment { .. } | SearchError::Export(_) => 1,
        }
    }
}

impl From<SourceError> for SearchError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::Network { status, message } => SearchError::Network { status, message },
            SourceError::Transport(message) => SearchError::Transport(message),
            SourceError::Parse(message) => SearchError::Parse(message),
            SourceError::Api(message) => SearchError::Api(message),
            SourceError::InvalidRequest(message) => SearchError::Config(message),
        }
    }
}

impl From<InvalidConfig> for SearchError {
    fn from(err: InvalidConfig) -> Self {
        SearchError::Config(err.0)
    }
}

/// Default clamp for `max_results`
pub const DEFAULT_MAX_RESULTS_LIMIT: usize = 2000;

/// Search pipeline wired to a source, an enrichment scheduler and an optional exporter
#[derive(Debug, Clone)]
pub struct Pipeline {
    source: Arc<dyn Source>,
    scheduler: EnrichmentScheduler,
    retry: RetryConfig,
    max_results_limit: usize,
    exporter: Option<Arc<dyn TableExporter>>,
}

impl Pipeline {
    /// Create a pipeline that does not export and does not retry
    pub fn new(source: Arc<dyn Source>, scheduler: EnrichmentScheduler) -> Self {
        Self {
            source,
            scheduler,
            retry: RetryConfig::default(),
            max_results_limit: DEFAULT_MAX_RESULTS_LIMIT,
            exporter: None,
        }
    }

    /// Build the production pipeline described by `config`
    pub fn from_config(config: &Config) -> Result<Self, SearchError> {
        config.validate()?;

        let search_client = HttpClient::with_timeout(config.search_timeout())
            .map_err(|e| SearchError::Config(format!("failed to create HTTP client: {}", e)))?;
        let source = ArxivSource::with_endpoint(search_client, config.search.endpoint.clone());

        let transform_settings = TransformSettings {
            base_url: config.transform.base_url.clone(),
            model: config.transform.model.clone(),
            api_key: config.transform.resolved_api_key(),
            request_timeout: std::time::Duration::from_secs(config.transform.request_timeout_secs),
            summary_max_words: config.transform.summary_max_words,
        };
        let transform_client = HttpClient::with_timeout(transform_settings.request_timeout)
            .map_err(|e| SearchError::Config(format!("failed to create HTTP client: {}", e)))?;
        let transform = ChatCompletionsTransform::new(transform_client, transform_settings);

        let mut scheduler = EnrichmentScheduler::new(Arc::new(transform))
            .concurrency(config.enrichment.concurrency)
            .entry_timeout(config.entry_timeout())
            .target_language(config.enrichment.target_language.clone());
        if let Some(capacity) = config.enrichment.engine_capacity {
            scheduler = scheduler.engine_capacity(capacity);
        }

        let mut pipeline = Self::new(Arc::new(source), scheduler)
            .retry(RetryConfig::default().max_attempts(config.search.max_attempts))
            .max_results_limit(config.search.max_results_limit);
        if let Some(exporter) = config.export.exporter() {
            pipeline = pipeline.exporter(Arc::new(exporter));
        }
        Ok(pipeline)
    }

    /// Retry policy for the search fetch
    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Clamp larger `max_results` requests to `limit`
    pub fn max_results_limit(mut self, limit: usize) -> Self {
        self.max_results_limit = limit.max(1);
        self
    }

    /// Hand every non-empty result table to `exporter`
    pub fn exporter(mut self, exporter: Arc<dyn TableExporter>) -> Self {
        self.exporter = Some(exporter);
        self
    }

    /// Stop exporting
    pub fn without_exporter(mut self) -> Self {
        self.exporter = None;
        self
    }

    /// Report enrichment progress
    pub fn on_progress(mut self, hook: ProgressHook) -> Self {
        self.scheduler = self.scheduler.on_progress(hook);
        self
    }

    /// Validate a request and turn it into a query for the source
    pub fn resolve(&self, request: &SearchRequest) -> Result<SearchQuery, SearchError> {
        if request.max_results <= 0 {
            return Err(SearchError::Config(format!(
                "max_results must be positive, got {}",
                request.max_results
            )));
        }

        let (query, sort_by, sort_order) = build_query(
            &request.keywords,
            request.keywords_op,
            &request.categories,
            request.categories_op,
            request.sort,
        );
        if query.is_empty() {
            return Err(SearchError::Config(
                "at least one keyword or category is required".to_string(),
            ));
        }

        let requested = usize::try_from(request.max_results).unwrap_or(usize::MAX);
        let max_results = if requested > self.max_results_limit {
            tracing::warn!(
                requested,
                limit = self.max_results_limit,
                "max_results exceeds limit, clamping"
            );
            self.max_results_limit
        } else {
            requested
        };

        Ok(SearchQuery {
            query,
            sort_by,
            sort_order,
            max_results,
        })
    }

    /// Run a complete search.
    ///
    /// An empty feed yields an empty table and is not exported.
    pub async fn search(&self, request: &SearchRequest) -> Result<ResultTable, SearchError> {
        let query = self.resolve(request)?;
        tracing::info!(
            source = self.source.id(),
            query = %query.query,
            sort_by = query.sort_by.as_param(),
            sort_order = query.sort_order.as_param(),
            max_results = query.max_results,
            "Searching"
        );

        let feed = with_retry(self.retry, || self.source.fetch(&query)).await?;
        let entries = parse_feed(&feed)?;
        if entries.is_empty() {
            tracing::info!("No entries matched the query");
            return Ok(ResultTable::default());
        }

        let expected = entries.len();
        tracing::info!(entries = expected, "Feed parsed");
        let enriched = self.scheduler.enrich(entries).await;
        let table = assemble(expected, enriched)?;

        let fallbacks = table.fallback_count();
        if fallbacks > 0 {
            tracing::warn!(fields = fallbacks, "Some fields hold fallback text");
        }

        if let Some(exporter) = &self.exporter {
            exporter.export(&table, &request.keyword_label())?;
        }
        Ok(table)
    }

    /// Run a search that is abandoned as soon as `signal` completes.
    ///
    /// If `signal` is already complete nothing is fetched. Otherwise the
    /// in-flight stage is dropped, which aborts running enrichment tasks, and
    /// nothing is exported.
    pub async fn search_until<F>(&self, request: &SearchRequest, signal: F) -> Result<ResultTable, SearchError>
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            biased;
            _ = signal => {
                tracing::warn!("Search cancelled");
                Err(SearchError::Cancelled)
            }
            result = self.search(request) => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrich::{TextTransform, TransformError, TRANSLATION_FAILED};
    use crate::export::{ExportFormat, FileExporter};
    use crate::models::{BooleanOp, SortChoice, SortField, SortOrder};
    use crate::sources::mock::{atom_feed, empty_feed};
    use crate::sources::MockSource;
    use async_trait::async_trait;
    use std::time::Duration;
    use tempfile::tempdir;

    /// Echoes its input tagged with the operation, optionally after a delay
    #[derive(Debug, Default)]
    struct EchoTransform {
        delay: Option<Duration>,
        fail_translate: bool,
    }

    #[async_trait]
    impl TextTransform for EchoTransform {
        async fn translate(&self, text: &str, target_language: &str) -> Result<String, TransformError> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail_translate {
                return Err(TransformError::Unavailable("offline".to_string()));
            }
            Ok(format!("[{}] {}", target_language, text))
        }

        async fn summarize(&self, text: &str) -> Result<String, TransformError> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            Ok(format!("sum({})", text))
        }
    }

    fn pipeline(source: Arc<MockSource>, transform: EchoTransform) -> Pipeline {
        Pipeline::new(source, EnrichmentScheduler::new(Arc::new(transform)))
    }

    fn request() -> SearchRequest {
        SearchRequest::from_input("A, B", "cs.AI").max_results(2)
    }

    #[test]
    fn test_resolve_builds_query_and_default_sort() {
        let pipeline = pipeline(Arc::new(MockSource::new()), EchoTransform::default());
        let query = pipeline.resolve(&request()).unwrap();

        assert_eq!(query.query, "(all:A OR all:B) AND (all:cs.AI)");
        assert_eq!(query.sort_by, SortField::SubmittedDate);
        assert_eq!(query.sort_order, SortOrder::Descending);
        assert_eq!(query.max_results, 2);
    }

    #[test]
    fn test_resolve_rejects_non_positive_max_results() {
        let pipeline = pipeline(Arc::new(MockSource::new()), EchoTransform::default());
        for max in [0, -5] {
            let err = pipeline.resolve(&request().max_results(max)).unwrap_err();
            assert!(matches!(err, SearchError::Config(_)));
            assert_eq!(err.exit_code(), 2);
        }
    }

    #[test]
    fn test_resolve_rejects_empty_query() {
        let pipeline = pipeline(Arc::new(MockSource::new()), EchoTransform::default());
        let err = pipeline.resolve(&SearchRequest::from_input(" , ", "")).unwrap_err();
        assert!(matches!(err, SearchError::Config(_)));
    }

    #[test]
    fn test_resolve_clamps_max_results() {
        let pipeline =
            pipeline(Arc::new(MockSource::new()), EchoTransform::default()).max_results_limit(50);
        let query = pipeline.resolve(&request().max_results(10_000)).unwrap();
        assert_eq!(query.max_results, 50);
    }

    #[test]
    fn test_resolve_single_axis_and_operators() {
        let pipeline = pipeline(Arc::new(MockSource::new()), EchoTransform::default());
        let request = SearchRequest::from_input("a, b", "")
            .keywords_op(BooleanOp::And)
            .sort(SortChoice::Relevance);
        let query = pipeline.resolve(&request).unwrap();

        assert_eq!(query.query, "(all:a AND all:b)");
        assert_eq!(query.sort_by, SortField::Relevance);
    }

    #[tokio::test]
    async fn test_search_end_to_end_with_mock_source() {
        let source = Arc::new(MockSource::with_feed(atom_feed(&[
            ("First", "Abstract one."),
            ("Second", "Abstract two."),
        ])));
        let table = pipeline(source.clone(), EchoTransform::default())
            .search(&request())
            .await
            .unwrap();

        assert_eq!(source.queries().len(), 1);
        assert_eq!(table.len(), 2);
        assert_eq!(
            table.rows()[0].row(),
            [
                "First",
                "Abstract one.",
                "[zh] Abstract one.",
                "sum(Abstract one.)",
                "[zh] sum(Abstract one.)",
            ]
        );
        assert_eq!(table.rows()[1].title, "Second");
        assert_eq!(table.fallback_count(), 0);
    }

    #[tokio::test]
    async fn test_search_network_error_aborts() {
        let source = Arc::new(MockSource::new());
        source.set_status(503);

        let err = pipeline(source, EchoTransform::default())
            .search(&request())
            .await
            .unwrap_err();

        assert!(matches!(err, SearchError::Network { status: 503, .. }));
        assert_eq!(err.exit_code(), 3);
    }

    #[tokio::test]
    async fn test_search_parse_error_aborts() {
        let source = Arc::new(MockSource::with_feed("definitely not a feed"));
        let err = pipeline(source, EchoTransform::default())
            .search(&request())
            .await
            .unwrap_err();

        assert!(matches!(err, SearchError::Parse(_)));
        assert_eq!(err.exit_code(), 4);
    }

    #[tokio::test]
    async fn test_search_empty_feed_is_not_an_error() {
        let dir = tempdir().unwrap();
        let source = Arc::new(MockSource::with_feed(empty_feed()));
        let table = pipeline(source, EchoTransform::default())
            .exporter(Arc::new(FileExporter::new(dir.path(), ExportFormat::Csv)))
            .search(&request())
            .await
            .unwrap();

        assert!(table.is_empty());
        assert!(!dir.path().join("A_B.csv").exists());
    }

    #[tokio::test]
    async fn test_search_transform_failures_stay_in_fields() {
        let source = Arc::new(MockSource::with_feed(atom_feed(&[("Only", "Text.")])));
        let transform = EchoTransform {
            fail_translate: true,
            ..Default::default()
        };
        let table = pipeline(source, transform).search(&request()).await.unwrap();

        let entry = &table.rows()[0];
        assert_eq!(entry.summarized_abstract, "sum(Text.)");
        assert_eq!(entry.translated_abstract, TRANSLATION_FAILED);
        assert_eq!(entry.translated_summary, TRANSLATION_FAILED);
        assert_eq!(table.fallback_count(), 2);
    }

    #[tokio::test]
    async fn test_search_exports_named_after_keywords() {
        let dir = tempdir().unwrap();
        let source = Arc::new(MockSource::with_feed(atom_feed(&[("T", "A.")])));
        pipeline(source, EchoTransform::default())
            .exporter(Arc::new(FileExporter::new(dir.path(), ExportFormat::Csv)))
            .search(&request())
            .await
            .unwrap();

        let written = std::fs::read_to_string(dir.path().join("A_B.csv")).unwrap();
        assert!(written.starts_with("Title,Abstract,Translated Abstract,Summarized Abstract,Translated Summary\n"));
        assert!(written.contains("T,A.,[zh] A.,sum(A.),[zh] sum(A.)"));
    }

    #[tokio::test]
    async fn test_cancel_before_dispatch_fetches_nothing() {
        let source = Arc::new(MockSource::with_feed(atom_feed(&[("T", "A.")])));
        let err = pipeline(source.clone(), EchoTransform::default())
            .search_until(&request(), std::future::ready(()))
            .await
            .unwrap_err();

        assert!(matches!(err, SearchError::Cancelled));
        assert!(source.queries().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_during_enrichment_exports_nothing() {
        let dir = tempdir().unwrap();
        let source = Arc::new(MockSource::with_feed(atom_feed(&[("T", "A.")])));
        let transform = EchoTransform {
            delay: Some(Duration::from_secs(10)),
            ..Default::default()
        };

        let err = pipeline(source.clone(), transform)
            .exporter(Arc::new(FileExporter::new(dir.path(), ExportFormat::Csv)))
            .search_until(&request(), tokio::time::sleep(Duration::from_millis(100)))
            .await
            .unwrap_err();

        assert!(matches!(err, SearchError::Cancelled));
        assert_eq!(source.queries().len(), 1);
        assert!(!dir.path().join("A_B.csv").exists());
    }

    #[test]
    fn test_from_config_rejects_invalid_config() {
        let mut config = Config::default();
        config.enrichment.concurrency = 0;
        assert!(matches!(Pipeline::from_config(&config), Err(SearchError::Config(_))));
    }

    #[test]
    fn test_from_config_attaches_exporter_only_when_enabled() {
        let mut config = Config::default();
        assert!(Pipeline::from_config(&config).unwrap().exporter.is_some());

        config.export.format = ExportFormat::None;
        assert!(Pipeline::from_config(&config).unwrap().exporter.is_none());
    }

    #[test]
    fn test_source_error_mapping() {
        let err: SearchError = SourceError::InvalidRequest("bad".to_string()).into();
        assert!(matches!(err, SearchError::Config(_)));

        let err: SearchError = SourceError::Api("malformed query".to_string()).into();
        assert_eq!(err.exit_code(), 3);
    }
}
