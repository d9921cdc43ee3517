//! Bounded fan-out of per-entry enrichment with index-ordered fan-in.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;

use crate::enrich::{FieldOutcome, Operation, TextTransform, TransformError};
use crate::models::{EnrichedEntry, RawEntry};

/// Worker pool size used when none is configured
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Called with `(completed, total)` each time an entry finishes
pub type ProgressHook = Arc<dyn Fn(usize, usize) + Send + Sync>;

/// Runs summarize/translate for every entry on a bounded pool of workers.
///
/// At most `concurrency` entries are in progress at once, and at most
/// `engine_capacity` transform calls run at once across all of them (defaults
/// to `concurrency`). Each finished entry is written into the slot reserved by
/// its input index, so the output always lines up with the input regardless of
/// completion order.
#[derive(Clone)]
pub struct EnrichmentScheduler {
    transform: Arc<dyn TextTransform>,
    concurrency: usize,
    engine_capacity: Option<usize>,
    entry_timeout: Option<Duration>,
    target_language: String,
    progress: Option<ProgressHook>,
}

impl std::fmt::Debug for EnrichmentScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnrichmentScheduler")
            .field("transform", &self.transform)
            .field("concurrency", &self.concurrency)
            .field("engine_capacity", &self.engine_capacity)
            .field("entry_timeout", &self.entry_timeout)
            .field("target_language", &self.target_language)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

impl EnrichmentScheduler {
    /// Create a scheduler with the default pool size and no entry deadline
    pub fn new(transform: Arc<dyn TextTransform>) -> Self {
        Self {
            transform,
            concurrency: DEFAULT_CONCURRENCY,
            engine_capacity: None,
            entry_timeout: None,
            target_language: "zh".to_string(),
            progress: None,
        }
    }

    /// Number of entries processed simultaneously (at least 1)
    pub fn concurrency(mut self, workers: usize) -> Self {
        self.concurrency = workers.max(1);
        self
    }

    /// Number of transform calls allowed in flight at once (at least 1)
    pub fn engine_capacity(mut self, calls: usize) -> Self {
        self.engine_capacity = Some(calls.max(1));
        self
    }

    /// Deadline for all three calls of one entry, counted from when it starts
    pub fn entry_timeout(mut self, timeout: Duration) -> Self {
        self.entry_timeout = Some(timeout);
        self
    }

    /// Language code passed to every translate call
    pub fn target_language(mut self, language: impl Into<String>) -> Self {
        self.target_language = language.into();
        self
    }

    /// Report progress as entries complete
    pub fn on_progress(mut self, hook: ProgressHook) -> Self {
        self.progress = Some(hook);
        self
    }

    /// Enrich every entry; the result has the same length and order as `entries`.
    ///
    /// Transform failures are recovered per field and never fail the batch.
    /// Dropping the returned future aborts all in-flight entries.
    pub async fn enrich(&self, entries: Vec<RawEntry>) -> Vec<EnrichedEntry> {
        let total = entries.len();
        if total == 0 {
            return Vec::new();
        }

        let engine_capacity = self.engine_capacity.unwrap_or(self.concurrency);
        tracing::info!(
            entries = total,
            concurrency = self.concurrency,
            engine_capacity,
            "Starting enrichment"
        );

        // Reserved slots; an entry whose task dies keeps its fallback fields.
        let mut slots: Vec<EnrichedEntry> = entries.iter().map(EnrichedEntry::unenriched).collect();

        let workers = Arc::new(Semaphore::new(self.concurrency));
        let engine = Arc::new(Semaphore::new(engine_capacity));
        let completed = Arc::new(AtomicUsize::new(0));
        let mut tasks = JoinSet::new();

        for (index, entry) in entries.into_iter().enumerate() {
            let Ok(permit) = Arc::clone(&workers).acquire_owned().await else {
                break;
            };

            let job = EntryJob {
                index,
                entry,
                transform: Arc::clone(&self.transform),
                engine: Arc::clone(&engine),
                target_language: self.target_language.clone(),
                timeout: self.entry_timeout,
            };
            let completed = Arc::clone(&completed);
            let progress = self.progress.clone();

            tasks.spawn(async move {
                let enriched = job.run().await;
                drop(permit);
                let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                if let Some(hook) = progress {
                    hook(done, total);
                }
                (index, enriched)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, enriched)) => slots[index] = enriched,
                Err(err) => {
                    tracing::error!(error = %err, "Enrichment task failed, entry keeps fallback fields")
                }
            }
        }

        tracing::info!(entries = total, "Enrichment finished");
        slots
    }
}

/// One entry's work, owned exclusively by the task running it
struct EntryJob {
    index: usize,
    entry: RawEntry,
    transform: Arc<dyn TextTransform>,
    engine: Arc<Semaphore>,
    target_language: String,
    timeout: Option<Duration>,
}

impl EntryJob {
    async fn run(self) -> EnrichedEntry {
        let deadline = self.timeout.map(|timeout| Instant::now() + timeout);
        let abstract_text = self.entry.r#abstract.as_str();
        let language = self.target_language.as_str();

        let summary_chain = async {
            let summary = self
                .call(Operation::Summarize, deadline, self.transform.summarize(abstract_text))
                .await;
            // Translated as-is, sentinel included, so a failed summary costs one field.
            let summary_text = summary.clone().into_text();
            let translated_summary = self
                .call(
                    Operation::TranslateSummary,
                    deadline,
                    self.transform.translate(&summary_text, language),
                )
                .await;
            (summary, translated_summary)
        };
        let translated_abstract = self.call(
            Operation::TranslateAbstract,
            deadline,
            self.transform.translate(abstract_text, language),
        );

        let ((summary, translated_summary), translated_abstract) =
            tokio::join!(summary_chain, translated_abstract);

        tracing::debug!(index = self.index, "Entry enriched");

        EnrichedEntry {
            title: self.entry.title,
            r#abstract: self.entry.r#abstract,
            translated_abstract: translated_abstract.into_text(),
            summarized_abstract: summary.into_text(),
            translated_summary: translated_summary.into_text(),
        }
    }

    /// Run one transform call under the engine pool and the entry deadline
    async fn call<F>(&self, operation: Operation, deadline: Option<Instant>, call: F) -> FieldOutcome
    where
        F: Future<Output = Result<String, TransformError>>,
    {
        let guarded = async {
            let _permit = self
                .engine
                .acquire()
                .await
                .map_err(|_| TransformError::Unavailable("engine pool closed".to_string()))?;
            call.await
        };

        let result = match deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, guarded)
                .await
                .unwrap_or(Err(TransformError::Timeout)),
            None => guarded.await,
        };

        let outcome = FieldOutcome::from_result(operation, result);
        if let FieldOutcome::Fallback { error, .. } = &outcome {
            tracing::warn!(
                index = self.index,
                operation = %operation,
                error = %error,
                "Transform failed, using fallback text"
            );
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrich::{SUMMARIZATION_FAILED, TRANSLATION_FAILED};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Stub engine: `zh[..]` for translations, `sum[..]` for summaries.
    ///
    /// Latency is taken from the `abstract-N` marker so later entries finish
    /// first; selected inputs can be made to fail or hang.
    #[derive(Debug, Default)]
    struct StubTransform {
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        calls: AtomicUsize,
        fail_translate: Mutex<Option<String>>,
        fail_summarize: Mutex<Option<String>>,
        hang_summarize: Mutex<Option<String>>,
        blank_summary: Mutex<Option<String>>,
        entries: usize,
    }

    impl StubTransform {
        fn new(entries: usize) -> Self {
            Self {
                entries,
                ..Default::default()
            }
        }

        fn latency(&self, text: &str) -> Duration {
            let index = text
                .rsplit('-')
                .next()
                .and_then(|n| n.trim_end_matches(']').parse::<usize>().ok())
                .unwrap_or(0);
            Duration::from_millis(2 + 3 * (self.entries.saturating_sub(index)) as u64)
        }

        async fn track<T>(&self, text: &str, output: T) -> T {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.latency(text)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            output
        }

        fn matches(slot: &Mutex<Option<String>>, text: &str) -> bool {
            slot.lock().unwrap().as_deref() == Some(text)
        }
    }

    #[async_trait]
    impl TextTransform for StubTransform {
        async fn translate(&self, text: &str, target_language: &str) -> Result<String, TransformError> {
            let result = if Self::matches(&self.fail_translate, text) {
                Err(TransformError::Api {
                    status: 500,
                    message: "boom".to_string(),
                })
            } else {
                Ok(format!("{}[{}]", target_language, text))
            };
            self.track(text, result).await
        }

        async fn summarize(&self, text: &str) -> Result<String, TransformError> {
            if Self::matches(&self.hang_summarize, text) {
                tokio::time::sleep(Duration::from_secs(30)).await;
            }
            let result = if Self::matches(&self.fail_summarize, text) {
                Err(TransformError::Network("connection reset".to_string()))
            } else if Self::matches(&self.blank_summary, text) {
                Ok("   ".to_string())
            } else {
                Ok(format!("sum[{}]", text))
            };
            self.track(text, result).await
        }
    }

    fn entries(n: usize) -> Vec<RawEntry> {
        (0..n)
            .map(|i| RawEntry::new(format!("title-{}", i), format!("abstract-{}", i)))
            .collect()
    }

    fn scheduler(stub: &Arc<StubTransform>) -> EnrichmentScheduler {
        let transform: Arc<dyn TextTransform> = stub.clone();
        EnrichmentScheduler::new(transform)
    }

    #[tokio::test]
    async fn test_output_is_index_aligned_with_input() {
        let stub = Arc::new(StubTransform::new(10));
        let output = scheduler(&stub).concurrency(4).enrich(entries(10)).await;

        assert_eq!(output.len(), 10);
        for (i, entry) in output.iter().enumerate() {
            assert_eq!(entry.title, format!("title-{}", i));
            assert_eq!(entry.r#abstract, format!("abstract-{}", i));
            assert_eq!(entry.translated_abstract, format!("zh[abstract-{}]", i));
            assert_eq!(entry.summarized_abstract, format!("sum[abstract-{}]", i));
            assert_eq!(entry.translated_summary, format!("zh[sum[abstract-{}]]", i));
        }
        assert_eq!(stub.calls.load(Ordering::SeqCst), 30);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_order_survives_multithreaded_runtime() {
        let stub = Arc::new(StubTransform::new(25));
        let output = scheduler(&stub).concurrency(6).enrich(entries(25)).await;

        let titles: Vec<String> = output.into_iter().map(|e| e.title).collect();
        let expected: Vec<String> = (0..25).map(|i| format!("title-{}", i)).collect();
        assert_eq!(titles, expected);
    }

    #[tokio::test]
    async fn test_pool_of_four_never_exceeds_four_calls_in_flight() {
        let stub = Arc::new(StubTransform::new(10));
        scheduler(&stub).concurrency(4).enrich(entries(10)).await;

        let max = stub.max_in_flight.load(Ordering::SeqCst);
        assert!(max <= 4, "saw {} calls in flight", max);
        assert!(max > 1, "calls never overlapped");
    }

    #[tokio::test]
    async fn test_engine_capacity_serializes_calls() {
        let stub = Arc::new(StubTransform::new(6));
        let output = scheduler(&stub)
            .concurrency(3)
            .engine_capacity(1)
            .enrich(entries(6))
            .await;

        assert_eq!(output.len(), 6);
        assert_eq!(stub.max_in_flight.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_single_translate_failure_affects_one_field() {
        let stub = Arc::new(StubTransform::new(5));
        *stub.fail_translate.lock().unwrap() = Some("abstract-3".to_string());

        let output = scheduler(&stub).enrich(entries(5)).await;

        assert_eq!(output.len(), 5);
        assert_eq!(output[3].translated_abstract, TRANSLATION_FAILED);
        assert_eq!(output[3].summarized_abstract, "sum[abstract-3]");
        assert_eq!(output[3].translated_summary, "zh[sum[abstract-3]]");
        let sentinels: usize = output.iter().map(EnrichedEntry::fallback_count).sum();
        assert_eq!(sentinels, 1);
    }

    #[tokio::test]
    async fn test_summarize_failure_keeps_translation() {
        let stub = Arc::new(StubTransform::new(3));
        *stub.fail_summarize.lock().unwrap() = Some("abstract-1".to_string());

        let output = scheduler(&stub).enrich(entries(3)).await;

        assert_eq!(output[1].summarized_abstract, SUMMARIZATION_FAILED);
        assert_eq!(output[1].translated_summary, "zh[Summarization failed.]");
        assert_eq!(output[1].translated_abstract, "zh[abstract-1]");
        let sentinels: usize = output.iter().map(EnrichedEntry::fallback_count).sum();
        assert_eq!(sentinels, 1);
        assert_eq!(stub.calls.load(Ordering::SeqCst), 9);
    }

    #[tokio::test]
    async fn test_blank_output_becomes_sentinel() {
        let stub = Arc::new(StubTransform::new(2));
        *stub.blank_summary.lock().unwrap() = Some("abstract-0".to_string());

        let output = scheduler(&stub).enrich(entries(2)).await;

        assert_eq!(output[0].summarized_abstract, SUMMARIZATION_FAILED);
        assert!(output
            .iter()
            .all(|entry| entry.row().iter().all(|field| !field.is_empty())));
    }

    #[tokio::test]
    async fn test_entry_timeout_applies_fallback() {
        let stub = Arc::new(StubTransform::new(3));
        *stub.hang_summarize.lock().unwrap() = Some("abstract-1".to_string());

        let started = std::time::Instant::now();
        let output = scheduler(&stub)
            .entry_timeout(Duration::from_millis(200))
            .enrich(entries(3))
            .await;

        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(output[1].summarized_abstract, SUMMARIZATION_FAILED);
        // The summary translation starts past the deadline, so it times out as well.
        assert_eq!(output[1].translated_summary, TRANSLATION_FAILED);
        assert_eq!(output[1].translated_abstract, "zh[abstract-1]");
        assert_eq!(output[0].fallback_count(), 0);
        assert_eq!(output[2].fallback_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_input() {
        let stub = Arc::new(StubTransform::new(0));
        let output = scheduler(&stub).enrich(Vec::new()).await;
        assert!(output.is_empty());
        assert_eq!(stub.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_progress_hook_counts_every_entry() {
        let stub = Arc::new(StubTransform::new(7));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let hook: ProgressHook = {
            let seen = Arc::clone(&seen);
            Arc::new(move |done, total| seen.lock().unwrap().push((done, total)))
        };

        scheduler(&stub).on_progress(hook).enrich(entries(7)).await;

        let mut seen = seen.lock().unwrap().clone();
        seen.sort();
        assert_eq!(seen, (1..=7).map(|done| (done, 7)).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_target_language_is_forwarded() {
        let stub = Arc::new(StubTransform::new(1));
        let output = scheduler(&stub).target_language("fr").enrich(entries(1)).await;
        assert_eq!(output[0].translated_abstract, "fr[abstract-0]");
        assert_eq!(output[0].translated_summary, "fr[sum[abstract-0]]");
    }
}
