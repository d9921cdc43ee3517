//! Abstract enrichment: the text-transform capability and the scheduler driving it.
//!
//! The [`TextTransform`] trait is the only thing the scheduler knows about the
//! translation and summarization engine. Production code uses
//! [`ChatCompletionsTransform`]; tests substitute a stub.
//!
//! Failures never escape enrichment. A failed call leaves a sentinel in the
//! affected field ([`TRANSLATION_FAILED`] or [`SUMMARIZATION_FAILED`]) and is
//! logged with `tracing::warn!`.

mod llm;
mod scheduler;

pub use llm::{ChatCompletionsTransform, TransformSettings};
pub use scheduler::{EnrichmentScheduler, ProgressHook, DEFAULT_CONCURRENCY};

use async_trait::async_trait;

/// Sentinel left in a translated field whose transform failed
pub const TRANSLATION_FAILED: &str = "Translation failed.";

/// Sentinel left in the summary field when summarization failed
pub const SUMMARIZATION_FAILED: &str = "Summarization failed.";

/// Translation and summarization engine.
///
/// Shared by every worker of a scheduler, so implementations must tolerate
/// concurrent calls; the scheduler bounds how many run at once.
#[async_trait]
pub trait TextTransform: Send + Sync + std::fmt::Debug {
    /// Translate `text` into the language identified by `target_language` (e.g. `zh`)
    async fn translate(&self, text: &str, target_language: &str) -> Result<String, TransformError>;

    /// Summarize `text`
    async fn summarize(&self, text: &str) -> Result<String, TransformError>;
}

/// Errors reported by a [`TextTransform`]
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransformError {
    /// Network or HTTP transport error
    #[error("Network error: {0}")]
    Network(String),

    /// The engine answered with an error status
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The engine answered, but not with usable text
    #[error("Malformed response: {0}")]
    Malformed(String),

    /// The entry deadline passed before the call finished
    #[error("Timed out")]
    Timeout,

    /// The engine is not available at all
    #[error("Engine unavailable: {0}")]
    Unavailable(String),
}

impl From<reqwest::Error> for TransformError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransformError::Timeout
        } else if err.is_decode() {
            TransformError::Malformed(err.to_string())
        } else {
            TransformError::Network(err.to_string())
        }
    }
}

/// Which transform produced a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    TranslateAbstract,
    Summarize,
    TranslateSummary,
}

impl Operation {
    /// Sentinel used when this operation fails
    pub fn sentinel(&self) -> &'static str {
        match self {
            Operation::TranslateAbstract | Operation::TranslateSummary => TRANSLATION_FAILED,
            Operation::Summarize => SUMMARIZATION_FAILED,
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::TranslateAbstract => f.write_str("translate_abstract"),
            Operation::Summarize => f.write_str("summarize"),
            Operation::TranslateSummary => f.write_str("translate_summary"),
        }
    }
}

/// Outcome of one transform call for one field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldOutcome {
    /// The engine produced non-empty text
    Done(String),
    /// The call failed; the field takes the operation's sentinel
    Fallback {
        operation: Operation,
        error: TransformError,
    },
}

impl FieldOutcome {
    /// Classify a transform result; blank output counts as malformed
    pub fn from_result(operation: Operation, result: Result<String, TransformError>) -> Self {
        match result {
            Ok(text) if !text.trim().is_empty() => FieldOutcome::Done(text.trim().to_string()),
            Ok(_) => FieldOutcome::Fallback {
                operation,
                error: TransformError::Malformed("empty output".to_string()),
            },
            Err(error) => FieldOutcome::Fallback { operation, error },
        }
    }

    /// Produced text, if any
    pub fn text(&self) -> Option<&str> {
        match self {
            FieldOutcome::Done(text) => Some(text),
            FieldOutcome::Fallback { .. } => None,
        }
    }

    /// Field value: the produced text or the sentinel
    pub fn into_text(self) -> String {
        match self {
            FieldOutcome::Done(text) => text,
            FieldOutcome::Fallback { operation, .. } => operation.sentinel().to_string(),
        }
    }
}
