//! Feed entries before and after enrichment, and the ordered result table.

use serde::{Deserialize, Serialize};

use crate::enrich::{SUMMARIZATION_FAILED, TRANSLATION_FAILED};

/// One entry of the search feed, as parsed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEntry {
    /// Trimmed title
    pub title: String,

    /// Trimmed abstract
    #[serde(rename = "abstract")]
    pub r#abstract: String,
}

impl RawEntry {
    /// Create a new entry, trimming surrounding whitespace
    pub fn new(title: impl AsRef<str>, r#abstract: impl AsRef<str>) -> Self {
        Self {
            title: title.as_ref().trim().to_string(),
            r#abstract: r#abstract.as_ref().trim().to_string(),
        }
    }
}

/// An entry with its translated and summarized abstract.
///
/// Every text field is non-empty: a failed transform leaves its sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichedEntry {
    pub title: String,

    #[serde(rename = "abstract")]
    pub r#abstract: String,

    pub translated_abstract: String,

    pub summarized_abstract: String,

    pub translated_summary: String,
}

impl EnrichedEntry {
    /// Column headers, in the fixed export order
    pub const COLUMNS: [&'static str; 5] = [
        "Title",
        "Abstract",
        "Translated Abstract",
        "Summarized Abstract",
        "Translated Summary",
    ];

    /// An entry whose derived fields all carry their failure sentinel
    pub fn unenriched(raw: &RawEntry) -> Self {
        Self {
            title: raw.title.clone(),
            r#abstract: raw.r#abstract.clone(),
            translated_abstract: TRANSLATION_FAILED.to_string(),
            summarized_abstract: SUMMARIZATION_FAILED.to_string(),
            translated_summary: TRANSLATION_FAILED.to_string(),
        }
    }

    /// Field values in column order
    pub fn row(&self) -> [&str; 5] {
        [
            &self.title,
            &self.r#abstract,
            &self.translated_abstract,
            &self.summarized_abstract,
            &self.translated_summary,
        ]
    }

    /// Number of derived fields holding a failure sentinel
    pub fn fallback_count(&self) -> usize {
        [
            self.translated_abstract == TRANSLATION_FAILED,
            self.summarized_abstract == SUMMARIZATION_FAILED,
            self.translated_summary == TRANSLATION_FAILED,
        ]
        .into_iter()
        .filter(|failed| *failed)
        .count()
    }
}

/// Enriched entries, index-aligned with the parsed feed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultTable {
    rows: Vec<EnrichedEntry>,
}

impl ResultTable {
    pub(crate) fn from_rows(rows: Vec<EnrichedEntry>) -> Self {
        Self { rows }
    }

    /// Rows in feed order
    pub fn rows(&self) -> &[EnrichedEntry] {
        &self.rows
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the search matched nothing
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Total sentinel fields across all rows
    pub fn fallback_count(&self) -> usize {
        self.rows.iter().map(EnrichedEntry::fallback_count).sum()
    }

    /// Consume the table, yielding its rows
    pub fn into_rows(self) -> Vec<EnrichedEntry> {
        self.rows
    }
}

impl<'a> IntoIterator for &'a ResultTable {
    type Item = &'a EnrichedEntry;
    type IntoIter = std::slice::Iter<'a, EnrichedEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}
