//! Atom feed parsing.

use feed_rs::model::FeedType;
use feed_rs::parser;

use crate::models::RawEntry;
use crate::sources::SourceError;

/// Marker in the `<id>` of the entry arXiv returns for a rejected query
const API_ERROR_ID: &str = "/api/errors";

/// Parse a search feed into entries, in document order.
///
/// A well-formed feed without entries yields an empty vector. A payload that is
/// not an Atom feed (RSS and JSON Feed included) fails as a whole; no entries
/// are returned in that case.
pub fn parse_feed(bytes: &[u8]) -> Result<Vec<RawEntry>, SourceError> {
    let feed = parser::parse(bytes)
        .map_err(|e| SourceError::Parse(format!("Failed to parse Atom feed: {}", e)))?;
    if feed.feed_type != FeedType::Atom {
        return Err(SourceError::Parse(format!(
            "Expected an Atom feed, got {:?}",
            feed.feed_type
        )));
    }

    if let Some(error_entry) = feed.entries.iter().find(|e| e.id.contains(API_ERROR_ID)) {
        let message = error_entry
            .summary
            .as_ref()
            .map(|s| s.content.trim().to_string())
            .unwrap_or_else(|| error_entry.id.clone());
        return Err(SourceError::Api(message));
    }

    let entries: Vec<RawEntry> = feed
        .entries
        .iter()
        .map(|entry| {
            let title = entry.title.as_ref().map(|t| t.content.as_str()).unwrap_or("");
            let abstract_text = entry
                .summary
                .as_ref()
                .map(|s| s.content.as_str())
                .unwrap_or("");
            RawEntry::new(title, abstract_text)
        })
        .collect();

    tracing::debug!(entries = entries.len(), "Parsed feed");
    Ok(entries)
}
