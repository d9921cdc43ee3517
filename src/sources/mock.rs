//! Mock source for testing purposes.

use async_trait::async_trait;
use std::sync::Mutex;

use crate::models::SearchQuery;
use crate::sources::{Source, SourceError};

/// A mock source that returns a predefined feed and records the queries it saw.
#[derive(Debug, Default)]
pub struct MockSource {
    feed: Mutex<Option<Vec<u8>>>,
    status: Mutex<Option<u16>>,
    queries: Mutex<Vec<SearchQuery>>,
}

impl MockSource {
    /// Create a new mock source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock source answering with `feed`.
    pub fn with_feed(feed: impl Into<Vec<u8>>) -> Self {
        let source = Self::new();
        source.set_feed(feed);
        source
    }

    /// Set the feed to return.
    pub fn set_feed(&self, feed: impl Into<Vec<u8>>) {
        let mut guard = self.feed.lock().unwrap();
        *guard = Some(feed.into());
    }

    /// Make every fetch fail with the given HTTP status.
    pub fn set_status(&self, status: u16) {
        let mut guard = self.status.lock().unwrap();
        *guard = Some(status);
    }

    /// Queries received so far, oldest first.
    pub fn queries(&self) -> Vec<SearchQuery> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl Source for MockSource {
    fn id(&self) -> &str {
        "mock"
    }

    fn name(&self) -> &str {
        "Mock Source"
    }

    async fn fetch(&self, query: &SearchQuery) -> Result<Vec<u8>, SourceError> {
        self.queries.lock().unwrap().push(query.clone());

        if let Some(status) = *self.status.lock().unwrap() {
            return Err(SourceError::Network {
                status,
                message: "mock failure".to_string(),
            });
        }

        let guard = self.feed.lock().unwrap();
        Ok(guard.clone().unwrap_or_else(|| empty_feed().into_bytes()))
    }
}

/// A well-formed feed with no entries.
pub fn empty_feed() -> String {
    atom_feed(&[])
}

/// Build an Atom feed with one entry per `(title, abstract)` pair.
pub fn atom_feed(entries: &[(&str, &str)]) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Mock Search Results</title>
  <id>http://example.com/api/query</id>
  <updated>2024-01-01T00:00:00Z</updated>
"#,
    );
    for (i, (title, abstract_text)) in entries.iter().enumerate() {
        let title = escape_xml(title);
        let abstract_text = escape_xml(abstract_text);
        xml.push_str(&format!(
            "  <entry>\n    <id>http://example.com/abs/{i}</id>\n    <title>{title}</title>\n    <summary>{abstract_text}</summary>\n    <updated>2024-01-01T00:00:00Z</updated>\n  </entry>\n"
        ));
    }
    xml.push_str("</feed>\n");
    xml
}

/// Escape text for use as XML element content.
fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
