//! Search request and query models.

use serde::{Deserialize, Serialize};

/// Boolean operator joining the terms of one query axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BooleanOp {
    And,
    #[default]
    Or,
}

impl BooleanOp {
    /// Parse an operator as typed by a user; anything other than `AND` means `OR`
    pub fn parse(input: &str) -> Self {
        if input.trim().eq_ignore_ascii_case("and") {
            BooleanOp::And
        } else {
            BooleanOp::Or
        }
    }

    /// The separator placed between two field-scoped terms
    pub fn separator(&self) -> &'static str {
        match self {
            BooleanOp::And => " AND ",
            BooleanOp::Or => " OR ",
        }
    }
}

impl std::fmt::Display for BooleanOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BooleanOp::And => f.write_str("AND"),
            BooleanOp::Or => f.write_str("OR"),
        }
    }
}

/// Field the search API sorts on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    LastUpdatedDate,
    SubmittedDate,
    Relevance,
}

impl SortField {
    /// Value of the `sortBy` request parameter
    pub fn as_param(&self) -> &'static str {
        match self {
            SortField::LastUpdatedDate => "lastUpdatedDate",
            SortField::SubmittedDate => "submittedDate",
            SortField::Relevance => "relevance",
        }
    }
}

/// Sort order for search results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    /// Value of the `sortOrder` request parameter
    pub fn as_param(&self) -> &'static str {
        match self {
            SortOrder::Ascending => "ascending",
            SortOrder::Descending => "descending",
        }
    }
}

/// Numbered sort menu offered to the user.
///
/// Codes 1 and 2 are labelled "Announcement Date" but map to the
/// `lastUpdatedDate` field; the search API has no separate announcement sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortChoice {
    AnnouncedNewest,
    AnnouncedOldest,
    #[default]
    SubmittedNewest,
    SubmittedOldest,
    Relevance,
}

impl SortChoice {
    /// All choices in menu order
    pub const ALL: [SortChoice; 5] = [
        SortChoice::AnnouncedNewest,
        SortChoice::AnnouncedOldest,
        SortChoice::SubmittedNewest,
        SortChoice::SubmittedOldest,
        SortChoice::Relevance,
    ];

    /// Resolve a menu code (`"1"`..`"5"`) or label.
    ///
    /// Unknown input silently falls back to the default (submitted, descending).
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        Self::ALL
            .into_iter()
            .find(|choice| input == choice.code() || input.eq_ignore_ascii_case(choice.label()))
            .unwrap_or_default()
    }

    /// Menu code
    pub fn code(&self) -> &'static str {
        match self {
            SortChoice::AnnouncedNewest => "1",
            SortChoice::AnnouncedOldest => "2",
            SortChoice::SubmittedNewest => "3",
            SortChoice::SubmittedOldest => "4",
            SortChoice::Relevance => "5",
        }
    }

    /// Menu label
    pub fn label(&self) -> &'static str {
        match self {
            SortChoice::AnnouncedNewest => "Announcement Date (newest first)",
            SortChoice::AnnouncedOldest => "Announcement Date (oldest first)",
            SortChoice::SubmittedNewest => "Submission Date (newest first)",
            SortChoice::SubmittedOldest => "Submission Date (oldest first)",
            SortChoice::Relevance => "Relevance",
        }
    }

    /// Sort directive sent to the search API
    pub fn directive(&self) -> (SortField, SortOrder) {
        match self {
            SortChoice::AnnouncedNewest => (SortField::LastUpdatedDate, SortOrder::Descending),
            SortChoice::AnnouncedOldest => (SortField::LastUpdatedDate, SortOrder::Ascending),
            SortChoice::SubmittedNewest => (SortField::SubmittedDate, SortOrder::Descending),
            SortChoice::SubmittedOldest => (SortField::SubmittedDate, SortOrder::Ascending),
            SortChoice::Relevance => (SortField::Relevance, SortOrder::Ascending),
        }
    }
}

/// A search as submitted by a front-end
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Keyword terms, in input order
    pub keywords: Vec<String>,

    /// Operator joining the keyword terms
    pub keywords_op: BooleanOp,

    /// Category terms (e.g. `cs.AI`), in input order
    pub categories: Vec<String>,

    /// Operator joining the category terms
    pub categories_op: BooleanOp,

    /// Maximum number of entries to request
    pub max_results: i64,

    /// Sort menu selection
    pub sort: SortChoice,
}

impl Default for SearchRequest {
    fn default() -> Self {
        Self {
            keywords: Vec::new(),
            keywords_op: BooleanOp::Or,
            categories: Vec::new(),
            categories_op: BooleanOp::Or,
            max_results: 10,
            sort: SortChoice::default(),
        }
    }
}

impl SearchRequest {
    /// Build a request from comma-separated keyword and category strings
    pub fn from_input(keywords: &str, categories: &str) -> Self {
        Self {
            keywords: split_terms(keywords),
            categories: split_terms(categories),
            ..Default::default()
        }
    }

    /// Set the keyword operator
    pub fn keywords_op(mut self, op: BooleanOp) -> Self {
        self.keywords_op = op;
        self
    }

    /// Set the category operator
    pub fn categories_op(mut self, op: BooleanOp) -> Self {
        self.categories_op = op;
        self
    }

    /// Set maximum results
    pub fn max_results(mut self, max: i64) -> Self {
        self.max_results = max;
        self
    }

    /// Set the sort choice
    pub fn sort(mut self, sort: SortChoice) -> Self {
        self.sort = sort;
        self
    }

    /// Keywords joined back into a single display string
    pub fn keyword_label(&self) -> String {
        self.keywords.join(", ")
    }
}

/// Split a comma-separated input into trimmed, non-empty terms
pub fn split_terms(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|term| !term.is_empty())
        .map(str::to_string)
        .collect()
}

/// A fully resolved query, ready for the search endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Boolean `search_query` expression
    pub query: String,

    /// Sort field
    pub sort_by: SortField,

    /// Sort order
    pub sort_order: SortOrder,

    /// Maximum number of results to return (always > 0)
    pub max_results: usize,
}
