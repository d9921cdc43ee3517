//! Boolean query construction for the search endpoint.

use crate::models::{BooleanOp, SortChoice, SortField, SortOrder};

/// Field prefix every term is scoped to
const FIELD_PREFIX: &str = "all:";

/// Join one axis of terms into a field-scoped boolean expression.
///
/// Returns an empty string when there are no usable terms. Terms containing
/// whitespace are quoted so they match as phrases.
pub fn axis_expression<S: AsRef<str>>(terms: &[S], op: BooleanOp) -> String {
    terms
        .iter()
        .map(|term| term.as_ref().trim())
        .filter(|term| !term.is_empty())
        .map(scoped_term)
        .collect::<Vec<_>>()
        .join(op.separator())
}

fn scoped_term(term: &str) -> String {
    let term = term.replace('"', "");
    if term.split_whitespace().nth(1).is_some() {
        format!("{}\"{}\"", FIELD_PREFIX, term)
    } else {
        format!("{}{}", FIELD_PREFIX, term)
    }
}

/// Build the `search_query` expression and sort directive.
///
/// The keyword and category axes are combined with `AND`; an empty axis is
/// left out, and two empty axes yield an empty query.
pub fn build_query<S: AsRef<str>>(
    keywords: &[S],
    keywords_op: BooleanOp,
    categories: &[S],
    categories_op: BooleanOp,
    sort: SortChoice,
) -> (String, SortField, SortOrder) {
    let axes: Vec<String> = [
        axis_expression(keywords, keywords_op),
        axis_expression(categories, categories_op),
    ]
    .into_iter()
    .filter(|expr| !expr.is_empty())
    .map(|expr| format!("({})", expr))
    .collect();

    let (sort_by, sort_order) = sort.directive();
    (axes.join(" AND "), sort_by, sort_order)
}
