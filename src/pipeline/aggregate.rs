//! Assembly of enriched entries into the final table.

use crate::models::{EnrichedEntry, ResultTable};
use crate::pipeline::SearchError;

/// Build the result table, checking it lines up with the parsed feed.
///
/// `expected` is the number of entries the feed parser produced. A mismatch
/// means the scheduler lost or duplicated an entry and is reported as
/// [`SearchError::Alignment`] rather than returning a shifted table.
pub fn assemble(expected: usize, entries: Vec<EnrichedEntry>) -> Result<ResultTable, SearchError> {
    if entries.len() != expected {
        tracing::error!(expected, actual = entries.len(), "Enriched entries do not match the feed");
        return Err(SearchError::Alignment {
            expected,
            actual: entries.len(),
        });
    }
    Ok(ResultTable::from_rows(entries))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawEntry;

    fn entries(n: usize) -> Vec<EnrichedEntry> {
        (0..n)
            .map(|i| EnrichedEntry::unenriched(&RawEntry::new(format!("T{i}"), format!("A{i}"))))
            .collect()
    }

    #[test]
    fn test_assemble_keeps_order() {
        let table = assemble(3, entries(3)).unwrap();
        let titles: Vec<&str> = table.rows().iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["T0", "T1", "T2"]);
    }

    #[test]
    fn test_assemble_empty() {
        assert!(assemble(0, Vec::new()).unwrap().is_empty());
    }

    #[test]
    fn test_assemble_length_mismatch() {
        let err = assemble(3, entries(2)).unwrap_err();
        assert!(matches!(
            err,
            SearchError::Alignment {
                expected: 3,
                actual: 2
            }
        ));
    }
}
