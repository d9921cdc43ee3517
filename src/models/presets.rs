//! Suggested keywords and categories offered by front-ends.

/// Keyword suggestions
pub const KEYWORD_PRESETS: &[&str] = &[
    "Large Language Model",
    "Natural Language Processing (NLP)",
    "Computer Vision (CV)",
    "Artificial Intelligence (AI)",
    "Machine Learning (ML)",
    "Deep Learning",
    "Bioinformatics",
    "Genomics",
    "Transcriptomics",
    "Neural Networks",
    "Reinforcement Learning",
    "Pattern Recognition",
    "Knowledge Representation",
];

/// Category suggestions (arXiv subject classes)
pub const CATEGORY_PRESETS: &[&str] = &["cs.AI", "cs.CE", "cs.CL", "cs.CV", "cs.LG"];

/// Append picked suggestions to what the user already typed
pub fn merge_selection(current: &str, selected: &[&str]) -> String {
    let current = current.trim();
    let selected = selected.join(", ");
    match (current.is_empty(), selected.is_empty()) {
        (true, _) => selected,
        (false, true) => current.to_string(),
        (false, false) => format!("{}, {}", current, selected),
    }
}
