//! Terminal output: status lines, the enrichment progress bar and result tables.

use comfy_table::{presets::UTF8_FULL, Attribute, Cell, ContentArrangement, Table};
use owo_colors::OwoColorize;
use std::io::IsTerminal;
use std::time::Duration;

use crate::enrich::ProgressHook;
use crate::models::{EnrichedEntry, ResultTable};

/// Check if stdout is a terminal.
pub fn is_terminal() -> bool {
    std::io::stdout().is_terminal()
}

/// Status icons for different operations.
pub fn status_icon(status: Status) -> &'static str {
    match status {
        Status::Success => "✓",
        Status::Error => "✗",
        Status::Warning => "⚠",
        Status::Info => "ℹ",
        Status::Search => "🔍",
    }
}

/// Status types for colored output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Error,
    Warning,
    Info,
    Search,
}

/// Print a styled status line to stderr, keeping stdout for results.
pub fn print_status(status: Status, msg: &str) {
    let icon = status_icon(status);
    match status {
        Status::Success => eprintln!("{} {}", icon.green().bold(), msg),
        Status::Error => eprintln!("{} {}", icon.red().bold(), msg),
        Status::Warning => eprintln!("{} {}", icon.yellow().bold(), msg),
        Status::Info => eprintln!("{} {}", icon.cyan().bold(), msg),
        Status::Search => eprintln!("{} {}", icon.yellow(), msg),
    }
}

/// Print a section header.
pub fn print_section(title: &str) {
    println!();
    println!("{}", format!("━━━ {} ━━━", title).bold().cyan());
}

/// Print search results header.
pub fn print_search_header(keywords: &str, count: usize, fallbacks: usize, duration: Duration) {
    eprintln!();
    eprintln!(
        "{} Results for: \"{}\"",
        status_icon(Status::Search).yellow().bold(),
        keywords.cyan().bold()
    );
    eprintln!(
        "{} {} entries in {:.2}s",
        "─".repeat(30).dimmed(),
        count.to_string().green().bold(),
        duration.as_secs_f64()
    );
    if fallbacks > 0 {
        eprintln!(
            "{} {} fields fell back to placeholder text",
            status_icon(Status::Warning).yellow(),
            fallbacks.to_string().yellow()
        );
    }
    eprintln!();
}

/// Truncate text to at most `max_chars` characters, appending an ellipsis if cut.
pub fn truncate_with_ellipsis(text: &str, max_chars: usize) -> String {
    if max_chars <= 3 {
        return "...".to_string();
    }
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let truncated: String = text.chars().take(max_chars - 3).collect();
    format!("{}...", truncated.trim_end())
}

/// Which columns a rendered table shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableLayout {
    /// Title plus both summaries
    Compact,
    /// All five columns
    Full,
}

/// Render a result table for the terminal
pub fn render_table(results: &ResultTable, layout: TableLayout) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    match layout {
        TableLayout::Compact => {
            table.set_header(vec!["#", "Title", "Summary", "Translated Summary"]);
            for (i, entry) in results.rows().iter().enumerate() {
                table.add_row(vec![
                    Cell::new(i + 1),
                    Cell::new(truncate_with_ellipsis(&entry.title, 80)).add_attribute(Attribute::Bold),
                    Cell::new(&entry.summarized_abstract),
                    Cell::new(&entry.translated_summary),
                ]);
            }
        }
        TableLayout::Full => {
            table.set_header(EnrichedEntry::COLUMNS.to_vec());
            for entry in results {
                let row = entry.row();
                table.add_row(vec![
                    Cell::new(row[0]).add_attribute(Attribute::Bold),
                    Cell::new(row[1]),
                    Cell::new(row[2]),
                    Cell::new(row[3]),
                    Cell::new(row[4]),
                ]);
            }
        }
    }

    table.to_string()
}

/// Render entries as plain text blocks
pub fn render_plain(results: &ResultTable) -> String {
    let mut out = String::new();
    for (i, entry) in results.rows().iter().enumerate() {
        for (column, value) in EnrichedEntry::COLUMNS.iter().zip(entry.row()) {
            out.push_str(&format!("{}: {}\n", column, value));
        }
        if i + 1 < results.len() {
            out.push('\n');
        }
    }
    out
}

/// Progress bar advanced as entries finish enrichment
#[derive(Clone)]
pub struct EnrichProgress {
    bar: indicatif::ProgressBar,
}

impl EnrichProgress {
    /// Create a hidden bar; it is shown once the entry count is known
    pub fn new() -> Self {
        let bar = indicatif::ProgressBar::new(0);
        bar.set_style(
            indicatif::ProgressStyle::with_template(
                "{spinner:.cyan} Enriching [{wide_bar:.cyan/blue}] {pos}/{len} {elapsed}",
            )
            .unwrap()
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
            .progress_chars("█▉ "),
        );
        bar.set_draw_target(indicatif::ProgressDrawTarget::hidden());
        Self { bar }
    }

    /// Hook to hand to the scheduler
    pub fn hook(&self) -> ProgressHook {
        let bar = self.bar.clone();
        std::sync::Arc::new(move |completed, total| {
            if bar.length() != Some(total as u64) {
                bar.set_length(total as u64);
                bar.set_draw_target(indicatif::ProgressDrawTarget::stderr());
            }
            bar.set_position(completed as u64);
        })
    }

    /// Clear the bar from the terminal
    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl Default for EnrichProgress {
    fn default() -> Self {
        Self::new()
    }
}
