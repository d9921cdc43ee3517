//! Persisting a result table to disk.
//!
//! The file is named after the search keywords and holds the five columns in
//! their fixed order (see [`EnrichedEntry::COLUMNS`]).

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::models::{EnrichedEntry, ResultTable};

/// Something that can persist a [`ResultTable`]
pub trait TableExporter: Send + Sync + std::fmt::Debug {
    /// Write `table`, naming the file after `keywords`, and return its path
    fn export(&self, table: &ResultTable, keywords: &str) -> Result<PathBuf, ExportError>;
}

/// Errors raised while exporting
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid file name: {0}")]
    InvalidFilename(String),
}

/// On-disk format of an export
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
    /// Skip exporting
    None,
}

impl ExportFormat {
    pub fn extension(&self) -> Option<&'static str> {
        match self {
            ExportFormat::Csv => Some("csv"),
            ExportFormat::Json => Some("json"),
            ExportFormat::None => None,
        }
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            "none" | "off" => Ok(ExportFormat::None),
            other => Err(format!("unknown export format: {}", other)),
        }
    }
}

/// Turn a keyword string into a safe file stem.
///
/// Runs of characters other than letters, digits, `_` and `-` collapse into a
/// single `_`; an input with nothing usable becomes `results`.
pub fn file_stem_for(keywords: &str) -> String {
    static UNSAFE: OnceLock<Regex> = OnceLock::new();
    let unsafe_chars = UNSAFE.get_or_init(|| Regex::new(r"[^\p{L}\p{N}_-]+").unwrap());

    let stem = unsafe_chars.replace_all(keywords.trim(), "_");
    let stem = stem.trim_matches('_');
    if stem.is_empty() {
        "results".to_string()
    } else {
        stem.to_string()
    }
}

/// Writes tables as files in a directory
#[derive(Debug, Clone)]
pub struct FileExporter {
    directory: PathBuf,
    format: ExportFormat,
}

impl FileExporter {
    pub fn new(directory: impl Into<PathBuf>, format: ExportFormat) -> Self {
        Self {
            directory: directory.into(),
            format,
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn format(&self) -> ExportFormat {
        self.format
    }

    /// Path the export for `keywords` is written to
    pub fn path_for(&self, keywords: &str) -> Result<PathBuf, ExportError> {
        let extension = self
            .format
            .extension()
            .ok_or_else(|| ExportError::InvalidFilename("export disabled".to_string()))?;
        Ok(self
            .directory
            .join(format!("{}.{}", file_stem_for(keywords), extension)))
    }
}

impl TableExporter for FileExporter {
    fn export(&self, table: &ResultTable, keywords: &str) -> Result<PathBuf, ExportError> {
        let path = self.path_for(keywords)?;
        std::fs::create_dir_all(&self.directory)?;

        match self.format {
            ExportFormat::Csv => write_csv(std::fs::File::create(&path)?, table)?,
            ExportFormat::Json => std::fs::write(&path, serde_json::to_string_pretty(table.rows())?)?,
            ExportFormat::None => return Err(ExportError::InvalidFilename("export disabled".to_string())),
        }

        tracing::info!(path = %path.display(), rows = table.len(), "Exported results");
        Ok(path)
    }
}

/// Write the table as CSV with a header row
pub fn write_csv<W: std::io::Write>(writer: W, table: &ResultTable) -> Result<(), ExportError> {
    let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(writer);
    wtr.write_record(EnrichedEntry::COLUMNS)?;
    for entry in table {
        wtr.write_record(entry.row())?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrich::{SUMMARIZATION_FAILED, TRANSLATION_FAILED};
    use crate::models::RawEntry;
    use tempfile::tempdir;

    fn table() -> ResultTable {
        ResultTable::from_rows(vec![
            EnrichedEntry {
                title: "Attention, again".to_string(),
                r#abstract: "We say \"hi\".".to_string(),
                translated_abstract: "我们说你好".to_string(),
                summarized_abstract: "Greeting.".to_string(),
                translated_summary: "问候".to_string(),
            },
            EnrichedEntry::unenriched(&RawEntry::new("Plain", "Line one\nline two")),
        ])
    }

    #[test]
    fn test_file_stem_for() {
        assert_eq!(file_stem_for("AI, LLM"), "AI_LLM");
        assert_eq!(file_stem_for("machine learning"), "machine_learning");
        assert_eq!(file_stem_for("../../etc/passwd"), "etc_passwd");
        assert_eq!(file_stem_for("gpt-4_eval"), "gpt-4_eval");
        assert_eq!(file_stem_for("大模型"), "大模型");
        assert_eq!(file_stem_for(" ,/ "), "results");
        assert_eq!(file_stem_for(""), "results");
    }

    #[test]
    fn test_export_format_from_str() {
        assert_eq!("CSV".parse::<ExportFormat>(), Ok(ExportFormat::Csv));
        assert_eq!("json".parse::<ExportFormat>(), Ok(ExportFormat::Json));
        assert_eq!("none".parse::<ExportFormat>(), Ok(ExportFormat::None));
        assert!("xlsx".parse::<ExportFormat>().is_err());
    }

    fn csv_text(table: &ResultTable) -> String {
        let mut buf = Vec::new();
        write_csv(&mut buf, table).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_csv_quotes_and_column_order() {
        let csv = csv_text(&table());
        let mut lines = csv.lines();

        assert_eq!(
            lines.next().unwrap(),
            "Title,Abstract,Translated Abstract,Summarized Abstract,Translated Summary"
        );
        assert_eq!(
            lines.next().unwrap(),
            "\"Attention, again\",\"We say \"\"hi\"\".\",我们说你好,Greeting.,问候"
        );
        assert!(csv.contains(&format!(
            "Plain,\"Line one\nline two\",{},{},{}",
            TRANSLATION_FAILED, SUMMARIZATION_FAILED, TRANSLATION_FAILED
        )));
    }

    #[test]
    fn test_csv_reads_back_field_for_field() {
        let table = ResultTable::from_rows(vec![EnrichedEntry {
            title: "Commas, \"quotes\"\r\nand breaks".to_string(),
            r#abstract: "\"".to_string(),
            translated_abstract: ",".to_string(),
            summarized_abstract: "a\rb".to_string(),
            translated_summary: "x\"\"y".to_string(),
        }]);
        let csv = csv_text(&table);

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(csv.as_bytes());
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.iter().collect::<Vec<_>>(), EnrichedEntry::COLUMNS);

        let records: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].iter().collect::<Vec<_>>(), table.rows()[0].row());
    }

    #[test]
    fn test_csv_export_writes_named_file() {
        let dir = tempdir().unwrap();
        let exporter = FileExporter::new(dir.path().join("out"), ExportFormat::Csv);

        let path = exporter.export(&table(), "AI, LLM").unwrap();

        assert_eq!(path, dir.path().join("out").join("AI_LLM.csv"));
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, csv_text(&table()));
    }

    #[test]
    fn test_json_export() {
        let dir = tempdir().unwrap();
        let exporter = FileExporter::new(dir.path(), ExportFormat::Json);

        let path = exporter.export(&table(), "vision").unwrap();
        assert_eq!(path.file_name().unwrap(), "vision.json");

        let rows: Vec<serde_json::Value> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["title"], "Attention, again");
        assert_eq!(rows[0]["abstract"], "We say \"hi\".");
        assert_eq!(rows[1]["summarized_abstract"], SUMMARIZATION_FAILED);
    }

    #[test]
    fn test_disabled_export_errors() {
        let exporter = FileExporter::new(".", ExportFormat::None);
        assert!(matches!(
            exporter.export(&table(), "x"),
            Err(ExportError::InvalidFilename(_))
        ));
    }
}
