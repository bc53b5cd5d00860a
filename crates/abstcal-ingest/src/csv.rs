//! Delimited-file reading into a header-indexed string table.

use std::path::Path;

use anyhow::{Context, Result};
use csv::ReaderBuilder;
use tracing::debug;

/// A loaded delimited file: normalized headers plus string cells.
#[derive(Debug, Clone)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

// BOM first: a leading BOM shields inner whitespace from `trim`.
fn normalize_header(raw: &str) -> String {
    raw.trim_matches('\u{feff}').trim().to_string()
}

fn normalize_cell(raw: &str) -> String {
    raw.trim_matches('\u{feff}').trim().to_string()
}

/// Delimiter by file extension: tab for `.txt`/`.tsv`, comma otherwise.
fn delimiter_for(path: &Path) -> u8 {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("txt") || ext.eq_ignore_ascii_case("tsv") => b'\t',
        _ => b',',
    }
}

impl RawTable {
    /// Read a delimited file, trimming BOM and surrounding whitespace from
    /// headers and cells.
    pub fn read(path: &Path) -> Result<Self> {
        let delimiter = delimiter_for(path);
        let mut reader = ReaderBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .from_path(path)
            .with_context(|| format!("open {}", path.display()))?;
        let headers = reader
            .headers()
            .with_context(|| format!("read headers of {}", path.display()))?
            .iter()
            .map(normalize_header)
            .collect::<Vec<_>>();
        let mut rows = Vec::new();
        for record in reader.records() {
            let record =
                record.with_context(|| format!("read record from {}", path.display()))?;
            rows.push(record.iter().map(normalize_cell).collect());
        }
        debug!(path = %path.display(), rows = rows.len(), "loaded delimited file");
        Ok(Self { headers, rows })
    }

    /// Index of a header, matched case-insensitively.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers
            .iter()
            .position(|header| header.eq_ignore_ascii_case(name))
    }

    /// Cell text at (row, column); empty when the row is short.
    pub fn cell<'a>(&'a self, row: &'a [String], column: usize) -> &'a str {
        row.get(column).map_or("", String::as_str)
    }
}
