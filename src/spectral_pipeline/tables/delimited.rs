use std::path::Path;

use csv::{ReaderBuilder, Trim};
use tracing::debug;

use crate::spectral_pipeline::common::error::{PipelineError, Result};

/// Column separator of a reference table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    Comma,
    Tab,
    /// Runs of spaces or tabs, as in the CIE matching-function table.
    Whitespace,
}

/// Reads a numeric table from disk. Every non-blank row must parse as `f64`
/// in every column.
pub fn read_table<P: AsRef<Path>>(path: P, delimiter: Delimiter) -> Result<Vec<Vec<f64>>> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .map_err(|e| PipelineError::TableReadError(path.display().to_string(), e.to_string()))?;
    let rows = parse_table(&text, delimiter, &path.display().to_string())?;
    debug!(path = %path.display(), rows = rows.len(), "Loaded reference table");
    Ok(rows)
}

/// Parses numeric rows out of `text`. `source` only labels error messages.
pub fn parse_table(text: &str, delimiter: Delimiter, source: &str) -> Result<Vec<Vec<f64>>> {
    let separator = match delimiter {
        Delimiter::Comma => b',',
        Delimiter::Tab => b'\t',
        Delimiter::Whitespace => return parse_whitespace(text, source),
    };

    let mut reader = ReaderBuilder::new()
        .delimiter(separator)
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record.map_err(|e| parse_error(source, row, e.to_string()))?;
        if record.iter().all(|field| field.is_empty()) {
            continue;
        }
        let values = record
            .iter()
            .map(|field| parse_field(field, source, row))
            .collect::<Result<Vec<f64>>>()?;
        rows.push(values);
    }
    Ok(rows)
}

fn parse_whitespace(text: &str, source: &str) -> Result<Vec<Vec<f64>>> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(row, line)| {
            line.split_whitespace()
                .map(|field| parse_field(field, source, row))
                .collect::<Result<Vec<f64>>>()
        })
        .collect()
}

fn parse_field(field: &str, source: &str, row: usize) -> Result<f64> {
    field
        .parse::<f64>()
        .map_err(|_| parse_error(source, row, format!("'{}' is not a number", field)))
}

fn parse_error(source: &str, row: usize, reason: String) -> PipelineError {
    PipelineError::TableParseError {
        path: source.to_string(),
        row,
        reason,
    }
}
