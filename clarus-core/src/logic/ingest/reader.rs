//! Robust CSV Reader - delimiter auto-detection
//!
//! Strategy:
//! 1. Parse with comma (errors here propagate).
//! 2. One column whose header holds `;` or tab at least twice -> re-parse with it.
//! 3. With expected columns, try `;` and tab too and keep the parse whose
//!    column names overlap the expected set the most (comma wins ties).

use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use ::csv::{ByteRecord, ReaderBuilder};

use super::{CsvError, Table};

// ============================================================================
// DELIMITER
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Delimiter {
    Comma,
    Semicolon,
    Tab,
}

impl Delimiter {
    pub fn as_byte(self) -> u8 {
        match self {
            Delimiter::Comma => b',',
            Delimiter::Semicolon => b';',
            Delimiter::Tab => b'\t',
        }
    }

    /// The literal separator character
    pub fn as_str(self) -> &'static str {
        match self {
            Delimiter::Comma => ",",
            Delimiter::Semicolon => ";",
            Delimiter::Tab => "\t",
        }
    }
}

impl fmt::Display for Delimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Delimiter::Tab => f.write_str("\\t"),
            other => f.write_str(other.as_str()),
        }
    }
}

// ============================================================================
// READING
// ============================================================================

/// Read `path`, detecting the delimiter.
///
/// Returns the parsed table (column names trimmed) and the delimiter used.
pub fn read_csv_robust(
    path: &Path,
    expected_columns: Option<&[String]>,
) -> Result<(Table, Delimiter), CsvError> {
    let table = read_csv_with(path, Delimiter::Comma)?;

    if table.n_cols() == 1 {
        if let Some(delimiter) = guess_from_header(&table.columns()[0]) {
            log::debug!("Single-column header, re-reading {:?} with '{}'", path, delimiter);
            let table = read_csv_with(path, delimiter)?;
            return Ok((table, delimiter));
        }
    }

    let Some(expected) = expected_columns else {
        return Ok((table, Delimiter::Comma));
    };
    let expected: HashSet<&str> = expected.iter().map(|c| c.trim()).collect();

    let mut best_score = overlap(&table, &expected);
    let mut best = (table, Delimiter::Comma);

    for delimiter in [Delimiter::Semicolon, Delimiter::Tab] {
        match read_csv_with(path, delimiter) {
            Ok(candidate) => {
                let score = overlap(&candidate, &expected);
                if score > best_score {
                    best_score = score;
                    best = (candidate, delimiter);
                }
            }
            Err(e) => {
                log::debug!("Skipping delimiter '{}' for {:?}: {}", delimiter, path, e);
            }
        }
    }

    Ok(best)
}

/// Parse `path` with a fixed delimiter.
///
/// Blank lines are skipped, short rows padded with empty cells; a row with
/// more fields than the header is an error.
pub fn read_csv_with(path: &Path, delimiter: Delimiter) -> Result<Table, CsvError> {
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter.as_byte())
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;

    let headers = reader.byte_headers()?.clone();
    if headers.is_empty() || (headers.len() == 1 && headers[0].is_empty()) {
        return Err(CsvError::Empty);
    }

    let columns: Vec<String> = headers
        .iter()
        .enumerate()
        .map(|(i, raw)| header_name(i, raw))
        .collect();
    let width = columns.len();

    let mut rows = Vec::new();
    let mut record = ByteRecord::new();
    while reader.read_byte_record(&mut record)? {
        if record.len() <= 1 && record.iter().all(|f| f.is_empty()) {
            continue;
        }
        if record.len() > width {
            return Err(CsvError::Malformed {
                line: record.position().map(|p| p.line()).unwrap_or(0),
                expected: width,
                found: record.len(),
            });
        }
        rows.push(
            record
                .iter()
                .map(|field| String::from_utf8_lossy(field).into_owned())
                .collect(),
        );
    }

    Ok(Table::new(columns, rows))
}

// ============================================================================
// HELPERS
// ============================================================================

fn header_name(index: usize, raw: &[u8]) -> String {
    let name = String::from_utf8_lossy(raw);
    let name = if index == 0 {
        name.trim_start_matches('\u{feff}')
    } else {
        &*name
    };
    name.trim().to_string()
}

fn guess_from_header(header: &str) -> Option<Delimiter> {
    if header.matches(';').count() >= 2 {
        return Some(Delimiter::Semicolon);
    }
    if header.matches('\t').count() >= 2 {
        return Some(Delimiter::Tab);
    }
    None
}

fn overlap(table: &Table, expected: &HashSet<&str>) -> usize {
    table
        .columns()
        .iter()
        .map(|c| c.trim())
        .collect::<HashSet<_>>()
        .intersection(expected)
        .count()
}
