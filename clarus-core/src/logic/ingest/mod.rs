//! Ingest Module - Uploaded CSV In, Scored CSV Out
//!
//! Uploads arrive with whatever separator the user's tooling produced.
//! The reader picks the delimiter that best matches the model's feature
//! list; the writer always emits comma-separated output.

pub mod table;
pub mod reader;
pub mod writer;

#[cfg(test)]
mod tests;

pub use table::Table;
pub use reader::{read_csv_robust, read_csv_with, Delimiter};
pub use writer::{scored_file_name, write_csv};

/// Errors raised while reading or writing CSV files
#[derive(Debug, thiserror::Error)]
pub enum CsvError {
    #[error("Empty file")]
    Empty,

    #[error("Error tokenizing data. Expected {expected} fields in line {line}, saw {found}")]
    Malformed {
        line: u64,
        expected: usize,
        found: usize,
    },

    #[error("{0}")]
    Parse(#[from] ::csv::Error),

    #[error("{0}")]
    Io(#[from] std::io::Error),
}
