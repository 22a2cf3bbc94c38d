//! Clarus Core - traffic CSV scoring
//!
//! Everything needed to turn an uploaded traffic CSV into a scored table,
//! without a database or a broker:
//!
//! - `logic::ingest` - delimiter-detecting CSV reader and scored-file writer
//! - `logic::features` - preprocessing and feature alignment
//! - `logic::model` - classifier backends, the binary -> multiclass cascade, summaries
//! - `logic::provision` - model artifact seeding at startup

pub mod constants;
pub mod logic;

pub use logic::ingest::{read_csv_robust, write_csv, CsvError, Delimiter, Table};
pub use logic::model::{
    summarize, BundlePaths, Classifier, FeatureBundle, ModelError, RowScore, ScoreSummary,
    ScoredTable,
};
pub use logic::provision::{ensure_models_present, ProvisionError, ProvisionOutcome};
