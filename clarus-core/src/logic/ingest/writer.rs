use std::path::Path;

use ::csv::Writer;

use super::{CsvError, Table};
use crate::constants::SCORED_SUFFIX;

/// Write `table` as comma-separated CSV, header first
pub fn write_csv(table: &Table, path: &Path) -> Result<(), CsvError> {
    let mut writer = Writer::from_path(path)?;
    writer.write_record(table.columns())?;
    for row in table.rows() {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Scored artifact name for an upload: `x.csv` -> `x_scored.csv`, `x` -> `x_scored.csv`
pub fn scored_file_name(stored_path: &Path) -> String {
    let base = stored_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    if base.to_ascii_lowercase().ends_with(".csv") {
        format!("{}{}", &base[..base.len() - 4], SCORED_SUFFIX)
    } else {
        format!("{}{}", base, SCORED_SUFFIX)
    }
}
