//! Preprocessing - raw table to model matrix
//!
//! Applied before each cascade stage with that stage's feature list:
//! drop label and identifier columns, coerce to numbers, fill missing values
//! with the batch median, drop zero-variance columns, then align to the
//! expected feature order (absent features become 0.0).

use std::collections::{HashMap, HashSet};

use ndarray::Array2;

use super::layout::{is_identifier_column, is_label_column};
use crate::logic::ingest::Table;

/// One coerced column; `None` marks a missing value
#[derive(Debug, Clone, PartialEq)]
pub struct NumericColumn {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

// ============================================================================
// PIPELINE
// ============================================================================

/// Full preprocessing for one stage: `[rows, features.len()]` in feature order
pub fn preprocess(table: &Table, features: &[String]) -> Array2<f32> {
    let mut columns = numeric_columns(table);

    for column in &mut columns {
        fill_median(column);
    }
    columns.retain(|c| distinct_count(&c.values) > 1);

    align(&columns, features, table.n_rows())
}

/// Trim names, drop label / identifier columns, coerce every cell.
///
/// Duplicate names keep their first occurrence.
pub fn numeric_columns(table: &Table) -> Vec<NumericColumn> {
    let mut seen = HashSet::new();

    table
        .columns()
        .iter()
        .enumerate()
        .filter_map(|(index, raw)| {
            let name = raw.trim();
            if is_label_column(name) || is_identifier_column(name) {
                return None;
            }
            if !seen.insert(name) {
                return None;
            }
            Some(NumericColumn {
                name: name.to_string(),
                values: table.column(index).map(parse_cell).collect(),
            })
        })
        .collect()
}

/// Build the model matrix in `features` order; absent features are 0.0
pub fn align(columns: &[NumericColumn], features: &[String], n_rows: usize) -> Array2<f32> {
    let by_name: HashMap<&str, &NumericColumn> =
        columns.iter().map(|c| (c.name.as_str(), c)).collect();

    let mut matrix = Array2::<f32>::zeros((n_rows, features.len()));

    for (j, feature) in features.iter().enumerate() {
        if let Some(column) = by_name.get(feature.as_str()) {
            for (i, value) in column.values.iter().enumerate() {
                matrix[[i, j]] = value.map(|v| v as f32).unwrap_or(f32::NAN);
            }
        }
    }

    matrix
}

// ============================================================================
// STEPS
// ============================================================================

/// Numeric value of a cell, `None` when blank or unparseable
pub fn parse_cell(cell: &str) -> Option<f64> {
    cell.trim().parse::<f64>().ok().filter(|v| !v.is_nan())
}

/// Median of the present values (mean of the two middle ones for even counts)
pub fn median(values: &[Option<f64>]) -> Option<f64> {
    let mut present: Vec<f64> = values.iter().flatten().copied().collect();
    if present.is_empty() {
        return None;
    }
    present.sort_by(|a, b| a.total_cmp(b));

    let mid = present.len() / 2;
    if present.len() % 2 == 0 {
        Some((present[mid - 1] + present[mid]) / 2.0)
    } else {
        Some(present[mid])
    }
}

/// Replace missing values with the column median; all-missing columns stay missing
pub fn fill_median(column: &mut NumericColumn) {
    if let Some(m) = median(&column.values) {
        for value in column.values.iter_mut().filter(|v| v.is_none()) {
            *value = Some(m);
        }
    }
}

/// Number of distinct values, counting "missing" as one value
pub fn distinct_count(values: &[Option<f64>]) -> usize {
    values
        .iter()
        .map(|v| v.map(|x| if x == 0.0 { 0u64 } else { x.to_bits() }))
        .collect::<HashSet<_>>()
        .len()
}
