//! Per-job aggregate statistics over a scored table

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::ModelError;
use crate::constants::{ATTACK_TYPE_COLUMN, BENIGN_LABEL, IS_ATTACK_COLUMN};
use crate::logic::ingest::Table;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreSummary {
    pub total_rows: usize,
    pub attack_rows: usize,
    /// attack_rows / total_rows, 0.0 for an empty table
    pub attack_ratio: f64,
    pub top_class: Option<String>,
    /// Share of `top_class` among attack rows only
    pub top_class_share: Option<f64>,
}

impl ScoreSummary {
    pub fn empty() -> Self {
        Self {
            total_rows: 0,
            attack_rows: 0,
            attack_ratio: 0.0,
            top_class: None,
            top_class_share: None,
        }
    }
}

/// Aggregate a table carrying `is_attack` and `attack_type` columns.
///
/// `top_class` is the most frequent attack type among attack rows; equal
/// counts go to the type seen first while scanning rows top to bottom.
pub fn summarize(scored: &Table) -> Result<ScoreSummary, ModelError> {
    let total_rows = scored.n_rows();
    if total_rows == 0 {
        return Ok(ScoreSummary::empty());
    }

    let attack_idx = scored
        .column_index(IS_ATTACK_COLUMN)
        .ok_or(ModelError::MissingColumn(IS_ATTACK_COLUMN))?;
    let type_idx = scored
        .column_index(ATTACK_TYPE_COLUMN)
        .ok_or(ModelError::MissingColumn(ATTACK_TYPE_COLUMN))?;

    // (label, count) in first-seen order, plus a position index
    let mut counts: Vec<(&str, usize)> = Vec::new();
    let mut position: HashMap<&str, usize> = HashMap::new();
    let mut attack_rows = 0;

    for row in scored.rows() {
        if !is_attack_cell(&row[attack_idx]) {
            continue;
        }
        attack_rows += 1;

        let label = row[type_idx].as_str();
        match position.get(label) {
            Some(&p) => counts[p].1 += 1,
            None => {
                position.insert(label, counts.len());
                counts.push((label, 1));
            }
        }
    }

    if attack_rows == 0 {
        return Ok(ScoreSummary {
            total_rows,
            attack_rows: 0,
            attack_ratio: 0.0,
            top_class: Some(BENIGN_LABEL.to_string()),
            top_class_share: Some(1.0),
        });
    }

    // Strictly greater keeps the earliest label on ties
    let mut top = counts[0];
    for &entry in &counts[1..] {
        if entry.1 > top.1 {
            top = entry;
        }
    }

    Ok(ScoreSummary {
        total_rows,
        attack_rows,
        attack_ratio: attack_rows as f64 / total_rows as f64,
        top_class: Some(top.0.to_string()),
        top_class_share: Some(top.1 as f64 / attack_rows as f64),
    })
}

fn is_attack_cell(cell: &str) -> bool {
    cell.trim().parse::<f64>().map(|v| v == 1.0).unwrap_or(false)
}
