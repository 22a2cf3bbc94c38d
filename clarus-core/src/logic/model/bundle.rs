//! Feature Bundle - binary -> multiclass cascade
//!
//! Loaded once per process and shared read-only by every job.
//!
//! ## Flow:
//! 1. Preprocess the whole table against the binary feature list
//! 2. Binary stage flags attack rows (with P(attack) when available)
//! 3. Only flagged rows are preprocessed again against the multiclass list
//! 4. Multiclass stage picks the attack type; benign rows stay `benign`

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use ndarray::Array2;
use serde::Serialize;

use super::{load_classifier, Classifier, ModelError, ScoreSummary};
use crate::constants::{
    artifact_path, ATTACK_TYPE_COLUMN, BENIGN_LABEL, BINARY_FEATURES_FILE, BINARY_MODEL_FILE,
    CLASS_MAPPING_FILE, IS_ATTACK_COLUMN, MULTICLASS_FEATURES_FILE, MULTICLASS_MODEL_FILE,
};
use crate::logic::features::{preprocess, LayoutInfo, LABEL_COLUMNS};
use crate::logic::ingest::{Delimiter, Table};

// ============================================================================
// ARTIFACT PATHS
// ============================================================================

/// Locations of the five artifacts a bundle is built from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundlePaths {
    pub binary_model: PathBuf,
    pub multiclass_model: PathBuf,
    pub class_mapping: PathBuf,
    pub binary_features: PathBuf,
    pub multiclass_features: PathBuf,
}

impl BundlePaths {
    /// Default file names inside `dir`
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            binary_model: dir.join(BINARY_MODEL_FILE),
            multiclass_model: dir.join(MULTICLASS_MODEL_FILE),
            class_mapping: dir.join(CLASS_MAPPING_FILE),
            binary_features: dir.join(BINARY_FEATURES_FILE),
            multiclass_features: dir.join(MULTICLASS_FEATURES_FILE),
        }
    }

    /// Paths from `XGB_*` overrides, defaulting to file names inside `model_dir`
    pub fn from_env(model_dir: &Path) -> Self {
        Self {
            binary_model: artifact_path("XGB_BIN_PATH", model_dir, BINARY_MODEL_FILE),
            multiclass_model: artifact_path("XGB_MULTI_PATH", model_dir, MULTICLASS_MODEL_FILE),
            class_mapping: artifact_path("XGB_CLASS_MAPPING_PATH", model_dir, CLASS_MAPPING_FILE),
            binary_features: artifact_path("XGB_FEATURES_BIN_PATH", model_dir, BINARY_FEATURES_FILE),
            multiclass_features: artifact_path(
                "XGB_FEATURES_MULTI_PATH",
                model_dir,
                MULTICLASS_FEATURES_FILE,
            ),
        }
    }

    pub fn all(&self) -> Vec<PathBuf> {
        vec![
            self.binary_model.clone(),
            self.multiclass_model.clone(),
            self.class_mapping.clone(),
            self.binary_features.clone(),
            self.multiclass_features.clone(),
        ]
    }
}

// ============================================================================
// SCORES
// ============================================================================

/// Cascade result for one row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowScore {
    pub is_attack: bool,
    /// P(attack) from the binary stage; `None` when the backend has no probabilities
    pub attack_probability: Option<f32>,
    pub attack_type: String,
    /// Max class probability from the multiclass stage; `None` for benign rows
    pub type_confidence: Option<f32>,
}

impl RowScore {
    fn benign(attack_probability: Option<f32>) -> Self {
        Self {
            is_attack: false,
            attack_probability,
            attack_type: BENIGN_LABEL.to_string(),
            type_confidence: None,
        }
    }
}

/// Delivered table (input minus label columns, plus the two output columns)
/// together with the per-row scores it was built from
#[derive(Debug, Clone)]
pub struct ScoredTable {
    pub table: Table,
    pub scores: Vec<RowScore>,
}

impl ScoredTable {
    pub fn summary(&self) -> Result<ScoreSummary, ModelError> {
        super::summarize(&self.table)
    }
}

// ============================================================================
// BUNDLE
// ============================================================================

pub struct FeatureBundle {
    binary: Box<dyn Classifier>,
    multiclass: Box<dyn Classifier>,
    binary_features: Vec<String>,
    multiclass_features: Vec<String>,
    class_mapping: BTreeMap<usize, String>,
}

impl FeatureBundle {
    /// Load both classifiers, both feature lists and the class mapping
    pub fn load(paths: &BundlePaths) -> Result<Self, ModelError> {
        let binary = load_classifier(&paths.binary_model)?;
        let multiclass = load_classifier(&paths.multiclass_model)?;
        let binary_features = load_feature_list(&paths.binary_features)?;
        let multiclass_features = load_feature_list(&paths.multiclass_features)?;
        let class_mapping = load_class_mapping(&paths.class_mapping)?;

        let bundle = Self::from_parts(
            binary,
            multiclass,
            binary_features,
            multiclass_features,
            class_mapping,
        );

        log::info!(
            "Feature bundle loaded: binary [{}] ({}), multiclass [{}] ({}), {} classes",
            LayoutInfo::of(&bundle.binary_features),
            bundle.binary.backend(),
            LayoutInfo::of(&bundle.multiclass_features),
            bundle.multiclass.backend(),
            bundle.class_mapping.len()
        );

        Ok(bundle)
    }

    pub fn from_parts(
        binary: Box<dyn Classifier>,
        multiclass: Box<dyn Classifier>,
        binary_features: Vec<String>,
        multiclass_features: Vec<String>,
        class_mapping: BTreeMap<usize, String>,
    ) -> Self {
        Self {
            binary,
            multiclass,
            binary_features,
            multiclass_features,
            class_mapping,
        }
    }

    pub fn binary_features(&self) -> &[String] {
        &self.binary_features
    }

    pub fn multiclass_features(&self) -> &[String] {
        &self.multiclass_features
    }

    pub fn class_mapping(&self) -> &BTreeMap<usize, String> {
        &self.class_mapping
    }

    /// Label for a multiclass index; unmapped indices use their decimal text
    pub fn class_label(&self, index: usize) -> String {
        self.class_mapping
            .get(&index)
            .cloned()
            .unwrap_or_else(|| index.to_string())
    }

    pub fn preprocess_binary(&self, table: &Table) -> Array2<f32> {
        preprocess(table, &self.binary_features)
    }

    pub fn preprocess_multiclass(&self, table: &Table) -> Array2<f32> {
        preprocess(table, &self.multiclass_features)
    }

    // ------------------------------------------------------------------------
    // Schema guard
    // ------------------------------------------------------------------------

    /// Number of parsed column names (trimmed) found in the binary feature list
    pub fn schema_overlap(&self, columns: &[String]) -> usize {
        let expected: HashSet<&str> = self.binary_features.iter().map(|f| f.trim()).collect();
        columns
            .iter()
            .map(|c| c.trim())
            .collect::<HashSet<_>>()
            .intersection(&expected)
            .count()
    }

    /// Smallest acceptable overlap: max(3, 10% of the binary feature count)
    pub fn min_overlap(&self) -> usize {
        (self.binary_features.len() / 10).max(3)
    }

    /// Reject tables whose columns barely match the trained features
    pub fn check_schema(&self, table: &Table, delimiter: Delimiter) -> Result<usize, ModelError> {
        let overlap = self.schema_overlap(table.columns());
        if overlap < self.min_overlap() {
            return Err(ModelError::SchemaMismatch {
                delimiter: delimiter.to_string(),
                parsed_cols: table.n_cols(),
                overlap,
            });
        }
        Ok(overlap)
    }

    // ------------------------------------------------------------------------
    // Cascade
    // ------------------------------------------------------------------------

    /// Per-row cascade scores, in input order
    pub fn score(&self, table: &Table) -> Result<Vec<RowScore>, ModelError> {
        let n_rows = table.n_rows();
        if n_rows == 0 {
            return Ok(Vec::new());
        }

        let binary = self.binary.predict(&self.preprocess_binary(table))?;
        check_len("binary", binary.classes.len(), n_rows)?;

        let mut scores: Vec<RowScore> = (0..n_rows)
            .map(|i| {
                let mut score = RowScore::benign(binary.probability(i, 1));
                score.is_attack = binary.classes[i] == 1;
                score
            })
            .collect();

        let attack_rows: Vec<usize> = (0..n_rows).filter(|&i| scores[i].is_attack).collect();
        if attack_rows.is_empty() {
            return Ok(scores);
        }

        let subset = table.select_rows(&attack_rows);
        let multi = self.multiclass.predict(&self.preprocess_multiclass(&subset))?;
        check_len("multiclass", multi.classes.len(), attack_rows.len())?;

        for (k, &row) in attack_rows.iter().enumerate() {
            scores[row].attack_type = self.class_label(multi.classes[k]);
            scores[row].type_confidence = multi.max_probability(k);
        }

        log::debug!("Cascade scored {} rows, {} flagged", n_rows, attack_rows.len());

        Ok(scores)
    }

    /// Delivered table: input columns minus label columns, plus
    /// `is_attack` (0/1) and `attack_type`
    pub fn predict_rows(&self, table: &Table) -> Result<ScoredTable, ModelError> {
        let scores = self.score(table)?;

        let mut out = table.without_columns(LABEL_COLUMNS);
        out.set_column(
            IS_ATTACK_COLUMN,
            scores
                .iter()
                .map(|s| if s.is_attack { "1" } else { "0" }.to_string())
                .collect(),
        );
        out.set_column(
            ATTACK_TYPE_COLUMN,
            scores.iter().map(|s| s.attack_type.clone()).collect(),
        );

        Ok(ScoredTable { table: out, scores })
    }
}

// ============================================================================
// ARTIFACT LOADING
// ============================================================================

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ModelError> {
    if !path.exists() {
        return Err(ModelError::NotFound(path.to_path_buf()));
    }
    let text = std::fs::read_to_string(path).map_err(|source| ModelError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| ModelError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Ordered JSON array of feature names
pub fn load_feature_list(path: &Path) -> Result<Vec<String>, ModelError> {
    read_json(path)
}

/// JSON object `{"<index>": "<label>"}`; non-string labels use their JSON text
pub fn load_class_mapping(path: &Path) -> Result<BTreeMap<usize, String>, ModelError> {
    let raw: BTreeMap<String, serde_json::Value> = read_json(path)?;

    raw.into_iter()
        .map(|(key, value)| {
            let index = key.trim().parse::<usize>().map_err(|_| ModelError::InvalidModel {
                path: path.to_path_buf(),
                reason: format!("class index '{}' is not an integer", key),
            })?;
            let label = match value {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            Ok((index, label))
        })
        .collect()
}

fn check_len(stage: &str, got: usize, expected: usize) -> Result<(), ModelError> {
    if got != expected {
        return Err(ModelError::Inference(format!(
            "{} stage returned {} predictions for {} rows",
            stage, got, expected
        )));
    }
    Ok(())
}
