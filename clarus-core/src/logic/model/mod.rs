//! Model Module - Classification Cascade
//!
//! Keeps inference separate from ingestion: the cascade only sees a
//! `Table` and a pair of `Classifier`s, so backends can be swapped.
//!
//! - `xgboost` - gradient-boosted trees from XGBoost's JSON model format
//! - `inference` - ONNX Runtime sessions
//! - `bundle` - binary -> multiclass cascade with feature alignment
//! - `summary` - per-job aggregate statistics

pub mod xgboost;
pub mod inference;
pub mod bundle;
pub mod summary;


use std::path::{Path, PathBuf};

use ndarray::Array2;

// Re-export common types
pub use bundle::{BundlePaths, FeatureBundle, RowScore, ScoredTable};
pub use inference::OnnxClassifier;
pub use summary::{summarize, ScoreSummary};
pub use xgboost::XgbClassifier;

// ============================================================================
// ERROR HANDLING
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Model artifact not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid model {path}: {reason}")]
    InvalidModel { path: PathBuf, reason: String },

    #[error("Unsupported objective '{0}'")]
    UnsupportedObjective(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error(
        "CSV columns do not match trained feature set. Detected sep='{delimiter}', \
         parsed_cols={parsed_cols}, overlap_with_features={overlap}. \
         Most likely wrong separator or wrong dataset schema."
    )]
    SchemaMismatch {
        delimiter: String,
        parsed_cols: usize,
        overlap: usize,
    },

    #[error("Scored table is missing column '{0}'")]
    MissingColumn(&'static str),
}

// ============================================================================
// CLASSIFIER TRAIT
// ============================================================================

/// Per-row output of one classifier run
#[derive(Debug, Clone, Default)]
pub struct Prediction {
    /// Predicted class index per row
    pub classes: Vec<usize>,
    /// `[rows, classes]` probabilities, when the backend can provide them
    pub probabilities: Option<Array2<f32>>,
}

impl Prediction {
    /// Probability of `class` for `row`, if known
    pub fn probability(&self, row: usize, class: usize) -> Option<f32> {
        self.probabilities
            .as_ref()
            .and_then(|p| p.get((row, class)).copied())
    }

    /// Highest class probability for `row`, if known
    pub fn max_probability(&self, row: usize) -> Option<f32> {
        let probabilities = self.probabilities.as_ref()?;
        if row >= probabilities.nrows() {
            return None;
        }
        probabilities.row(row).iter().copied().reduce(f32::max)
    }
}

/// Trait for classifier backends (XGBoost JSON, ONNX, ...)
///
/// Input is an aligned `[rows, features]` matrix; NaN marks a missing value.
pub trait Classifier: Send + Sync {
    fn predict(&self, features: &Array2<f32>) -> Result<Prediction, ModelError>;

    /// Short backend name for logs
    fn backend(&self) -> &'static str;
}

/// Load a classifier, picking the backend from the file extension
pub fn load_classifier(path: &Path) -> Result<Box<dyn Classifier>, ModelError> {
    if !path.exists() {
        return Err(ModelError::NotFound(path.to_path_buf()));
    }

    let is_onnx = path
        .extension()
        .map(|e| e.eq_ignore_ascii_case("onnx"))
        .unwrap_or(false);

    if is_onnx {
        Ok(Box::new(OnnxClassifier::load(path)?))
    } else {
        Ok(Box::new(XgbClassifier::load(path)?))
    }
}
