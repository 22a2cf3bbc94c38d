//! Central Configuration Constants
//!
//! Single source of truth for artifact names and default locations.
//! Both the worker and the `clarus-score` tool read paths through here.

use std::path::PathBuf;

/// Default directory the worker loads model artifacts from (a mounted volume)
pub const DEFAULT_MODEL_DIR: &str = "/data/models";

/// Directory baked into the image, used to seed an empty model volume
pub const DEFAULT_MODEL_SOURCE_DIR: &str = "/app/models";

/// Binary (attack / benign) classifier
pub const BINARY_MODEL_FILE: &str = "xgb_bin.json";

/// Multiclass (attack type) classifier
pub const MULTICLASS_MODEL_FILE: &str = "xgb_multi.json";

/// Class index -> label mapping for the multiclass stage
pub const CLASS_MAPPING_FILE: &str = "class_mapping.json";

/// Ordered feature names expected by the binary stage
pub const BINARY_FEATURES_FILE: &str = "features_bin.json";

/// Ordered feature names expected by the multiclass stage
pub const MULTICLASS_FEATURES_FILE: &str = "features_multi.json";

/// Label used for rows the binary stage does not flag
pub const BENIGN_LABEL: &str = "benign";

/// Output column: 0/1 attack flag
pub const IS_ATTACK_COLUMN: &str = "is_attack";

/// Output column: attack type label (or `benign`)
pub const ATTACK_TYPE_COLUMN: &str = "attack_type";

/// Suffix replacing `.csv` for the scored artifact
pub const SCORED_SUFFIX: &str = "_scored.csv";

// ============================================
// Helper functions to read from env with fallback
// ============================================

/// Model directory from `MODEL_DIR` or default
pub fn get_model_dir() -> PathBuf {
    std::env::var("MODEL_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_MODEL_DIR))
}

/// Seed directory from `MODEL_SOURCE_DIR` or default
pub fn get_model_source_dir() -> PathBuf {
    std::env::var("MODEL_SOURCE_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_MODEL_SOURCE_DIR))
}

/// Artifact path from an env override, else `file_name` inside `model_dir`
pub fn artifact_path(env_key: &str, model_dir: &std::path::Path, file_name: &str) -> PathBuf {
    std::env::var(env_key)
        .map(PathBuf::from)
        .unwrap_or_else(|_| model_dir.join(file_name))
}
