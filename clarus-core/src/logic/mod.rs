//! Logic Module - Scoring Pipeline Engines
//!
//! ## Layout
//! - `ingest/` - robust CSV reader (delimiter detection) and writer
//! - `features/` - preprocessing: leakage guard, coercion, median fill, alignment
//! - `model/` - classifier backends (XGBoost JSON, ONNX), cascade, summary
//! - `provision` - ensure model artifacts exist before loading

pub mod ingest;
pub mod features;
pub mod model;
pub mod provision;
