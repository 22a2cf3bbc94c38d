//! Features Module - Feature Preparation Engine
//!
//! Turns a raw uploaded table into the exact matrix a model was trained on.
//! The same steps run before the binary and the multiclass stage.

pub mod layout;
pub mod preprocess;

#[cfg(test)]
mod tests;

// Re-export common types
pub use layout::{layout_hash, LayoutInfo, IDENTIFIER_COLUMNS, LABEL_COLUMNS};
pub use preprocess::{preprocess, NumericColumn};
