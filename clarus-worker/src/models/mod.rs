//! Data models

pub mod traffic_file;
pub mod inference_job;
pub mod prediction_summary;

pub use traffic_file::*;
pub use inference_job::*;
pub use prediction_summary::*;
