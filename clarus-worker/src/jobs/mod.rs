//! Jobs - status rules and the processing state machine

pub mod status;
pub mod processor;

pub use status::JobStatus;
pub use processor::{JobOutcome, JobProcessor, ScoredFile};
