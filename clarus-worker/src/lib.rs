//! Clarus Worker
//!
//! Job store, durable queue hand-off and the inference worker.
//!
//! ```text
//!  upload ──► Intake ──► traffic_files + inference_jobs (queued)
//!                  │
//!                  └──► ml_jobs queue {"job_id": ...}
//!                              │
//!                              ▼
//!                        JobConsumer (prefetch 1)
//!                              │
//!                              ▼
//!                        JobProcessor ──► FeatureBundle (clarus-core)
//!                              │
//!                              ▼
//!                 inference_jobs (done/failed) + prediction_summaries
//! ```

pub mod config;
pub mod db;
pub mod error;
pub mod gate;
pub mod intake;
pub mod jobs;
pub mod models;
pub mod queue;
pub mod store;

pub use config::Config;
pub use error::{IntakeError, QueueError, StoreError, WorkerError, WorkerResult};
pub use gate::{PgSubscriptionGate, StaticGate, SubscriptionGate};
pub use intake::{Accepted, Intake};
pub use jobs::{JobOutcome, JobProcessor, JobStatus};
pub use queue::{AmqpPublisher, DeliveryOutcome, JobConsumer, JobMessage, JobPublisher};
pub use store::{JobCompletion, JobStore, MemoryJobStore, PgJobStore};
