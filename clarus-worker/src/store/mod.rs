//! Job Store - persisted files, jobs and summaries
//!
//! The processor and the intake path only talk to `JobStore`; Postgres backs
//! it in production, `MemoryJobStore` in tests and local dry runs.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{InferenceJob, PredictionSummary, TrafficFile};

pub use memory::MemoryJobStore;
pub use postgres::PgJobStore;

/// Everything written when a job succeeds, committed as one unit
#[derive(Debug, Clone, PartialEq)]
pub struct JobCompletion {
    pub job_id: Uuid,
    pub file_id: Uuid,
    pub rows_count: i32,
    pub summary: PredictionSummary,
}

#[async_trait]
pub trait JobStore: Send + Sync {
    async fn create_file(&self, file: &TrafficFile) -> Result<(), StoreError>;

    async fn create_job(&self, job: &InferenceJob) -> Result<(), StoreError>;

    async fn find_job(&self, job_id: Uuid) -> Result<Option<InferenceJob>, StoreError>;

    async fn find_file(&self, file_id: Uuid) -> Result<Option<TrafficFile>, StoreError>;

    async fn find_summary(&self, job_id: Uuid) -> Result<Option<PredictionSummary>, StoreError>;

    /// `running` + start timestamp, persisted immediately
    async fn mark_running(&self, job_id: Uuid) -> Result<(), StoreError>;

    /// `failed` + message + finish timestamp; the summary is left untouched
    async fn mark_failed(&self, job_id: Uuid, message: &str) -> Result<(), StoreError>;

    /// Row count, summary upsert and `done` status, all or nothing
    async fn mark_done(&self, completion: &JobCompletion) -> Result<(), StoreError>;
}
