//! Postgres-backed job store

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use super::{JobCompletion, JobStore};
use crate::error::StoreError;
use crate::models::{InferenceJob, PredictionSummary, TrafficFile};

#[derive(Debug, Clone)]
pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn create_file(&self, file: &TrafficFile) -> Result<(), StoreError> {
        file.insert(&self.pool).await?;
        Ok(())
    }

    async fn create_job(&self, job: &InferenceJob) -> Result<(), StoreError> {
        job.insert(&self.pool).await?;
        Ok(())
    }

    async fn find_job(&self, job_id: Uuid) -> Result<Option<InferenceJob>, StoreError> {
        Ok(InferenceJob::find_by_id(&self.pool, job_id).await?)
    }

    async fn find_file(&self, file_id: Uuid) -> Result<Option<TrafficFile>, StoreError> {
        Ok(TrafficFile::find_by_id(&self.pool, file_id).await?)
    }

    async fn find_summary(&self, job_id: Uuid) -> Result<Option<PredictionSummary>, StoreError> {
        Ok(PredictionSummary::find_by_job(&self.pool, job_id).await?)
    }

    async fn mark_running(&self, job_id: Uuid) -> Result<(), StoreError> {
        if !InferenceJob::mark_running(&self.pool, job_id, Utc::now()).await? {
            return Err(StoreError::JobNotFound(job_id));
        }
        Ok(())
    }

    async fn mark_failed(&self, job_id: Uuid, message: &str) -> Result<(), StoreError> {
        if !InferenceJob::mark_failed(&self.pool, job_id, message, Utc::now()).await? {
            return Err(StoreError::JobNotFound(job_id));
        }
        Ok(())
    }

    async fn mark_done(&self, completion: &JobCompletion) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        TrafficFile::set_rows_count(&mut *tx, completion.file_id, completion.rows_count).await?;
        completion.summary.upsert(&mut *tx).await?;

        if !InferenceJob::mark_done(&mut *tx, completion.job_id, Utc::now()).await? {
            // Dropping the transaction rolls back the summary too
            return Err(StoreError::JobNotFound(completion.job_id));
        }

        tx.commit().await?;
        Ok(())
    }
}
