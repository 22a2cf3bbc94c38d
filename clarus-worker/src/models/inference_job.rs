//! Inference job model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgExecutor};
use uuid::Uuid;

use crate::error::StoreError;
use crate::jobs::JobStatus;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct InferenceJob {
    pub id: Uuid,
    pub user_id: Uuid,
    pub file_id: Uuid,
    /// queued / running / done / failed
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

impl InferenceJob {
    /// A fresh `queued` job for an uploaded file
    pub fn queued(user_id: Uuid, file_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            file_id,
            status: JobStatus::Queued.to_string(),
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
            error_message: None,
        }
    }

    pub fn job_status(&self) -> Result<JobStatus, StoreError> {
        self.status.parse()
    }

    pub async fn insert<'e, E: PgExecutor<'e>>(&self, executor: E) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO inference_jobs (id, user_id, file_id, status, created_at, started_at, finished_at, error_message)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#
        )
        .bind(self.id)
        .bind(self.user_id)
        .bind(self.file_id)
        .bind(&self.status)
        .bind(self.created_at)
        .bind(self.started_at)
        .bind(self.finished_at)
        .bind(&self.error_message)
        .execute(executor)
        .await?;

        Ok(())
    }

    pub async fn find_by_id<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, InferenceJob>("SELECT * FROM inference_jobs WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Set `running` and the start timestamp. Returns false if no row matched.
    pub async fn mark_running<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE inference_jobs SET status = 'running', started_at = $2 WHERE id = $1"
        )
        .bind(id)
        .bind(at)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Set `failed` with a message and the finish timestamp
    pub async fn mark_failed<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
        message: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE inference_jobs
            SET status = 'failed', error_message = $2, finished_at = $3
            WHERE id = $1
            "#
        )
        .bind(id)
        .bind(message)
        .bind(at)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Set `done`, clear any previous error, set the finish timestamp
    pub async fn mark_done<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE inference_jobs
            SET status = 'done', error_message = NULL, finished_at = $2
            WHERE id = $1
            "#
        )
        .bind(id)
        .bind(at)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
