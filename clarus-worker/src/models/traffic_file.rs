//! Traffic file model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgExecutor};
use uuid::Uuid;

/// One uploaded CSV on durable storage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct TrafficFile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub original_filename: String,
    pub stored_path: String,
    /// Unknown until the worker has parsed the file
    pub rows_count: Option<i32>,
    pub created_at: DateTime<Utc>,
}

impl TrafficFile {
    pub fn new(user_id: Uuid, original_filename: &str, stored_path: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            original_filename: original_filename.to_string(),
            stored_path: stored_path.to_string(),
            rows_count: None,
            created_at: Utc::now(),
        }
    }

    pub async fn insert<'e, E: PgExecutor<'e>>(&self, executor: E) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO traffic_files (id, user_id, original_filename, stored_path, rows_count, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#
        )
        .bind(self.id)
        .bind(self.user_id)
        .bind(&self.original_filename)
        .bind(&self.stored_path)
        .bind(self.rows_count)
        .bind(self.created_at)
        .execute(executor)
        .await?;

        Ok(())
    }

    pub async fn find_by_id<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, TrafficFile>("SELECT * FROM traffic_files WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn set_rows_count<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
        rows_count: i32,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE traffic_files SET rows_count = $2 WHERE id = $1")
            .bind(id)
            .bind(rows_count)
            .execute(executor)
            .await?;

        Ok(())
    }
}
