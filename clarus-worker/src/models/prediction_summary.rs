//! Prediction summary model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgExecutor};
use uuid::Uuid;

use clarus_core::ScoreSummary;

/// Aggregate result of a successful job (at most one per job)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct PredictionSummary {
    pub id: Uuid,
    pub job_id: Uuid,
    pub rows_scored: i32,
    pub attack_rows: i32,
    /// attack_rows / rows_scored
    pub attack_share: f64,
    pub top_class: Option<String>,
    pub top_class_share: Option<f64>,
    pub scored_path: Option<String>,
    /// Diagnostics: delimiter the upload was parsed with
    pub detected_delimiter: Option<String>,
    /// Diagnostics: parsed column count
    pub parsed_columns: Option<i32>,
    pub created_at: DateTime<Utc>,
}

/// Parse diagnostics stored next to a summary
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParseDiagnostics {
    pub detected_delimiter: Option<String>,
    pub parsed_columns: Option<usize>,
}

impl PredictionSummary {
    pub fn from_scores(
        job_id: Uuid,
        summary: &ScoreSummary,
        scored_path: &str,
        diagnostics: ParseDiagnostics,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            job_id,
            rows_scored: db_count(summary.total_rows),
            attack_rows: db_count(summary.attack_rows),
            attack_share: summary.attack_ratio,
            top_class: summary.top_class.clone(),
            top_class_share: summary.top_class_share,
            scored_path: Some(scored_path.to_string()),
            detected_delimiter: diagnostics.detected_delimiter,
            parsed_columns: diagnostics.parsed_columns.map(db_count),
            created_at: Utc::now(),
        }
    }

    /// Insert, or overwrite the values of the job's existing summary
    pub async fn upsert<'e, E: PgExecutor<'e>>(&self, executor: E) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO prediction_summaries (
                id, job_id, rows_scored, attack_rows, attack_share, top_class,
                top_class_share, scored_path, detected_delimiter, parsed_columns, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (job_id) DO UPDATE SET
                rows_scored = EXCLUDED.rows_scored,
                attack_rows = EXCLUDED.attack_rows,
                attack_share = EXCLUDED.attack_share,
                top_class = EXCLUDED.top_class,
                top_class_share = EXCLUDED.top_class_share,
                scored_path = EXCLUDED.scored_path,
                detected_delimiter = EXCLUDED.detected_delimiter,
                parsed_columns = EXCLUDED.parsed_columns
            "#
        )
        .bind(self.id)
        .bind(self.job_id)
        .bind(self.rows_scored)
        .bind(self.attack_rows)
        .bind(self.attack_share)
        .bind(&self.top_class)
        .bind(self.top_class_share)
        .bind(&self.scored_path)
        .bind(&self.detected_delimiter)
        .bind(self.parsed_columns)
        .bind(self.created_at)
        .execute(executor)
        .await?;

        Ok(())
    }

    pub async fn find_by_job<'e, E: PgExecutor<'e>>(
        executor: E,
        job_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, PredictionSummary>(
            "SELECT * FROM prediction_summaries WHERE job_id = $1"
        )
        .bind(job_id)
        .fetch_optional(executor)
        .await
    }
}

/// Row counts are INT columns; saturate rather than wrap
pub fn db_count(n: usize) -> i32 {
    i32::try_from(n).unwrap_or(i32::MAX)
}
