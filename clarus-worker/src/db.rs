//! Database module - PostgreSQL connection and schema bootstrap

use sqlx::{postgres::PgPoolOptions, PgPool};

/// Create database connection pool
pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}

/// Create the pipeline tables if they do not exist
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::raw_sql(SCHEMA_SQL).execute(pool).await?;

    tracing::info!("Database schema applied successfully");
    Ok(())
}

/// Database schema SQL
///
/// `users` and `subscriptions` belong to the auth/billing services; user ids
/// are stored without a foreign key so the worker can start on its own.
const SCHEMA_SQL: &str = r#"
-- Uploaded traffic files
CREATE TABLE IF NOT EXISTS traffic_files (
    id UUID PRIMARY KEY,
    user_id UUID NOT NULL,
    original_filename VARCHAR(255) NOT NULL,
    stored_path VARCHAR(512) NOT NULL,
    rows_count INT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

-- Inference jobs (one per upload)
CREATE TABLE IF NOT EXISTS inference_jobs (
    id UUID PRIMARY KEY,
    user_id UUID NOT NULL,
    file_id UUID NOT NULL REFERENCES traffic_files(id),
    status VARCHAR(16) NOT NULL DEFAULT 'queued'
        CHECK (status IN ('queued', 'running', 'done', 'failed')),
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    started_at TIMESTAMPTZ,
    finished_at TIMESTAMPTZ,
    error_message TEXT
);

-- Per-job results (1:1 with a successful job)
CREATE TABLE IF NOT EXISTS prediction_summaries (
    id UUID PRIMARY KEY,
    job_id UUID NOT NULL UNIQUE REFERENCES inference_jobs(id),
    rows_scored INT NOT NULL,
    attack_rows INT NOT NULL DEFAULT 0,
    attack_share DOUBLE PRECISION NOT NULL DEFAULT 0,
    top_class VARCHAR(64),
    top_class_share DOUBLE PRECISION,
    scored_path VARCHAR(512),
    detected_delimiter VARCHAR(4),
    parsed_columns INT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

-- Indexes
CREATE INDEX IF NOT EXISTS idx_traffic_files_user ON traffic_files(user_id);
CREATE INDEX IF NOT EXISTS idx_inference_jobs_user ON inference_jobs(user_id);
CREATE INDEX IF NOT EXISTS idx_inference_jobs_file ON inference_jobs(file_id);
CREATE INDEX IF NOT EXISTS idx_inference_jobs_status ON inference_jobs(status);
"#;
