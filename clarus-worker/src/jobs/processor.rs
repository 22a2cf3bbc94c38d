//! Job Processor - drives one job from its recorded state to a terminal one
//!
//! ## Guards, in order (first failure wins):
//! 1. file record exists
//! 2. stored CSV exists on disk
//! 3. CSV parses
//! 4. parsed columns overlap the binary feature list enough
//! 5. scoring, aggregation and the scored-file write succeed
//!
//! Success commits row count, summary and `done` together.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use uuid::Uuid;

use clarus_core::logic::ingest::scored_file_name;
use clarus_core::{read_csv_robust, write_csv, CsvError, Delimiter, FeatureBundle, ModelError, ScoreSummary};

use super::JobStatus;
use crate::error::StoreError;
use crate::models::{db_count, ParseDiagnostics, PredictionSummary};
use crate::store::{JobCompletion, JobStore};

/// What happened to one job id
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Done(ScoreSummary),
    Failed(String),
    /// No job with that id
    Missing,
    /// A terminal job produced a different outcome; the recorded one stands
    Skipped { recorded: JobStatus },
}

/// Result of a successful scoring run
#[derive(Debug, Clone)]
pub struct ScoredFile {
    pub summary: ScoreSummary,
    pub scored_path: PathBuf,
    pub delimiter: Delimiter,
    pub parsed_columns: usize,
}

/// Why scoring a stored file stopped
#[derive(Debug)]
enum StageError {
    Read(CsvError),
    Schema(ModelError),
    Scoring(anyhow::Error),
    Crashed(String),
}

impl StageError {
    fn message(&self) -> String {
        match self {
            StageError::Read(e) => format!("Failed to read CSV: {}", e),
            StageError::Schema(e) => e.to_string(),
            StageError::Scoring(e) => format!("{:#}\n\n{:?}", e, e),
            StageError::Crashed(panic) => format!("Scoring task panicked: {}", panic),
        }
    }
}

pub struct JobProcessor {
    store: Arc<dyn JobStore>,
    bundle: Arc<FeatureBundle>,
    uploads_dir: PathBuf,
}

impl JobProcessor {
    pub fn new(store: Arc<dyn JobStore>, bundle: Arc<FeatureBundle>, uploads_dir: PathBuf) -> Self {
        Self {
            store,
            bundle,
            uploads_dir,
        }
    }

    /// Run one job to a terminal state.
    ///
    /// Job failures end up in the job row; `Err` means the store itself failed.
    pub async fn process(&self, job_id: Uuid) -> Result<JobOutcome, StoreError> {
        let Some(job) = self.store.find_job(job_id).await? else {
            tracing::warn!(%job_id, "Job not found, nothing to do");
            return Ok(JobOutcome::Missing);
        };
        let recorded = job.job_status()?;

        let Some(file) = self.store.find_file(job.file_id).await? else {
            return self
                .fail(job_id, recorded, "TrafficFile not found".to_string())
                .await;
        };

        let current = if recorded.is_terminal() {
            tracing::info!(%job_id, status = %recorded, "Reprocessing terminal job");
            recorded
        } else {
            self.store.mark_running(job_id).await?;
            tracing::info!(%job_id, file_id = %file.id, "Job running");
            JobStatus::Running
        };

        let stored_path = PathBuf::from(&file.stored_path);
        if file.stored_path.is_empty() || !stored_path.exists() {
            let message = format!(
                "CSV not found at stored_path='{}'. (the uploads volume may have been recreated)",
                file.stored_path
            );
            return self.fail(job_id, current, message).await;
        }

        let bundle = Arc::clone(&self.bundle);
        let uploads_dir = self.uploads_dir.clone();
        let scoring =
            tokio::task::spawn_blocking(move || score_file(&bundle, &stored_path, &uploads_dir));

        let scored = match scoring.await {
            Ok(Ok(scored)) => scored,
            Ok(Err(stage)) => return self.fail(job_id, current, stage.message()).await,
            Err(join_error) => {
                let panic = if join_error.is_panic() {
                    panic_message(join_error.into_panic())
                } else {
                    "scoring task was cancelled".to_string()
                };
                return self
                    .fail(job_id, current, StageError::Crashed(panic).message())
                    .await;
            }
        };

        self.complete(job_id, file.id, current, scored).await
    }

    async fn complete(
        &self,
        job_id: Uuid,
        file_id: Uuid,
        current: JobStatus,
        scored: ScoredFile,
    ) -> Result<JobOutcome, StoreError> {
        if !current.can_transition_to(JobStatus::Done) {
            tracing::warn!(
                %job_id,
                recorded = %current,
                "Reprocessing succeeded, keeping recorded status"
            );
            return Ok(JobOutcome::Skipped { recorded: current });
        }

        let scored_path = scored.scored_path.display().to_string();
        let completion = JobCompletion {
            job_id,
            file_id,
            rows_count: db_count(scored.summary.total_rows),
            summary: PredictionSummary::from_scores(
                job_id,
                &scored.summary,
                &scored_path,
                ParseDiagnostics {
                    detected_delimiter: Some(scored.delimiter.to_string()),
                    parsed_columns: Some(scored.parsed_columns),
                },
            ),
        };

        if let Err(e) = self.store.mark_done(&completion).await {
            // Nothing from the completion was committed
            tracing::error!(%job_id, error = %e, "Failed to record job results");
            return self
                .fail(job_id, current, format!("Failed to record results: {}", e))
                .await;
        }

        tracing::info!(
            %job_id,
            rows = scored.summary.total_rows,
            attack_rows = scored.summary.attack_rows,
            top_class = scored.summary.top_class.as_deref().unwrap_or("-"),
            scored_path = %scored_path,
            "Job done"
        );

        Ok(JobOutcome::Done(scored.summary))
    }

    async fn fail(
        &self,
        job_id: Uuid,
        current: JobStatus,
        message: String,
    ) -> Result<JobOutcome, StoreError> {
        if !current.can_transition_to(JobStatus::Failed) {
            tracing::warn!(
                %job_id,
                recorded = %current,
                error = %message,
                "Reprocessing failed, keeping recorded status"
            );
            return Ok(JobOutcome::Skipped { recorded: current });
        }

        self.store.mark_failed(job_id, &message).await?;
        tracing::warn!(%job_id, error = %message, "Job failed");

        Ok(JobOutcome::Failed(message))
    }
}

// ============================================================================
// SCORING (blocking)
// ============================================================================

fn score_file(
    bundle: &FeatureBundle,
    stored_path: &Path,
    uploads_dir: &Path,
) -> Result<ScoredFile, StageError> {
    let (table, delimiter) =
        read_csv_robust(stored_path, Some(bundle.binary_features())).map_err(StageError::Read)?;

    bundle
        .check_schema(&table, delimiter)
        .map_err(StageError::Schema)?;

    let parsed_columns = table.n_cols();
    tracing::debug!(rows = table.n_rows(), parsed_columns, sep = %delimiter, "CSV parsed");

    score_and_write(bundle, &table, stored_path, uploads_dir)
        .map(|(summary, scored_path)| ScoredFile {
            summary,
            scored_path,
            delimiter,
            parsed_columns,
        })
        .map_err(StageError::Scoring)
}

fn score_and_write(
    bundle: &FeatureBundle,
    table: &clarus_core::Table,
    stored_path: &Path,
    uploads_dir: &Path,
) -> anyhow::Result<(ScoreSummary, PathBuf)> {
    let scored = bundle.predict_rows(table).context("Cascade inference failed")?;
    let summary = scored.summary().context("Failed to summarize scored rows")?;

    std::fs::create_dir_all(uploads_dir)
        .with_context(|| format!("Failed to create {}", uploads_dir.display()))?;

    let scored_path = uploads_dir.join(scored_file_name(stored_path));
    write_csv(&scored.table, &scored_path)
        .with_context(|| format!("Failed to write {}", scored_path.display()))?;

    Ok((summary, scored_path))
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
