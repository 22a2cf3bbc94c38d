//! In-memory job store for tests and local dry runs

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use uuid::Uuid;

use super::{JobCompletion, JobStore};
use crate::error::StoreError;
use crate::jobs::JobStatus;
use crate::models::{InferenceJob, PredictionSummary, TrafficFile};

#[derive(Debug, Default)]
struct MemoryState {
    files: HashMap<Uuid, TrafficFile>,
    jobs: HashMap<Uuid, InferenceJob>,
    /// Keyed by job id (one summary per job)
    summaries: HashMap<Uuid, PredictionSummary>,
    /// Every status written, in order
    history: Vec<(Uuid, JobStatus)>,
}

#[derive(Debug, Default)]
pub struct MemoryJobStore {
    state: Mutex<MemoryState>,
    fail_completions: AtomicBool,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `mark_done` fail without writing anything
    pub fn set_fail_completions(&self, fail: bool) {
        self.fail_completions.store(fail, Ordering::SeqCst);
    }

    /// Statuses written for `job_id`, oldest first
    pub fn history(&self, job_id: Uuid) -> Vec<JobStatus> {
        self.state
            .lock()
            .history
            .iter()
            .filter(|(id, _)| *id == job_id)
            .map(|(_, status)| *status)
            .collect()
    }

    pub fn summary_count(&self) -> usize {
        self.state.lock().summaries.len()
    }

    /// Remove a file record, leaving jobs pointing at it
    pub fn remove_file(&self, file_id: Uuid) -> Option<TrafficFile> {
        self.state.lock().files.remove(&file_id)
    }
}

impl MemoryState {
    fn job_mut(&mut self, job_id: Uuid) -> Result<&mut InferenceJob, StoreError> {
        self.jobs.get_mut(&job_id).ok_or(StoreError::JobNotFound(job_id))
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn create_file(&self, file: &TrafficFile) -> Result<(), StoreError> {
        self.state.lock().files.insert(file.id, file.clone());
        Ok(())
    }

    async fn create_job(&self, job: &InferenceJob) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        if !state.files.contains_key(&job.file_id) {
            return Err(StoreError::Unavailable(format!(
                "job {} references unknown file {}",
                job.id, job.file_id
            )));
        }
        state.jobs.insert(job.id, job.clone());
        state.history.push((job.id, job.job_status()?));
        Ok(())
    }

    async fn find_job(&self, job_id: Uuid) -> Result<Option<InferenceJob>, StoreError> {
        Ok(self.state.lock().jobs.get(&job_id).cloned())
    }

    async fn find_file(&self, file_id: Uuid) -> Result<Option<TrafficFile>, StoreError> {
        Ok(self.state.lock().files.get(&file_id).cloned())
    }

    async fn find_summary(&self, job_id: Uuid) -> Result<Option<PredictionSummary>, StoreError> {
        Ok(self.state.lock().summaries.get(&job_id).cloned())
    }

    async fn mark_running(&self, job_id: Uuid) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        let job = state.job_mut(job_id)?;
        job.status = JobStatus::Running.to_string();
        job.started_at = Some(Utc::now());
        state.history.push((job_id, JobStatus::Running));
        Ok(())
    }

    async fn mark_failed(&self, job_id: Uuid, message: &str) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        let job = state.job_mut(job_id)?;
        job.status = JobStatus::Failed.to_string();
        job.error_message = Some(message.to_string());
        job.finished_at = Some(Utc::now());
        state.history.push((job_id, JobStatus::Failed));
        Ok(())
    }

    async fn mark_done(&self, completion: &JobCompletion) -> Result<(), StoreError> {
        if self.fail_completions.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("completion rejected".to_string()));
        }

        let mut state = self.state.lock();
        // Check everything before writing anything
        if !state.jobs.contains_key(&completion.job_id) {
            return Err(StoreError::JobNotFound(completion.job_id));
        }

        if let Some(file) = state.files.get_mut(&completion.file_id) {
            file.rows_count = Some(completion.rows_count);
        }

        // Upsert keeps the first row's identity
        let mut summary = completion.summary.clone();
        if let Some(existing) = state.summaries.get(&completion.job_id) {
            summary.id = existing.id;
            summary.created_at = existing.created_at;
        }
        state.summaries.insert(completion.job_id, summary);

        let job = state.job_mut(completion.job_id)?;
        job.status = JobStatus::Done.to_string();
        job.error_message = None;
        job.finished_at = Some(Utc::now());
        state.history.push((completion.job_id, JobStatus::Done));
        Ok(())
    }
}
