//! Intake - accept one upload and hand it to the queue
//!
//! gate -> file type -> non-empty -> store bytes -> file + job rows -> publish

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::error::{IntakeError, StoreError};
use crate::gate::SubscriptionGate;
use crate::models::{InferenceJob, TrafficFile};
use crate::queue::JobPublisher;
use crate::store::JobStore;

/// Ids of an accepted upload
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Accepted {
    pub file_id: Uuid,
    pub job_id: Uuid,
    pub stored_path: PathBuf,
}

pub struct Intake {
    store: Arc<dyn JobStore>,
    publisher: Arc<dyn JobPublisher>,
    gate: Arc<dyn SubscriptionGate>,
    uploads_dir: PathBuf,
}

impl Intake {
    pub fn new(
        store: Arc<dyn JobStore>,
        publisher: Arc<dyn JobPublisher>,
        gate: Arc<dyn SubscriptionGate>,
        uploads_dir: PathBuf,
    ) -> Self {
        Self {
            store,
            publisher,
            gate,
            uploads_dir,
        }
    }

    /// Store the upload, create its `queued` job and publish the job id.
    ///
    /// If publishing fails the job stays `queued`; the error carries its id.
    pub async fn accept_upload(
        &self,
        user_id: Uuid,
        filename: &str,
        bytes: &[u8],
    ) -> Result<Accepted, IntakeError> {
        if !self.gate.is_active(user_id).await? {
            return Err(IntakeError::SubscriptionRequired);
        }

        if !filename.to_ascii_lowercase().ends_with(".csv") {
            return Err(IntakeError::UnsupportedFileType(filename.to_string()));
        }

        if bytes.is_empty() {
            return Err(IntakeError::EmptyFile);
        }

        tokio::fs::create_dir_all(&self.uploads_dir).await?;
        let stored_path = self
            .uploads_dir
            .join(format!("{}_{}", Uuid::new_v4(), sanitize_filename(filename)));
        tokio::fs::write(&stored_path, bytes).await?;

        let file = TrafficFile::new(user_id, filename, &stored_path.display().to_string());
        let job = InferenceJob::queued(user_id, file.id);

        if let Err(e) = self.create_records(&file, &job).await {
            if let Err(rm) = tokio::fs::remove_file(&stored_path).await {
                tracing::warn!(path = %stored_path.display(), error = %rm, "Failed to remove orphaned upload");
            }
            return Err(e.into());
        }

        tracing::info!(
            job_id = %job.id,
            file_id = %file.id,
            %user_id,
            bytes = bytes.len(),
            "Upload accepted"
        );

        self.publisher
            .publish(job.id)
            .await
            .map_err(|source| IntakeError::Publish {
                job_id: job.id,
                source,
            })?;

        Ok(Accepted {
            file_id: file.id,
            job_id: job.id,
            stored_path,
        })
    }

    async fn create_records(&self, file: &TrafficFile, job: &InferenceJob) -> Result<(), StoreError> {
        self.store.create_file(file).await?;
        self.store.create_job(job).await
    }
}

/// Base name only, with anything outside `[A-Za-z0-9._-]` replaced by `_`
pub fn sanitize_filename(filename: &str) -> String {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename);

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.trim_matches('.').is_empty() {
        "upload.csv".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::sanitize_filename;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("traffic.csv"), "traffic.csv");
        assert_eq!(sanitize_filename("../../etc/passwd.csv"), "passwd.csv");
        assert_eq!(sanitize_filename("C:\\data\\my file (1).CSV"), "my_file__1_.CSV");
        assert_eq!(sanitize_filename(".."), "upload.csv");
    }
}
