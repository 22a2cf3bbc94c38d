//! Error handling

use uuid::Uuid;

use clarus_core::{ModelError, ProvisionError};

pub type WorkerResult<T> = Result<T, WorkerError>;

/// Job store failures
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Job not found: {0}")]
    JobNotFound(Uuid),

    #[error("Invalid job status '{0}'")]
    InvalidStatus(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Broker failures
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Broker error: {0}")]
    Broker(#[from] lapin::Error),

    #[error("Broker unreachable after {attempts} attempts: {source}")]
    ConnectExhausted {
        attempts: u32,
        #[source]
        source: lapin::Error,
    },

    #[error("Invalid message: {0}")]
    Message(#[from] serde_json::Error),

    #[error("Consumer stream closed")]
    ConsumerClosed,
}

/// Upload acceptance failures
#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error("Active subscription required")]
    SubscriptionRequired,

    #[error("Only CSV files are supported (got '{0}')")]
    UnsupportedFileType(String),

    #[error("Empty file")]
    EmptyFile,

    #[error("Failed to store upload: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Job {job_id} was created but could not be queued: {source}")]
    Publish {
        job_id: Uuid,
        #[source]
        source: QueueError,
    },
}

/// Top-level worker failures
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Provision(#[from] ProvisionError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error(transparent)]
    Intake(#[from] IntakeError),
}

impl From<sqlx::Error> for WorkerError {
    fn from(err: sqlx::Error) -> Self {
        WorkerError::Store(StoreError::Database(err))
    }
}
