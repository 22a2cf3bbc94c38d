//! Shared fixtures: a tiny on-disk model bundle, CSV writers and fake publishers

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tempfile::TempDir;
use uuid::Uuid;

use clarus_core::{BundlePaths, FeatureBundle};
use clarus_worker::models::{InferenceJob, PredictionSummary, TrafficFile};
use clarus_worker::store::{JobCompletion, JobStore};
use clarus_worker::{JobProcessor, JobPublisher, MemoryJobStore, QueueError, StoreError};

pub const BINARY_FEATURES: [&str; 5] = ["pkts", "bytes", "dur", "rate", "proto_num"];

/// pkts, bytes, dur, rate, proto_num, label
///
/// pkts >= 100 is an attack; among attacks bytes >= 1000 is DoS, else DDoS.
pub const TRAFFIC_CSV: &str = "\
pkts,bytes,dur,rate,proto_num,label
10,500,0.5,1.0,6,normal
200,500,0.7,2.0,6,ddos
300,5000,0.9,3.0,17,dos
400,6000,1.1,4.0,17,dos
";

fn stump(feature: usize, threshold: f32, left: f32, right: f32) -> Value {
    json!({
        "left_children": [1, -1, -1],
        "right_children": [2, -1, -1],
        "split_indices": [feature, 0, 0],
        "split_conditions": [threshold, left, right],
        "default_left": [0, 0, 0],
        "split_type": [0, 0, 0],
    })
}

fn constant(value: f32) -> Value {
    json!({
        "left_children": [-1],
        "right_children": [-1],
        "split_indices": [0],
        "split_conditions": [value],
        "default_left": [0],
    })
}

fn model_json(objective: &str, num_class: usize, trees: Vec<Value>) -> Value {
    let tree_info: Vec<usize> = (0..trees.len())
        .map(|i| if num_class > 1 { i % num_class } else { 0 })
        .collect();
    json!({
        "learner": {
            "objective": { "name": objective },
            "learner_model_param": {
                "base_score": "5E-1",
                "num_class": num_class.to_string(),
                "num_feature": "5",
            },
            "gradient_booster": {
                "name": "gbtree",
                "model": { "trees": trees, "tree_info": tree_info },
            },
        },
        "version": [2, 0, 3],
    })
}

fn write_json(path: &Path, value: &Value) {
    std::fs::write(path, serde_json::to_vec_pretty(value).unwrap()).unwrap();
}

/// Write the five bundle artifacts into `dir`
pub fn write_model_artifacts(dir: &Path) -> BundlePaths {
    let paths = BundlePaths::in_dir(dir);

    write_json(
        &paths.binary_model,
        &model_json("binary:logistic", 0, vec![stump(0, 100.0, -2.0, 2.0)]),
    );
    write_json(
        &paths.multiclass_model,
        &model_json(
            "multi:softprob",
            3,
            vec![
                stump(0, 1000.0, 2.0, -1.0),
                stump(0, 1000.0, -1.0, 2.0),
                constant(0.0),
            ],
        ),
    );
    write_json(&paths.binary_features, &json!(BINARY_FEATURES));
    write_json(&paths.multiclass_features, &json!(["bytes", "pkts"]));
    write_json(
        &paths.class_mapping,
        &json!({ "0": "DDoS", "1": "DoS", "2": "Reconnaissance" }),
    );

    paths
}

/// Temp workspace with a loaded bundle, an uploads dir and a memory store
pub struct Harness {
    pub dir: TempDir,
    pub store: Arc<MemoryJobStore>,
    pub bundle: Arc<FeatureBundle>,
    pub processor: JobProcessor,
}

impl Harness {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let models = dir.path().join("models");
        std::fs::create_dir_all(&models).unwrap();

        let bundle = Arc::new(FeatureBundle::load(&write_model_artifacts(&models)).unwrap());
        let store = Arc::new(MemoryJobStore::new());
        let processor = JobProcessor::new(
            store.clone() as Arc<dyn JobStore>,
            bundle.clone(),
            dir.path().join("uploads"),
        );

        Self {
            dir,
            store,
            bundle,
            processor,
        }
    }

    /// Same bundle and uploads dir, different store
    pub fn processor_with_store(&self, store: Arc<dyn JobStore>) -> JobProcessor {
        JobProcessor::new(store, self.bundle.clone(), self.uploads_dir())
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.dir.path().join("uploads")
    }

    /// Write `contents` as an upload and create its file + queued job
    pub async fn queue_csv(&self, name: &str, contents: &str) -> (TrafficFile, InferenceJob) {
        let uploads = self.uploads_dir();
        std::fs::create_dir_all(&uploads).unwrap();
        let path = uploads.join(name);
        std::fs::write(&path, contents).unwrap();

        self.queue_path(name, &path.display().to_string()).await
    }

    /// File + queued job records for an arbitrary stored path
    pub async fn queue_path(&self, name: &str, stored_path: &str) -> (TrafficFile, InferenceJob) {
        let user_id = Uuid::new_v4();
        let file = TrafficFile::new(user_id, name, stored_path);
        self.store.create_file(&file).await.unwrap();

        let job = InferenceJob::queued(user_id, file.id);
        self.store.create_job(&job).await.unwrap();

        (file, job)
    }
}

/// Publisher that records job ids instead of talking to a broker
#[derive(Debug, Default)]
pub struct RecordingPublisher {
    pub published: Mutex<Vec<Uuid>>,
}

#[async_trait]
impl JobPublisher for RecordingPublisher {
    async fn publish(&self, job_id: Uuid) -> Result<(), QueueError> {
        self.published.lock().push(job_id);
        Ok(())
    }
}

/// Publisher whose broker is always gone
#[derive(Debug, Default)]
pub struct FailingPublisher;

#[async_trait]
impl JobPublisher for FailingPublisher {
    async fn publish(&self, _job_id: Uuid) -> Result<(), QueueError> {
        Err(QueueError::ConsumerClosed)
    }
}

/// Store whose database is unreachable
#[derive(Debug, Default)]
pub struct UnavailableStore;

fn down() -> StoreError {
    StoreError::Unavailable("database down".to_string())
}

#[async_trait]
impl JobStore for UnavailableStore {
    async fn create_file(&self, _file: &TrafficFile) -> Result<(), StoreError> {
        Err(down())
    }

    async fn create_job(&self, _job: &InferenceJob) -> Result<(), StoreError> {
        Err(down())
    }

    async fn find_job(&self, _job_id: Uuid) -> Result<Option<InferenceJob>, StoreError> {
        Err(down())
    }

    async fn find_file(&self, _file_id: Uuid) -> Result<Option<TrafficFile>, StoreError> {
        Err(down())
    }

    async fn find_summary(&self, _job_id: Uuid) -> Result<Option<PredictionSummary>, StoreError> {
        Err(down())
    }

    async fn mark_running(&self, _job_id: Uuid) -> Result<(), StoreError> {
        Err(down())
    }

    async fn mark_failed(&self, _job_id: Uuid, _message: &str) -> Result<(), StoreError> {
        Err(down())
    }

    async fn mark_done(&self, _completion: &JobCompletion) -> Result<(), StoreError> {
        Err(down())
    }
}
