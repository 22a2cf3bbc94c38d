//! Inference Engine - ONNX Runtime Integration
//!
//! Loads a converted classifier and runs it on aligned feature matrices.
//! Expected graph shape (onnxmltools / skl2onnx converters):
//! - one float input `[rows, features]`
//! - first output: int64 labels `[rows]`
//! - second output (optional): float probabilities `[rows, classes]`

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use ndarray::Array2;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Value;
use parking_lot::Mutex;

use super::{Classifier, ModelError, Prediction};

// ============================================================================
// ONNX IMPLEMENTATION
// ============================================================================

pub struct OnnxClassifier {
    /// `Session::run` needs `&mut`
    session: Mutex<Session>,
    label_output: String,
    probability_output: Option<String>,
    latency_sum_us: AtomicU64,
    inference_count: AtomicU64,
}

impl OnnxClassifier {
    /// Load ONNX model from file
    pub fn load(model_path: &Path) -> Result<Self, ModelError> {
        log::info!("Loading ONNX model from: {}", model_path.display());

        if !model_path.exists() {
            return Err(ModelError::NotFound(model_path.to_path_buf()));
        }

        let session = Session::builder()
            .map_err(|e| ModelError::Inference(format!("Failed to create session builder: {}", e)))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| ModelError::Inference(format!("Failed to set optimization: {}", e)))?
            .commit_from_file(model_path)
            .map_err(|e| invalid(model_path, format!("Failed to load model: {}", e)))?;

        let mut output_names = session.outputs.iter().map(|o| o.name.clone());
        let label_output = output_names
            .next()
            .ok_or_else(|| invalid(model_path, "No output defined".to_string()))?;
        let probability_output = output_names.next();

        log::info!(
            "ONNX model loaded successfully (labels: {}, probabilities: {})",
            label_output,
            probability_output.as_deref().unwrap_or("none")
        );

        Ok(Self {
            session: Mutex::new(session),
            label_output,
            probability_output,
            latency_sum_us: AtomicU64::new(0),
            inference_count: AtomicU64::new(0),
        })
    }

    /// Average `predict` latency in milliseconds
    pub fn avg_latency_ms(&self) -> f32 {
        let sum = self.latency_sum_us.load(Ordering::Relaxed);
        let count = self.inference_count.load(Ordering::Relaxed);
        if count > 0 { (sum as f32 / count as f32) / 1000.0 } else { 0.0 }
    }
}

impl Classifier for OnnxClassifier {
    fn predict(&self, features: &Array2<f32>) -> Result<Prediction, ModelError> {
        let n_rows = features.nrows();
        if n_rows == 0 {
            return Ok(Prediction::default());
        }

        let start_time = std::time::Instant::now();

        let input_tensor = Value::from_array(features.clone())
            .map_err(|e| ModelError::Inference(format!("Tensor error: {}", e)))?;

        let mut session = self.session.lock();
        let outputs = session
            .run(ort::inputs![input_tensor])
            .map_err(|e| ModelError::Inference(format!("Inference failed: {}", e)))?;

        let labels = outputs
            .get(self.label_output.as_str())
            .ok_or_else(|| ModelError::Inference(format!("Missing output '{}'", self.label_output)))?;

        let (_, label_data) = labels
            .try_extract_tensor::<i64>()
            .map_err(|e| ModelError::Inference(format!("Extract error: {}", e)))?;

        if label_data.len() != n_rows {
            return Err(ModelError::Inference(format!(
                "Expected {} labels, got {}",
                n_rows,
                label_data.len()
            )));
        }

        let classes = label_data
            .iter()
            .map(|&c| {
                usize::try_from(c)
                    .map_err(|_| ModelError::Inference(format!("Negative class label {}", c)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        // ZipMap outputs are not tensors; treat them as "no probabilities"
        let probabilities = self
            .probability_output
            .as_deref()
            .and_then(|name| outputs.get(name))
            .and_then(|value| {
                let (shape, data) = value.try_extract_tensor::<f32>().ok()?;
                if shape.len() != 2 {
                    return None;
                }
                let n_classes = usize::try_from(shape[1]).ok()?;
                Array2::from_shape_vec((n_rows, n_classes), data.to_vec()).ok()
            });

        let elapsed = start_time.elapsed().as_micros() as u64;
        self.latency_sum_us.fetch_add(elapsed, Ordering::Relaxed);
        self.inference_count.fetch_add(1, Ordering::Relaxed);
        log::debug!(
            "ONNX inference: {} rows in {}us (avg {:.2}ms)",
            n_rows,
            elapsed,
            self.avg_latency_ms()
        );

        Ok(Prediction { classes, probabilities })
    }

    fn backend(&self) -> &'static str {
        "onnx"
    }
}

fn invalid(path: &Path, reason: String) -> ModelError {
    ModelError::InvalidModel {
        path: path.to_path_buf(),
        reason,
    }
}
