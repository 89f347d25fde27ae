/// Trash classifier model loading and inference
///
/// The trained classifier is exported to ONNX and executed with tract. It is
/// loaded once at startup together with its ordered label list and is
/// read-only afterwards, so a single instance is shared by every worker.
use super::label_catalog::known_labels;
use super::preprocess::{ImageTensor, INPUT_SIZE};
use std::path::Path;
use thiserror::Error;
use tract_onnx::prelude::*;
use tracing::{debug, info, warn};

/// Optimized tract plan
type TractModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Model not found: {0}")]
    NotFound(String),

    #[error("Label file error: {0}")]
    Labels(String),

    #[error("ONNX runtime error: {0}")]
    Runtime(String),

    #[error("model produced {got} scores but {expected} labels are configured")]
    OutputMismatch { expected: usize, got: usize },
}

pub type ModelResult<T> = std::result::Result<T, ModelError>;

/// A classifier producing one raw score (logit) per class.
pub trait TrashModel: Send + Sync {
    /// Class names, index-aligned with the scores returned by `infer`
    fn class_names(&self) -> &[String];

    fn infer(&self, input: ImageTensor) -> ModelResult<Vec<f32>>;
}

/// Parse a newline-delimited label file; entries are trimmed and blank lines skipped
pub fn parse_labels(raw: &str) -> ModelResult<Vec<String>> {
    let labels: Vec<String> = raw
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect();

    if labels.is_empty() {
        return Err(ModelError::Labels("label file contains no classes".to_string()));
    }

    Ok(labels)
}

pub fn load_labels(path: impl AsRef<Path>) -> ModelResult<Vec<String>> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)
        .map_err(|e| ModelError::Labels(format!("{}: {}", path.display(), e)))?;
    parse_labels(&raw)
}

/// ONNX trash classifier
pub struct OnnxTrashModel {
    plan: TractModel,
    class_names: Vec<String>,
}

impl OnnxTrashModel {
    /// Load the model and its labels, then verify they agree.
    ///
    /// Any failure here is fatal for the service.
    pub fn load(
        model_path: impl AsRef<Path>,
        labels_path: impl AsRef<Path>,
    ) -> ModelResult<Self> {
        let model_path = model_path.as_ref();

        if !model_path.exists() {
            return Err(ModelError::NotFound(model_path.display().to_string()));
        }

        let class_names = load_labels(labels_path)?;

        let size = INPUT_SIZE as usize;
        let plan = tract_onnx::onnx()
            .model_for_path(model_path)
            .and_then(|m| m.with_input_fact(0, f32::fact([1, size, size, 3]).into()))
            .and_then(|m| m.into_optimized())
            .and_then(|m| m.into_runnable())
            .map_err(|e| ModelError::Runtime(e.to_string()))?;

        for label in &class_names {
            if !known_labels().any(|known| known == label.as_str()) {
                warn!(label = %label, "No disposal instructions for class; fallback text will be used");
            }
        }

        let model = Self { plan, class_names };

        // Smoke run: the output width must match the label count.
        let smoke_input = ImageTensor::zeros((1, size, size, 3));
        model.infer(smoke_input)?;

        info!(
            path = %model_path.display(),
            classes = model.class_names.len(),
            "Trash classifier loaded"
        );

        Ok(model)
    }
}

impl TrashModel for OnnxTrashModel {
    fn class_names(&self) -> &[String] {
        &self.class_names
    }

    fn infer(&self, input: ImageTensor) -> ModelResult<Vec<f32>> {
        let tensor: Tensor = input.into();
        let outputs = self
            .plan
            .run(tvec!(tensor.into()))
            .map_err(|e| ModelError::Runtime(e.to_string()))?;

        let first = outputs
            .first()
            .ok_or_else(|| ModelError::Runtime("model returned no outputs".to_string()))?;

        let scores: Vec<f32> = first
            .to_array_view::<f32>()
            .map_err(|e| ModelError::Runtime(e.to_string()))?
            .iter()
            .copied()
            .collect();

        if scores.len() != self.class_names.len() {
            return Err(ModelError::OutputMismatch {
                expected: self.class_names.len(),
                got: scores.len(),
            });
        }

        debug!(scores = ?scores, "Inference complete");
        Ok(scores)
    }
}
