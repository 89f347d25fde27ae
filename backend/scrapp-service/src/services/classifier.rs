/// Trash classification: image bytes in, label + instructions out
use super::label_catalog::instructions_for;
use super::preprocess;
use super::trash_model::{ModelError, TrashModel};
use crate::metrics;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClassifyError {
    /// The upload could not be decoded as an image
    #[error("cannot identify image file: {0}")]
    Decode(#[from] image::ImageError),

    /// The image decoded but the model could not score it
    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Class probabilities in label-file order, serialized as a JSON object
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassProbabilities(Vec<(String, f32)>);

impl ClassProbabilities {
    pub fn iter(&self) -> impl Iterator<Item = (&str, f32)> + '_ {
        self.0.iter().map(|(name, p)| (name.as_str(), *p))
    }

    pub fn values(&self) -> impl Iterator<Item = f32> + '_ {
        self.0.iter().map(|(_, p)| *p)
    }

    pub fn get(&self, name: &str) -> Option<f32> {
        self.iter().find(|(n, _)| *n == name).map(|(_, p)| p)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, f32)> for ClassProbabilities {
    fn from_iter<I: IntoIterator<Item = (String, f32)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Serialize for ClassProbabilities {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, p) in &self.0 {
            map.serialize_entry(name, p)?;
        }
        map.end()
    }
}

/// Per-request classification outcome; never persisted
#[derive(Debug, Clone, serde::Serialize, PartialEq)]
pub struct ClassificationResult {
    pub label: String,
    /// Probability of `label`, the maximum of `probs`
    pub confidence: f32,
    /// Probability for every class, summing to ~1
    pub probs: ClassProbabilities,
    pub instructions: String,
}

/// Numerically stable softmax
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&x| (x - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Index of the largest value; the first one wins ties
pub fn argmax(values: &[f32]) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f32)>, (i, &v)| match best {
            Some((_, b)) if b >= v => best,
            _ => Some((i, v)),
        })
        .map(|(i, _)| i)
}

/// Wraps the shared model with preprocessing and post-processing
pub struct ClassificationService {
    model: Arc<dyn TrashModel>,
}

impl ClassificationService {
    pub fn new(model: Arc<dyn TrashModel>) -> Self {
        Self { model }
    }

    pub fn class_names(&self) -> &[String] {
        self.model.class_names()
    }

    /// Classify raw upload bytes. CPU-bound; call from a blocking context.
    pub fn classify(&self, bytes: &[u8]) -> Result<ClassificationResult, ClassifyError> {
        let tensor = preprocess::prepare(bytes)?;

        let start = Instant::now();
        let logits = self.model.infer(tensor)?;
        metrics::INFERENCE_DURATION_SECONDS.observe(start.elapsed().as_secs_f64());

        let class_names = self.model.class_names();
        if logits.len() != class_names.len() {
            return Err(ModelError::OutputMismatch {
                expected: class_names.len(),
                got: logits.len(),
            }
            .into());
        }

        let probs = softmax(&logits);
        let idx = argmax(&probs).ok_or_else(|| {
            ModelError::Runtime("model returned an empty score vector".to_string())
        })?;

        let label = class_names[idx].clone();
        let confidence = probs[idx];

        Ok(ClassificationResult {
            instructions: instructions_for(&label).to_string(),
            probs: class_names.iter().cloned().zip(probs).collect(),
            confidence,
            label,
        })
    }
}
