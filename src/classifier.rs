use std::path::Path;

use ndarray::Array4;
use tract_onnx::prelude::*;
use tracing::debug;

use crate::error::{Error, Result};
use crate::preprocess::{INPUT_HEIGHT, INPUT_WIDTH};

/// Header column of the label CSV that names each class. Row order defines
/// the index-to-label mapping used at inference time.
const LABEL_COLUMN: &str = "folder_name";

type RunnablePlan = TypedSimplePlan<TypedModel>;

#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub label: String,
    pub confidence: f32,
}

/// Produces a vector of per-class scores for a preprocessed image tensor.
///
/// The only implementation in production is the tract ONNX plan; tests
/// substitute a stub so handler behavior can be exercised without a model
/// artifact on disk.
pub trait Scorer: Send + Sync + 'static {
    fn scores(&self, input: Array4<f32>) -> Result<Vec<f32>>;
}

struct OnnxScorer {
    plan: RunnablePlan,
}

impl OnnxScorer {
    fn load(model_path: &Path) -> Result<Self> {
        let plan = onnx()
            .model_for_path(model_path)
            .map_err(|e| Error::Model(e.to_string()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(
                    f32::datum_type(),
                    tvec!(1, INPUT_HEIGHT as i64, INPUT_WIDTH as i64, 3),
                ),
            )
            .map_err(|e| Error::Model(e.to_string()))?
            .into_optimized()
            .map_err(|e| Error::Model(e.to_string()))?
            .into_runnable()
            .map_err(|e| Error::Model(e.to_string()))?;
        Ok(Self { plan })
    }
}

impl Scorer for OnnxScorer {
    fn scores(&self, input: Array4<f32>) -> Result<Vec<f32>> {
        let shape = (
            1,
            INPUT_HEIGHT as usize,
            INPUT_WIDTH as usize,
            3,
        );
        let tensor = tract_ndarray::Array4::from_shape_vec(shape, input.into_raw_vec())
            .map_err(|e| Error::Inference(e.to_string()))?
            .into_tensor();

        let result = self
            .plan
            .run(tvec!(tensor.into()))
            .map_err(|e| Error::Inference(e.to_string()))?;

        let output = result[0]
            .to_array_view::<f32>()
            .map_err(|e| Error::Inference(e.to_string()))?;
        Ok(output.iter().copied().collect())
    }
}

/// The classifier artifact and its label list, loaded once at startup and
/// shared read-only across workers.
pub struct Classifier {
    scorer: Box<dyn Scorer>,
    labels: Vec<String>,
}

impl Classifier {
    /// Loads the ONNX artifact and label CSV. Any failure here is fatal: the
    /// process must not start serving with a missing or malformed model.
    pub fn load(model_path: &Path, labels_path: &Path) -> Result<Self> {
        let scorer = OnnxScorer::load(model_path)?;
        let labels = load_labels(labels_path)?;
        debug!(classes = labels.len(), "label list loaded");
        Ok(Self::new(Box::new(scorer), labels))
    }

    pub fn new(scorer: Box<dyn Scorer>, labels: Vec<String>) -> Self {
        Self { scorer, labels }
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Scores a preprocessed tensor and returns the top class with its raw
    /// probability. A score vector whose length disagrees with the label list
    /// means the artifact and label file are mismatched; that fails the
    /// request rather than returning a misleading label.
    pub fn predict(&self, input: Array4<f32>) -> Result<Prediction> {
        let scores = self.scorer.scores(input)?;
        if scores.len() != self.labels.len() {
            return Err(Error::Inference(format!(
                "model produced {} scores but the label list has {} entries",
                scores.len(),
                self.labels.len()
            )));
        }
        let (index, confidence) = argmax(&scores)
            .ok_or_else(|| Error::Inference("model produced an empty output vector".into()))?;
        Ok(Prediction {
            label: self.labels[index].clone(),
            confidence,
        })
    }
}

/// Index and value of the maximum score; exact ties go to the lowest index.
fn argmax(scores: &[f32]) -> Option<(usize, f32)> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &score) in scores.iter().enumerate() {
        match best {
            None => best = Some((i, score)),
            Some((_, top)) if score > top => best = Some((i, score)),
            _ => {}
        }
    }
    best
}

fn load_labels(labels_path: &Path) -> Result<Vec<String>> {
    let mut reader = csv::Reader::from_path(labels_path)?;
    let headers = reader.headers()?.clone();
    let column = headers
        .iter()
        .position(|h| h == LABEL_COLUMN)
        .ok_or_else(|| {
            Error::Labels(format!(
                "label file {} has no `{}` column",
                labels_path.display(),
                LABEL_COLUMN
            ))
        })?;

    let mut labels = Vec::new();
    for record in reader.records() {
        let record = record?;
        let label = record.get(column).ok_or_else(|| {
            Error::Labels(format!("row {} is missing the label column", labels.len() + 1))
        })?;
        labels.push(label.to_string());
    }

    if labels.is_empty() {
        return Err(Error::Labels(format!(
            "label file {} has no rows",
            labels_path.display()
        )));
    }
    Ok(labels)
}
