use serde::{Deserialize, Serialize};

mod error;
mod features;
mod tree;
#[allow(clippy::module_inception)]
mod classifier;

pub use classifier::{HeuristicClassifier, UNKNOWN_OVERRIDE_PROBABILITY};
pub use error::ClassifierError;
pub use features::{FeatureSummary, EDGE_THRESHOLD, SAMPLE_SIZE};
pub use tree::Branch;

use crate::labels;

/// Outcome of a single classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationResult {
    /// Index into the sign label table
    pub class_id: u32,
    /// Human readable sign name
    pub class_name: String,
    /// Heuristic certainty in `[0, 1]`; not a calibrated probability
    pub confidence: f32,
}

impl ClassificationResult {
    /// Resolves the name from the label table and clamps the confidence.
    pub fn new(class_id: u32, confidence: f32) -> Self {
        Self {
            class_id,
            class_name: labels::label_for(class_id).to_string(),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}

/// Fixed parameters of the heuristic classifier
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifierInfo {
    /// Side of the square the image is resampled to
    pub sample_size: u32,
    /// Brightness delta counted as an edge
    pub edge_threshold: f32,
    /// Chance of replacing a result with an unknown class
    pub unknown_probability: f64,
    /// Number of entries in the label table
    pub num_classes: usize,
}
