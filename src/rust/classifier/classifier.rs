use image::DynamicImage;
use log::{debug, warn};

use super::features::{FeatureSummary, EDGE_THRESHOLD, SAMPLE_SIZE};
use super::tree::Branch;
use super::{ClassificationResult, ClassifierInfo};
use crate::labels::{self, UNDECODABLE_CLASS_ID, UNKNOWN_CLASS_IDS};
use crate::random::{RandomSource, Xorshift64};

/// Probability that a result is replaced by one of the unknown classes.
pub const UNKNOWN_OVERRIDE_PROBABILITY: f64 = 0.10;

const UNKNOWN_BASE_CONFIDENCE: f32 = 0.3;
const UNKNOWN_CONFIDENCE_SPREAD: f32 = 0.4;
const UNDECODABLE_CONFIDENCE: f32 = 0.3;

/// Stand-in for a trained traffic sign model that scores coarse color and edge
/// statistics with a fixed decision tree.
///
/// The classifier owns no state, so a single instance can be shared freely
/// across threads. All randomness comes from the caller's [`RandomSource`]:
///
/// ```rust
/// use image::{DynamicImage, Rgb, RgbImage};
/// use signscan::{HeuristicClassifier, Xorshift64};
///
/// let red = DynamicImage::ImageRgb8(RgbImage::from_pixel(64, 64, Rgb([220, 20, 20])));
/// let result = HeuristicClassifier::new().classify(&red, &mut Xorshift64::seeded(1));
/// assert!((0.0..=1.0).contains(&result.confidence));
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct HeuristicClassifier;

const _: () = {
    fn assert_send_sync<T: Send + Sync>() {}
    fn verify_thread_safety() {
        assert_send_sync::<HeuristicClassifier>();
    }
};

impl HeuristicClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn info(&self) -> ClassifierInfo {
        ClassifierInfo {
            sample_size: SAMPLE_SIZE,
            edge_threshold: EDGE_THRESHOLD,
            unknown_probability: UNKNOWN_OVERRIDE_PROBABILITY,
            num_classes: labels::num_classes(),
        }
    }

    /// Classifies a decoded image. Always produces a result.
    pub fn classify<R: RandomSource>(&self, image: &DynamicImage, rng: &mut R) -> ClassificationResult {
        match FeatureSummary::from_image(image) {
            Ok(summary) => self.classify_summary(&summary, rng),
            Err(e) => {
                warn!("Image rejected before analysis: {}", e);
                Self::undecodable()
            }
        }
    }

    /// Decodes and classifies raw image bytes. Undecodable input yields the
    /// first unknown class with low confidence rather than an error.
    pub fn classify_bytes<R: RandomSource>(&self, bytes: &[u8], rng: &mut R) -> ClassificationResult {
        match FeatureSummary::from_bytes(bytes) {
            Ok(summary) => self.classify_summary(&summary, rng),
            Err(e) => {
                warn!("Failed to load image for analysis: {}", e);
                Self::undecodable()
            }
        }
    }

    /// Convenience entry point seeded from the clock.
    pub fn classify_image(&self, image: &DynamicImage) -> ClassificationResult {
        self.classify(image, &mut Xorshift64::from_entropy())
    }

    pub fn classify_summary<R: RandomSource>(
        &self,
        summary: &FeatureSummary,
        rng: &mut R,
    ) -> ClassificationResult {
        debug!(
            "Image statistics: rgb=({:.1}, {:.1}, {:.1}) brightness={:.1} edges={}",
            summary.avg_red, summary.avg_green, summary.avg_blue, summary.avg_brightness, summary.edge_count
        );

        let branch = Branch::select(summary);
        let candidates = branch.candidates();
        let mut class_id = if candidates.len() > 1 {
            candidates[rng.next_index(candidates.len())]
        } else {
            candidates[0]
        };
        let mut confidence = branch.base_confidence() + rng.next_f64() as f32 * branch.spread();

        if rng.chance(UNKNOWN_OVERRIDE_PROBABILITY) {
            let (first, last) = (*UNKNOWN_CLASS_IDS.start(), *UNKNOWN_CLASS_IDS.end());
            class_id = first + rng.next_index((last - first + 1) as usize) as u32;
            confidence = UNKNOWN_BASE_CONFIDENCE + rng.next_f64() as f32 * UNKNOWN_CONFIDENCE_SPREAD;
            debug!("Uncertainty override to unknown class {}", class_id);
        } else {
            debug!("Branch {:?} picked class {}", branch, class_id);
        }

        ClassificationResult::new(class_id, confidence)
    }

    fn undecodable() -> ClassificationResult {
        ClassificationResult::new(UNDECODABLE_CLASS_ID, UNDECODABLE_CONFIDENCE)
    }
}
