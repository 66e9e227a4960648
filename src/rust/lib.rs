//! Traffic sign identification: a heuristic image classifier, the sign label
//! table, sign descriptions and a relay server that forwards images to an
//! external classifier process.
//!
//! # Basic Usage
//!
//! ```rust
//! use image::{DynamicImage, Rgb, RgbImage};
//! use signscan::{describe_sign, HeuristicClassifier, Xorshift64};
//!
//! let mut rng = Xorshift64::seeded(42);
//! let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(128, 128, Rgb([30, 40, 210])));
//!
//! let result = HeuristicClassifier::new().classify(&image, &mut rng);
//! println!("{} ({:.0}%)", result.class_name, result.confidence * 100.0);
//!
//! let description = describe_sign(&result.class_name, &mut rng);
//! assert!(!description.is_empty());
//! ```
//!
//! # Randomness
//!
//! The classifier breaks ties and draws confidences from a caller supplied
//! [`RandomSource`]. Seeding it makes a run reproducible; the classifier itself
//! holds no state and can be shared across threads.

pub mod classifier;
pub mod config;
pub mod describe;
pub mod labels;
pub mod model_manager;
mod random;
pub mod relay;

pub use classifier::{Branch, ClassificationResult, ClassifierError, ClassifierInfo, FeatureSummary, HeuristicClassifier};
pub use config::{ChatConfig, ConfigError, ProcessConfig, RelayConfig};
pub use describe::{describe_sign, ChatCompletionClient, DescriptionError, SignCategory};
pub use labels::{label_for, SIGN_LABELS, UNKNOWN_SIGN};
pub use model_manager::{ModelArtifact, ModelError, ModelHandle, ModelManager, ModelSource};
pub use random::{RandomSource, Xorshift64};
pub use relay::{AppState, ProcessClassifier, RelayError};

pub fn init_logger() {
    env_logger::init();
}
