use std::fmt;

/// Represents the different types of errors that can occur while preparing an image
/// for classification.
///
/// Classification itself never fails; these errors surface only from the lower
/// level feature extraction API and are mapped to the unknown class by
/// [`HeuristicClassifier::classify_bytes`](super::HeuristicClassifier::classify_bytes).
#[derive(Debug)]
pub enum ClassifierError {
    /// The image bytes could not be decoded
    DecodeError(String),
    /// The decoded image has no pixels
    ValidationError(String),
}

impl fmt::Display for ClassifierError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DecodeError(msg) => write!(f, "Decode error: {}", msg),
            Self::ValidationError(msg) => write!(f, "Validation error: {}", msg),
        }
    }
}

impl std::error::Error for ClassifierError {}

impl From<image::ImageError> for ClassifierError {
    fn from(err: image::ImageError) -> Self {
        ClassifierError::DecodeError(err.to_string())
    }
}
