use std::io::Write;
use std::path::Path;

use axum::body::Bytes;
use log::{debug, warn};

use super::error::RelayError;
use super::output::ClassifierOutput;
use super::process::ProcessClassifier;
use crate::classifier::HeuristicClassifier;
use crate::model_manager::ModelHandle;
use crate::random::Xorshift64;

/// An image received by `/api/predict`.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub bytes: Bytes,
    pub file_name: Option<String>,
    pub content_type: String,
}

impl ImageUpload {
    /// File extension for the temp copy, taken from the client's file name or
    /// else the MIME subtype. Only short alphanumeric extensions are kept.
    pub fn extension(&self) -> Option<String> {
        let from_name = self
            .file_name
            .as_deref()
            .and_then(|name| Path::new(name).extension())
            .and_then(|ext| ext.to_str());
        let from_mime = self.content_type.split_once('/').map(|(_, sub)| sub);

        from_name
            .or(from_mime)
            .map(|ext| ext.to_ascii_lowercase())
            .filter(|ext| !ext.is_empty() && ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
    }
}

/// Where `/api/predict` sends images.
#[derive(Debug)]
pub enum PredictBackend {
    /// External classifier process fed through a temp file
    Process(ProcessClassifier),
    /// In-process heuristic classifier
    Heuristic(HeuristicClassifier),
}

impl PredictBackend {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Process(_) => "process",
            Self::Heuristic(_) => "heuristic",
        }
    }

    pub async fn predict(
        &self,
        upload: ImageUpload,
        model: Option<&ModelHandle>,
        upload_dir: &Path,
    ) -> Result<ClassifierOutput, RelayError> {
        match self {
            Self::Heuristic(classifier) => {
                let classifier = *classifier;
                let bytes = upload.bytes;
                let result = tokio::task::spawn_blocking(move || {
                    classifier.classify_bytes(&bytes, &mut Xorshift64::from_entropy())
                })
                .await?;
                debug!("Heuristic prediction: {:?}", result);
                Ok(ClassifierOutput {
                    prediction: result.class_id.to_string(),
                    confidence: Some(result.confidence),
                })
            }
            Self::Process(classifier) => {
                let artifact = match model {
                    Some(handle) => Some(handle.get().await?),
                    None => None,
                };

                // Deleted on drop, so every exit path below cleans up
                let upload_file = write_upload(&upload, upload_dir)?;
                debug!(
                    "Saved upload to {:?} ({} bytes)",
                    upload_file.path(),
                    upload.bytes.len()
                );

                let result = classifier.classify(upload_file.path(), artifact.as_deref()).await;
                if let Err(e) = upload_file.close() {
                    warn!("Failed to remove upload file: {}", e);
                }
                Ok(result?)
            }
        }
    }
}

fn write_upload(upload: &ImageUpload, dir: &Path) -> std::io::Result<tempfile::NamedTempFile> {
    let suffix = upload.extension().map(|ext| format!(".{}", ext)).unwrap_or_default();
    let mut file = tempfile::Builder::new()
        .prefix("signscan-upload-")
        .suffix(&suffix)
        .tempfile_in(dir)?;
    file.write_all(&upload.bytes)?;
    file.flush()?;
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(file_name: Option<&str>, content_type: &str) -> ImageUpload {
        ImageUpload {
            bytes: Bytes::from_static(b"data"),
            file_name: file_name.map(str::to_string),
            content_type: content_type.to_string(),
        }
    }

    #[test]
    fn test_extension_from_file_name() {
        assert_eq!(upload(Some("sign.JPG"), "image/jpeg").extension().as_deref(), Some("jpg"));
    }

    #[test]
    fn test_extension_from_mime() {
        assert_eq!(upload(None, "image/png").extension().as_deref(), Some("png"));
        assert_eq!(upload(None, "image/svg+xml").extension(), None);
    }

    #[test]
    fn test_upload_file_is_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_upload(&upload(Some("a.png"), "image/png"), dir.path()).unwrap();
        let path = file.path().to_path_buf();
        assert!(path.exists());
        assert_eq!(path.extension().unwrap(), "png");
        drop(file);
        assert!(!path.exists());
    }
}
