use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use sha2::{Digest, Sha256};
use tokio::sync::{Mutex, OnceCell};

/// Where a classifier model artifact comes from and how to check it.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSource {
    /// File name of the artifact inside the models directory
    pub name: String,
    /// Download location; without it the artifact must already be present
    pub url: Option<String>,
    /// Lowercase hex SHA-256 of the artifact
    pub sha256: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Model not downloaded and no download URL configured: {0}")]
    NotDownloaded(String),
    #[error("Download error: {0}")]
    DownloadError(#[from] reqwest::Error),
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Model verification failed for {0}")]
    VerificationFailed(String),
    #[error("Hash mismatch: expected {expected}, got {actual} for {name}")]
    HashMismatch {
        name: String,
        expected: String,
        actual: String,
    },
}

/// Manages classifier model artifacts in a local cache directory.
#[derive(Debug, Clone)]
pub struct ModelManager {
    models_dir: PathBuf,
    download_lock: Arc<Mutex<()>>,
}

impl ModelManager {
    /// Returns the default models directory path
    pub fn get_default_models_dir() -> PathBuf {
        // 1. Check environment variable
        if let Ok(path) = env::var("SIGNSCAN_CACHE") {
            return PathBuf::from(path).join("models");
        }

        // 2. Use platform-specific cache directory
        if let Some(cache_dir) = dirs::cache_dir() {
            return cache_dir.join("signscan").join("models");
        }

        // 3. Fallback to user's home directory
        if let Some(home_dir) = dirs::home_dir() {
            return home_dir.join(".cache").join("signscan").join("models");
        }

        // 4. If all else fails, use system temp directory
        env::temp_dir().join("signscan").join("models")
    }

    pub fn new<P: AsRef<Path>>(models_dir: P) -> io::Result<Self> {
        let models_dir = models_dir.as_ref().to_path_buf();
        fs::create_dir_all(&models_dir)?;
        Ok(Self {
            models_dir,
            download_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn get_model_path(&self, source: &ModelSource) -> PathBuf {
        self.models_dir.join(&source.name)
    }

    pub fn is_model_downloaded(&self, source: &ModelSource) -> bool {
        let path = self.get_model_path(source);
        log::debug!("Model path: {:?} (exists: {})", path, path.exists());
        path.is_file()
    }

    fn hash_bytes(bytes: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        format!("{:x}", hasher.finalize())
    }

    fn verify_file(&self, path: &Path, expected_hash: &str) -> Result<bool, ModelError> {
        let bytes = fs::read(path)?;
        let hash = Self::hash_bytes(&bytes);
        log::debug!("Verifying {:?}: calculated {}, expected {}", path, hash, expected_hash);
        Ok(hash.eq_ignore_ascii_case(expected_hash))
    }

    /// Checks that the artifact exists and, when a hash is configured, matches it.
    pub fn verify_model(&self, source: &ModelSource) -> Result<bool, ModelError> {
        let path = self.get_model_path(source);
        if !path.is_file() {
            log::info!("Model file {:?} does not exist", path);
            return Ok(false);
        }
        match &source.sha256 {
            Some(expected) => self.verify_file(&path, expected),
            None => Ok(true),
        }
    }

    pub async fn download_model(&self, source: &ModelSource) -> Result<(), ModelError> {
        let url = source
            .url
            .as_deref()
            .ok_or_else(|| ModelError::NotDownloaded(source.name.clone()))?;
        let _lock = self.download_lock.lock().await;

        let path = self.get_model_path(source);
        log::info!("Downloading model {} from {} to {:?}", source.name, url, path);
        let response = reqwest::get(url).await?.error_for_status()?;
        let bytes = response.bytes().await?;
        log::info!("Downloaded {} bytes", bytes.len());

        if let Some(expected) = &source.sha256 {
            let actual = Self::hash_bytes(&bytes);
            if !actual.eq_ignore_ascii_case(expected) {
                log::error!("{} hash mismatch: expected {}, got {}", source.name, expected, actual);
                return Err(ModelError::HashMismatch {
                    name: source.name.clone(),
                    expected: expected.clone(),
                    actual,
                });
            }
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        // Write beside the target and rename so a partial file is never picked up
        let partial = path.with_extension("part");
        fs::write(&partial, &bytes)?;
        fs::rename(&partial, &path)?;

        if !self.verify_model(source)? {
            if let Err(e) = self.remove_download(source) {
                log::warn!("Failed to remove unverified model {}: {}", source.name, e);
            }
            return Err(ModelError::VerificationFailed(source.name.clone()));
        }

        log::info!("Model {} downloaded and verified successfully", source.name);
        Ok(())
    }

    pub fn remove_download(&self, source: &ModelSource) -> Result<(), ModelError> {
        let path = self.get_model_path(source);
        if path.exists() {
            fs::remove_file(&path)?;
        }
        Ok(())
    }

    /// Ensures that a model is present and verified, downloading it when it is
    /// missing or fails verification. Returns the artifact path.
    pub async fn ensure_model(&self, source: &ModelSource) -> Result<PathBuf, ModelError> {
        if self.verify_model(source)? {
            log::info!("Model {} verification successful", source.name);
            return Ok(self.get_model_path(source));
        }

        if self.is_model_downloaded(source) {
            log::warn!("Model {} verification failed, re-downloading", source.name);
            if source.url.is_none() {
                return Err(ModelError::VerificationFailed(source.name.clone()));
            }
            self.remove_download(source)?;
        }
        self.download_model(source).await?;
        Ok(self.get_model_path(source))
    }
}

/// A model artifact that has been located and verified.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelArtifact {
    pub name: String,
    pub path: PathBuf,
}

/// Load-once handle to the classifier model artifact.
///
/// Concurrent callers of [`ModelHandle::get`] wait on the same initialization;
/// a failed load is not cached, so the next caller retries.
#[derive(Debug)]
pub struct ModelHandle {
    manager: ModelManager,
    source: ModelSource,
    artifact: OnceCell<Arc<ModelArtifact>>,
}

impl ModelHandle {
    pub fn new(manager: ModelManager, source: ModelSource) -> Self {
        Self {
            manager,
            source,
            artifact: OnceCell::new(),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.artifact.initialized()
    }

    pub async fn get(&self) -> Result<Arc<ModelArtifact>, ModelError> {
        self.artifact
            .get_or_try_init(|| async {
                log::info!("Loading model artifact {}", self.source.name);
                let path = self.manager.ensure_model(&self.source).await?;
                Ok::<_, ModelError>(Arc::new(ModelArtifact {
                    name: self.source.name.clone(),
                    path,
                }))
            })
            .await
            .cloned()
    }
}
