use std::io;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use log::{debug, info, warn};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

use super::output::{parse_classifier_output, ClassifierOutput};
use crate::config::{ProcessConfig, DEFAULT_CLASSIFIER_TIMEOUT};
use crate::model_manager::ModelArtifact;

/// Environment variable through which the model artifact path reaches the process.
pub const MODEL_PATH_ENV: &str = "SIGNSCAN_MODEL_PATH";

#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("Invalid classifier configuration: {0}")]
    InvalidConfig(String),
    #[error("Failed to start classifier process {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("Classifier exited with status {code:?}: {stderr}")]
    Exited { code: Option<i32>, stderr: String },
    #[error("Classifier produced no output: {stderr}")]
    EmptyOutput { stderr: String },
    #[error("Classifier timed out after {0:?}")]
    Timeout(Duration),
    #[error("Classifier I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Runs an external classifier as `program [args..] <image path>` and reads its
/// answer from stdout.
#[derive(Debug, Clone)]
pub struct ProcessClassifier {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl ProcessClassifier {
    pub fn builder() -> ProcessClassifierBuilder {
        ProcessClassifierBuilder::new()
    }

    pub fn from_config(config: &ProcessConfig) -> Result<Self, ProcessError> {
        Self::builder()
            .program(&config.program)
            .args(config.args.iter())
            .timeout(config.timeout)
            .build()
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Classifies the image at `image_path`.
    ///
    /// The child is always reaped before returning: on timeout it is killed and
    /// awaited. If the returned future is dropped early, `kill_on_drop` takes over.
    ///
    /// Only the direct child is signalled. A wrapper script that forks the real
    /// classifier should `exec` it, otherwise the grandchild outlives a timeout.
    pub async fn classify(
        &self,
        image_path: &Path,
        model: Option<&ModelArtifact>,
    ) -> Result<ClassifierOutput, ProcessError> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .arg(image_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(model) = model {
            command.env(MODEL_PATH_ENV, &model.path);
        }

        info!("Running classifier: {} {:?} {:?}", self.program, self.args, image_path);
        let mut child = command.spawn().map_err(|source| ProcessError::Launch {
            program: self.program.clone(),
            source,
        })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let run = async { tokio::join!(child.wait(), read_pipe(stdout), read_pipe(stderr)) };
        let outcome = tokio::time::timeout(self.timeout, run).await;

        let (status, stdout, stderr) = match outcome {
            Ok(finished) => finished,
            Err(_) => {
                warn!("Classifier exceeded {:?}, terminating", self.timeout);
                if let Err(e) = child.kill().await {
                    warn!("Failed to kill classifier process: {}", e);
                }
                return Err(ProcessError::Timeout(self.timeout));
            }
        };

        let status = status?;
        let stdout = stdout?;
        let stderr = stderr?;
        debug!("Classifier stdout: {:?}", stdout);
        if !stderr.trim().is_empty() {
            debug!("Classifier stderr: {:?}", stderr);
        }

        if !status.success() {
            warn!("Classifier exited with {}", status);
            return Err(ProcessError::Exited {
                code: status.code(),
                stderr: stderr.trim().to_string(),
            });
        }

        parse_classifier_output(&stdout).ok_or_else(|| ProcessError::EmptyOutput {
            stderr: stderr.trim().to_string(),
        })
    }
}

async fn read_pipe<R: AsyncRead + Unpin>(pipe: Option<R>) -> io::Result<String> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        pipe.read_to_end(&mut buf).await?;
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// A builder for constructing a ProcessClassifier with a fluent interface.
#[derive(Debug)]
pub struct ProcessClassifierBuilder {
    program: Option<String>,
    args: Vec<String>,
    timeout: Duration,
}

impl Default for ProcessClassifierBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessClassifierBuilder {
    pub fn new() -> Self {
        Self {
            program: None,
            args: Vec::new(),
            timeout: DEFAULT_CLASSIFIER_TIMEOUT,
        }
    }

    pub fn program(mut self, program: impl Into<String>) -> Self {
        self.program = Some(program.into());
        self
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build(self) -> Result<ProcessClassifier, ProcessError> {
        let program = self
            .program
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .ok_or_else(|| ProcessError::InvalidConfig("classifier program must be set".into()))?;
        if self.timeout.is_zero() {
            return Err(ProcessError::InvalidConfig("timeout must be greater than zero".into()));
        }

        Ok(ProcessClassifier {
            program,
            args: self.args,
            timeout: self.timeout,
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn shell(script: &str) -> ProcessClassifier {
        ProcessClassifier::builder()
            .program("sh")
            .args(["-c", script])
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap()
    }

    #[test]
    fn test_builder_validation() {
        assert!(ProcessClassifier::builder().build().is_err());
        assert!(ProcessClassifier::builder().program("  ").build().is_err());
        assert!(ProcessClassifier::builder()
            .program("python3")
            .timeout(Duration::ZERO)
            .build()
            .is_err());
        let classifier = ProcessClassifier::builder().program("python3").arg("predict.py").build().unwrap();
        assert_eq!(classifier.timeout(), Duration::from_secs(60));
        assert_eq!(classifier.program(), "python3");
    }

    #[tokio::test]
    async fn test_image_path_is_last_argument() {
        // With `sh -c`, the first trailing argument becomes $0
        let out = shell("echo loading; echo \"$0\"").classify(Path::new("/tmp/x.png"), None).await.unwrap();
        assert_eq!(out.prediction, "/tmp/x.png");
    }

    #[tokio::test]
    async fn test_model_path_is_exported() {
        let artifact = ModelArtifact {
            name: "cnn".to_string(),
            path: "/models/cnn.keras".into(),
        };
        let out = shell("echo \"$SIGNSCAN_MODEL_PATH\"")
            .classify(Path::new("img.png"), Some(&artifact))
            .await
            .unwrap();
        assert_eq!(out.prediction, "/models/cnn.keras");
    }

    #[tokio::test]
    async fn test_nonzero_exit() {
        let err = shell("echo boom >&2; exit 3").classify(Path::new("img.png"), None).await.unwrap_err();
        match err {
            ProcessError::Exited { code, stderr } => {
                assert_eq!(code, Some(3));
                assert_eq!(stderr, "boom");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_empty_output() {
        let err = shell("true").classify(Path::new("img.png"), None).await.unwrap_err();
        assert!(matches!(err, ProcessError::EmptyOutput { .. }));
    }

    #[tokio::test]
    async fn test_timeout_kills_process() {
        let classifier = ProcessClassifier::builder()
            .program("sh")
            .args(["-c", "sleep 30"])
            .timeout(Duration::from_millis(200))
            .build()
            .unwrap();
        let started = std::time::Instant::now();
        let err = classifier.classify(Path::new("img.png"), None).await.unwrap_err();
        assert!(matches!(err, ProcessError::Timeout(_)));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_timeout_reaps_exec_wrapper() {
        let dir = tempfile::tempdir().unwrap();
        let pid_file = dir.path().join("pid");
        let script = format!("echo $$ > {}; exec sleep 30", pid_file.display());
        let classifier = ProcessClassifier::builder()
            .program("sh")
            .args(["-c", script.as_str()])
            .timeout(Duration::from_millis(300))
            .build()
            .unwrap();

        let err = classifier.classify(Path::new("img.png"), None).await.unwrap_err();
        assert!(matches!(err, ProcessError::Timeout(_)));
        let pid = std::fs::read_to_string(&pid_file).unwrap();
        assert!(!Path::new("/proc").join(pid.trim()).exists());
    }

    #[tokio::test]
    async fn test_launch_failure() {
        let classifier = ProcessClassifier::builder()
            .program("/nonexistent/signscan-classifier")
            .build()
            .unwrap();
        let err = classifier.classify(Path::new("img.png"), None).await.unwrap_err();
        assert!(matches!(err, ProcessError::Launch { .. }));
    }
}
