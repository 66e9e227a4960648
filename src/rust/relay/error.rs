use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use log::{error, warn};

use super::process::ProcessError;
use crate::describe::DescriptionError;
use crate::model_manager::ModelError;

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("No image uploaded")]
    MissingImage,
    #[error("Unsupported content type {0:?}; expected an image")]
    UnsupportedMediaType(String),
    #[error("Image exceeds the upload limit of {limit} bytes")]
    PayloadTooLarge { limit: usize },
    #[error("{0}")]
    BadRequest(String),
    #[error("Invalid upload: {0}")]
    Multipart(#[from] MultipartError),
    #[error(transparent)]
    Classifier(#[from] ProcessError),
    #[error("Model unavailable: {0}")]
    Model(#[from] ModelError),
    #[error("Failed to fetch description: {0}")]
    Description(#[from] DescriptionError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Classification task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingImage | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Multipart(e) => e.status(),
            Self::Classifier(ProcessError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message shown to the client. Classifier failures surface the process'
    /// stderr when it has any.
    fn client_message(&self) -> String {
        match self {
            Self::Classifier(ProcessError::Exited { stderr, .. })
            | Self::Classifier(ProcessError::EmptyOutput { stderr }) => {
                if stderr.is_empty() {
                    "classifier exited with error".to_string()
                } else {
                    stderr.clone()
                }
            }
            Self::Classifier(ProcessError::Launch { .. }) => "Failed to start classifier process".to_string(),
            Self::Description(_) => "Failed to fetch description".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("{}", self);
        } else {
            warn!("Rejected request: {}", self);
        }

        let body = serde_json::json!({ "error": self.client_message() });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_status_mapping() {
        assert_eq!(RelayError::MissingImage.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            RelayError::UnsupportedMediaType("text/plain".into()).status(),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
        assert_eq!(
            RelayError::PayloadTooLarge { limit: 10 }.status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            RelayError::from(ProcessError::Timeout(Duration::from_secs(60))).status(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            RelayError::from(ProcessError::EmptyOutput { stderr: String::new() }).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_exit_message_prefers_stderr() {
        let err = RelayError::from(ProcessError::Exited { code: Some(1), stderr: "Traceback".into() });
        assert_eq!(err.client_message(), "Traceback");
        let err = RelayError::from(ProcessError::Exited { code: Some(1), stderr: String::new() });
        assert_eq!(err.client_message(), "classifier exited with error");
    }
}
