use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use super::backend::ImageUpload;
use super::error::RelayError;
use super::AppState;
use crate::classifier::{ClassifierInfo, HeuristicClassifier};
use crate::describe::{describe_sign_now, is_unrecognized, UNRECOGNIZED_DESCRIPTION};
use crate::labels;

const IMAGE_FIELD: &str = "image";

#[derive(Debug, Serialize, Deserialize)]
pub struct PredictResponse {
    pub prediction: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    /// Sign name resolved from `prediction`
    pub label: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DescribeRequest {
    #[serde(default)]
    pub sign_name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DescribeResponse {
    pub description: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct InfoResponse {
    pub service: &'static str,
    pub version: &'static str,
    pub backend: &'static str,
    pub classes: usize,
    pub heuristic: ClassifierInfo,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now().to_rfc3339(),
    })
}

pub async fn info(State(state): State<AppState>) -> Json<InfoResponse> {
    Json(InfoResponse {
        service: "signscan",
        version: env!("CARGO_PKG_VERSION"),
        backend: state.backend.kind(),
        classes: labels::num_classes(),
        heuristic: HeuristicClassifier::new().info(),
    })
}

pub async fn predict(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<PredictResponse>, RelayError> {
    let mut multipart = multipart.map_err(|e| RelayError::BadRequest(e.body_text()))?;
    let upload = read_image_field(&mut multipart, state.config.max_upload_bytes).await?;
    info!(
        "Received image {:?} ({}, {} bytes)",
        upload.file_name.as_deref().unwrap_or("<unnamed>"),
        upload.content_type,
        upload.bytes.len()
    );

    let output = state
        .backend
        .predict(upload, state.model.as_deref(), &state.config.upload_dir)
        .await?;
    let label = labels::label_for_prediction(&output.prediction).to_string();
    info!("Prediction {} ({})", output.prediction, label);

    Ok(Json(PredictResponse {
        prediction: output.prediction,
        confidence: output.confidence,
        label,
    }))
}

/// Pulls the `image` field out of the form, skipping any other fields.
async fn read_image_field(multipart: &mut Multipart, max_bytes: usize) -> Result<ImageUpload, RelayError> {
    let upload_error = |e: MultipartError| {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            RelayError::PayloadTooLarge { limit: max_bytes }
        } else {
            RelayError::Multipart(e)
        }
    };

    while let Some(field) = multipart.next_field().await.map_err(upload_error)? {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        let content_type = field.content_type().unwrap_or_default().to_string();
        if !content_type.starts_with("image/") {
            return Err(RelayError::UnsupportedMediaType(content_type));
        }
        let file_name = field.file_name().map(str::to_string);
        let bytes = field.bytes().await.map_err(upload_error)?;
        if bytes.is_empty() {
            return Err(RelayError::MissingImage);
        }
        if bytes.len() > max_bytes {
            return Err(RelayError::PayloadTooLarge { limit: max_bytes });
        }

        return Ok(ImageUpload {
            bytes,
            file_name,
            content_type,
        });
    }
    Err(RelayError::MissingImage)
}

pub async fn describe(
    State(state): State<AppState>,
    body: Result<Json<DescribeRequest>, JsonRejection>,
) -> Result<Json<DescribeResponse>, RelayError> {
    let Json(request) = body.map_err(|e| RelayError::BadRequest(e.body_text()))?;
    let sign_name = request
        .sign_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| RelayError::BadRequest("No sign name provided".to_string()))?;

    if is_unrecognized(sign_name) {
        info!("Skipping description for unrecognized sign {:?}", sign_name);
        return Ok(Json(DescribeResponse {
            description: UNRECOGNIZED_DESCRIPTION.to_string(),
        }));
    }

    let description = match &state.chat {
        None => describe_sign_now(sign_name),
        Some(client) => match client.describe(sign_name).await {
            Ok(text) => text,
            Err(e) if state.config.local_description_fallback => {
                warn!("Text generation failed, using local description: {}", e);
                describe_sign_now(sign_name)
            }
            Err(e) => return Err(e.into()),
        },
    };

    Ok(Json(DescribeResponse { description }))
}
