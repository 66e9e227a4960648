//! The relay HTTP server: forwards uploaded images to a classifier and sign
//! names to a text generation backend.

mod backend;
mod error;
mod handlers;
mod output;
mod process;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use log::{info, warn};
use tower_http::cors::{AllowOrigin, CorsLayer};

pub use backend::{ImageUpload, PredictBackend};
pub use error::RelayError;
pub use handlers::{DescribeRequest, DescribeResponse, PredictResponse};
pub use output::{parse_classifier_output, ClassifierOutput};
pub use process::{ProcessClassifier, ProcessClassifierBuilder, ProcessError, MODEL_PATH_ENV};

use crate::classifier::HeuristicClassifier;
use crate::config::RelayConfig;
use crate::describe::ChatCompletionClient;
use crate::model_manager::{ModelHandle, ModelManager};

/// Room for multipart boundaries and headers on top of the image itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Shared, read-only collaborators of the request handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<RelayConfig>,
    pub backend: Arc<PredictBackend>,
    pub chat: Option<ChatCompletionClient>,
    pub model: Option<Arc<ModelHandle>>,
}

impl AppState {
    pub fn from_config(config: RelayConfig) -> Result<Self, RelayError> {
        let backend = match &config.classifier {
            Some(process) => PredictBackend::Process(ProcessClassifier::from_config(process)?),
            None => PredictBackend::Heuristic(HeuristicClassifier::new()),
        };
        match &backend {
            PredictBackend::Process(process) => info!(
                "Prediction backend: process {} (timeout {:?})",
                process.program(),
                process.timeout()
            ),
            PredictBackend::Heuristic(_) => info!("Prediction backend: heuristic"),
        }

        let chat = config.chat.as_ref().map(ChatCompletionClient::new).transpose()?;
        if chat.is_none() {
            info!("No text generation backend configured, using local descriptions");
        }

        let model = match &config.model {
            Some(source) => {
                let manager = ModelManager::new(&config.models_dir)?;
                Some(Arc::new(ModelHandle::new(manager, source.clone())))
            }
            None => None,
        };

        Ok(Self {
            config: Arc::new(config),
            backend: Arc::new(backend),
            chat,
            model,
        })
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

pub fn router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes.saturating_add(MULTIPART_OVERHEAD);

    Router::new()
        .route("/api/health", get(handlers::health))
        .route("/api/info", get(handlers::info))
        .route("/api/predict", post(handlers::predict))
        .route("/api/get-sign-description", post(handlers::describe))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors_layer(&state.config.allowed_origins))
        .with_state(state)
}

/// Binds the configured address and serves until Ctrl-C.
pub async fn serve(config: RelayConfig) -> Result<(), RelayError> {
    let addr = config.bind_addr;
    let state = AppState::from_config(config)?;

    if let Some(model) = &state.model {
        // Warm up eagerly; a failure here is retried on the first request
        if let Err(e) = model.get().await {
            warn!("Model artifact not ready yet: {}", e);
        }
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Relay listening on http://{}", addr);
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Relay stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
    }
}
