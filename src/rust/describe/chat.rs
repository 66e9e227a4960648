use log::{debug, error, info};
use serde::{Deserialize, Serialize};

use crate::config::ChatConfig;

const SYSTEM_PROMPT: &str = "You are a helpful assistant.";

#[derive(Debug, thiserror::Error)]
pub enum DescriptionError {
    #[error("Request to text generation service failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Text generation service returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("Text generation service returned no content")]
    EmptyResponse,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    messages: [ChatMessage<'a>; 2],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Client for an Azure OpenAI style chat completion deployment.
#[derive(Debug, Clone)]
pub struct ChatCompletionClient {
    http: reqwest::Client,
    url: String,
    api_version: String,
    api_key: String,
    max_tokens: u32,
    temperature: f32,
}

impl ChatCompletionClient {
    pub fn new(config: &ChatConfig) -> Result<Self, DescriptionError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        let url = format!(
            "{}/openai/deployments/{}/chat/completions",
            config.endpoint.trim_end_matches('/'),
            config.deployment
        );
        info!("Text generation endpoint: {}", url);

        Ok(Self {
            http,
            url,
            api_version: config.api_version.clone(),
            api_key: config.api_key.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }

    /// Asks the deployment to describe a sign and returns the trimmed answer.
    pub async fn describe(&self, sign_name: &str) -> Result<String, DescriptionError> {
        let prompt = format!("Describe the following traffic sign in English: \"{}\".", sign_name);
        let request = ChatRequest {
            messages: [
                ChatMessage { role: "system", content: SYSTEM_PROMPT },
                ChatMessage { role: "user", content: &prompt },
            ],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        debug!("Requesting description for {:?}", sign_name);
        let response = self
            .http
            .post(&self.url)
            .query(&[("api-version", self.api_version.as_str())])
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Text generation service returned {}: {}", status, body);
            return Err(DescriptionError::Status { status, body });
        }

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or(DescriptionError::EmptyResponse)
    }
}
