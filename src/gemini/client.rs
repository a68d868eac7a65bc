use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use super::types::{GenerateContentRequest, GenerateContentResponse};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Model API errors
#[derive(Debug, Error)]
pub enum GeminiError {
    #[error("Rate limited by the model API")]
    RateLimited,

    #[error("API key problem: {0}")]
    InvalidApiKey(String),

    #[error("API error {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Network error: {0}")]
    Transport(String),

    #[error("Decode error: {0}")]
    Decode(String),
}

/// Anything that answers `generateContent` requests
#[async_trait::async_trait]
pub trait TextModel: Send + Sync {
    async fn generate(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, GeminiError>;
}

/// Gemini REST client
pub struct GeminiClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self, GeminiError> {
        let http_client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| GeminiError::Transport(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    fn endpoint(&self, model: &str) -> String {
        let model = model.strip_prefix("models/").unwrap_or(model);
        format!("{}/models/{}:generateContent", self.base_url, model)
    }
}

#[async_trait::async_trait]
impl TextModel for GeminiClient {
    async fn generate(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, GeminiError> {
        if self.api_key.trim().is_empty() {
            return Err(GeminiError::InvalidApiKey("GEMINI_API_KEY is not set".to_string()));
        }

        debug!(model, "Calling generateContent");

        let response = self
            .http_client
            .post(self.endpoint(model))
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| GeminiError::Transport(e.to_string()))?;

        let status = response.status();

        if status == 429 {
            return Err(GeminiError::RateLimited);
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(classify_failure(status.as_u16(), error_text));
        }

        response
            .json::<GenerateContentResponse>()
            .await
            .map_err(|e| GeminiError::Decode(e.to_string()))
    }
}

fn classify_failure(status: u16, body: String) -> GeminiError {
    if status == 401 || status == 403 || body.contains("API_KEY") {
        GeminiError::InvalidApiKey(body)
    } else {
        GeminiError::Http {
            status,
            message: body,
        }
    }
}
