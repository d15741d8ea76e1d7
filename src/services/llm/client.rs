use std::future::Future;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::config::SamplingConfig;

pub const EMPTY_RESPONSE_TEXT: &str = "LLM did not return a valid response.";

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("could not reach LLM server at {url}: {reason}")]
    Connection { url: String, reason: String },

    #[error("model '{0}' not found on LLM server")]
    ModelNotFound(String),

    #[error("LLM server error {status}: {body}")]
    Server { status: StatusCode, body: String },

    #[error("could not decode LLM response: {0}")]
    Decode(String),
}

/// Anything that turns a prompt into text. Implemented over HTTP by
/// [`OllamaClient`]; tests substitute canned generators.
pub trait TextGenerator {
    fn model(&self) -> &str;

    fn generate(
        &self,
        prompt: &str,
    ) -> impl Future<Output = Result<String, GenerationError>> + Send;
}

#[derive(Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
    model: String,
    sampling: SamplingConfig,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: &'a SamplingConfig,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: Option<String>,
}

impl OllamaClient {
    /// No request timeout is set; inference on a local model may take minutes.
    pub fn new(base_url: &str, model: &str, sampling: SamplingConfig) -> Self {
        info!("LLM client for model {} via {}", model, base_url);
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            sampling,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl TextGenerator for OllamaClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let url = format!("{}/api/generate", self.base_url);
        let request_body = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false, // One-shot only
            options: &self.sampling,
        };

        info!("Sending prompt to {} ({} chars)", self.model, prompt.len());
        let response = self
            .client
            .post(&url)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| GenerationError::Connection {
                url: self.base_url.clone(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(GenerationError::ModelNotFound(self.model.clone()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Server { status, body });
        }

        let resp_json: GenerateResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::Decode(e.to_string()))?;
        Ok(resp_json
            .response
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .unwrap_or_else(|| EMPTY_RESPONSE_TEXT.to_string()))
    }
}
