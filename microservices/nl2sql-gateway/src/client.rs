//! Text generator client
//!
//! HTTP client for the Gemini `generateContent` API. One attempt per call,
//! bounded by a fixed timeout; the pipeline falls back on any failure.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tabula_core::TabulaError;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::config::GeminiConfig;

pub const GENERATOR_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeneratorError {
    #[error("generator unavailable: {0}")]
    Unavailable(String),

    #[error("generator returned no candidate text")]
    Empty,
}

impl From<GeneratorError> for TabulaError {
    fn from(err: GeneratorError) -> Self {
        match err {
            GeneratorError::Unavailable(msg) => TabulaError::GeneratorUnavailable(msg),
            GeneratorError::Empty => TabulaError::GeneratorEmpty,
        }
    }
}

/// Anything that turns a prompt into raw reply text
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GeneratorError>;

    fn name(&self) -> &str;
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

/// Pull `candidates[0].content.parts[0].text` out of a reply body
pub fn candidate_text(body: &str) -> Result<String, GeneratorError> {
    let reply: GenerateResponse = serde_json::from_str(body)
        .map_err(|e| GeneratorError::Unavailable(format!("malformed reply: {}", e)))?;

    reply
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .and_then(|c| c.parts.into_iter().next())
        .and_then(|p| p.text)
        .filter(|t| !t.trim().is_empty())
        .ok_or(GeneratorError::Empty)
}

pub struct GeminiClient {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    timeout: Duration,
}

impl GeminiClient {
    pub fn new(config: &GeminiConfig) -> tabula_core::Result<Self> {
        Self::with_timeout(config, GENERATOR_TIMEOUT)
    }

    pub fn with_timeout(config: &GeminiConfig, timeout: Duration) -> tabula_core::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TabulaError::Config(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.endpoint(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            timeout,
        })
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    #[instrument(skip(self, prompt), fields(model = %self.model, prompt_len = prompt.len()))]
    async fn generate(&self, prompt: &str) -> Result<String, GeneratorError> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.1,
                max_output_tokens: 1000,
            },
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("X-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                let reason = if e.is_timeout() {
                    format!("timed out after {:?}", self.timeout)
                } else {
                    e.to_string()
                };
                warn!(%reason, "Generator request failed");
                GeneratorError::Unavailable(reason)
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Generator returned an error status");
            return Err(GeneratorError::Unavailable(format!(
                "HTTP {}: {}",
                status.as_u16(),
                detail.chars().take(200).collect::<String>()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| GeneratorError::Unavailable(e.to_string()))?;
        let text = candidate_text(&body)?;
        debug!(reply_len = text.len(), "Generator replied");
        Ok(text)
    }

    fn name(&self) -> &str {
        &self.model
    }
}
