//! Google Gemini `generateContent` client.
//!
//! Thin wrapper over the Generative Language REST API: one POST with the
//! composed prompt, first candidate text back. No retry and no timeout
//! beyond the HTTP client's defaults.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{CompletionClient, CompletionError};

/// Model the original tool was built against.
pub const DEFAULT_MODEL: &str = "gemini-2.5-pro";

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    candidates: Option<Vec<Candidate>>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

pub struct GeminiClient {
    client: reqwest::Client,
    model: String,
}

impl GeminiClient {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            model: model.into(),
        }
    }
}

impl Default for GeminiClient {
    fn default() -> Self {
        Self::new(DEFAULT_MODEL)
    }
}

#[async_trait]
impl CompletionClient for GeminiClient {
    async fn complete(&self, api_key: &str, prompt: &str) -> Result<String, CompletionError> {
        let url = format!(
            "{}/{}:generateContent?key={}",
            API_BASE, self.model, api_key
        );

        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
        };

        tracing::debug!(model = %self.model, prompt_len = prompt.len(), "sending completion request");

        let response = self.client.post(&url).json(&request).send().await?;
        let status = response.status();
        let body = response.text().await?;

        // The API reports errors both via HTTP status and via an `error`
        // object in the body; prefer the body message when it parses.
        let parsed: GenerateResponse = match serde_json::from_str(&body) {
            Ok(parsed) => parsed,
            Err(_) if !status.is_success() => {
                return Err(CompletionError::Service(format!("{}: {}", status, body)));
            }
            Err(e) => {
                return Err(CompletionError::Service(format!(
                    "unexpected response: {}",
                    e
                )));
            }
        };

        if let Some(error) = parsed.error {
            return Err(CompletionError::Service(error.message));
        }
        if !status.is_success() {
            return Err(CompletionError::Service(format!("{}: {}", status, body)));
        }

        parsed
            .candidates
            .and_then(|c| c.into_iter().next())
            .and_then(|c| c.content.parts.into_iter().next())
            .and_then(|p| p.text)
            .ok_or(CompletionError::EmptyResponse)
    }
}
