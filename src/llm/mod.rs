pub mod gemini;

use async_trait::async_trait;
use thiserror::Error;

/// Failure of a completion request. The UI does not distinguish these by
/// kind; they all collapse into one error banner carrying the description.
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("service error: {0}")]
    Service(String),

    #[error("the model returned no text")]
    EmptyResponse,
}

/// A remote text-generation service. One prompt in, generated text out.
/// Single request, single response; retries and streaming are out of scope.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, api_key: &str, prompt: &str) -> Result<String, CompletionError>;
}
