mod gemini;

use futures::future::BoxFuture;

pub use gemini::GeminiClient;

#[derive(thiserror::Error, Debug)]
pub enum ReplyError {
    #[error("no API key configured for the reply service")]
    MissingApiKey,
    #[error("reply request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("reply service returned HTTP {status}: {body}")]
    Api { status: u16, body: String },
    #[error("invalid reply response: {0}")]
    InvalidResponse(String),
}

/// Hosted generative-language model turning a prompt into free text.
pub trait ReplyGenerator: Send + Sync {
    fn generate(&self, prompt: String) -> BoxFuture<'_, Result<String, ReplyError>>;
}
