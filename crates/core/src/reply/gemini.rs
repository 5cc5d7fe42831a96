use crate::config::{ApiKey, GeminiConfig, RequestTimeout};
use crate::reply::{ReplyError, ReplyGenerator};
use crate::util::{is_http_retryable, is_transport_retryable, retry_with_backoff, RetryConfig};
use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};

const GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
const LOG_TARGET: &str = "reply::gemini";

/// Google Gemini `generateContent` client.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: ApiKey,
    model: String,
    base_url: String,
    retry: RetryConfig,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
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
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GeminiClient {
    pub fn new(config: &GeminiConfig, timeout: RequestTimeout) -> Result<Self, ReplyError> {
        let api_key = config.api_key.clone().ok_or(ReplyError::MissingApiKey)?;
        let client = Client::builder().timeout(timeout.duration()).build()?;
        Ok(Self {
            client,
            api_key,
            model: config.model.clone(),
            base_url: GEMINI_ENDPOINT.to_owned(),
            retry: RetryConfig::default(),
        })
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_owned();
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    fn request_body(prompt: &str) -> GenerateRequest<'_> {
        GenerateRequest {
            contents: vec![Content {
                parts: vec![RequestPart { text: prompt }],
            }],
        }
    }

    /// Concatenated text parts of the first candidate; empty when the model
    /// returned nothing usable (e.g. a blocked prompt).
    fn extract_text(response: GenerateResponse) -> String {
        response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default()
    }

    async fn send_once(&self, prompt: &str) -> Result<String, ReplyError> {
        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", self.api_key.expose())
            .json(&Self::request_body(prompt))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body: String = body.chars().take(200).collect();
            return Err(ReplyError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ReplyError::InvalidResponse(e.to_string()))?;
        Ok(Self::extract_text(parsed))
    }
}

fn is_retryable(err: &ReplyError) -> bool {
    match err {
        ReplyError::Api { status, .. } => is_http_retryable(*status),
        ReplyError::Network(e) => is_transport_retryable(e),
        ReplyError::MissingApiKey | ReplyError::InvalidResponse(_) => false,
    }
}

impl ReplyGenerator for GeminiClient {
    fn generate(&self, prompt: String) -> BoxFuture<'_, Result<String, ReplyError>> {
        async move {
            tracing::debug!(
                target: LOG_TARGET,
                model = %self.model,
                prompt_chars = prompt.len(),
                "generating reply"
            );
            let text = retry_with_backoff(&self.retry, || self.send_once(&prompt), is_retryable)
                .await
                .inspect_err(|e| {
                    tracing::error!(target: LOG_TARGET, error = %e, "reply generation failed")
                })?;
            Ok(text)
        }
        .boxed()
    }
}
