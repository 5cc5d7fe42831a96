use crate::asr::{AsrError, AudioClip, Transcriber, Transcript};
use crate::config::{RequestTimeout, WhisperConfig};
use crate::util::{is_http_retryable, is_transport_retryable, retry_with_backoff, RetryConfig};
use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;

const LOG_TARGET: &str = "asr::whisper";

/// Client for an OpenAI-compatible Whisper server
/// (`POST /v1/audio/transcriptions`).
#[derive(Clone)]
pub struct WhisperServerTranscriber {
    client: Client,
    base_url: String,
    model: String,
    retry: RetryConfig,
}

#[derive(Deserialize)]
struct TranscriptionResponse {
    text: String,
}

impl WhisperServerTranscriber {
    pub fn new(config: &WhisperConfig, timeout: RequestTimeout) -> Result<Self, AsrError> {
        let client = Client::builder().timeout(timeout.duration()).build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            model: config.model.clone(),
            retry: RetryConfig::default(),
        })
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/audio/transcriptions", self.base_url)
    }

    fn form(&self, audio: &AudioClip) -> Form {
        let file = Part::bytes(audio.bytes.to_vec()).file_name(audio.file_name.clone());
        Form::new()
            .part("file", file)
            .text("model", self.model.clone())
            .text("response_format", "json")
            .text("temperature", "0.0")
    }

    async fn send_once(&self, audio: &AudioClip) -> Result<Transcript, AsrError> {
        let response = self
            .client
            .post(self.endpoint())
            .multipart(self.form(audio))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AsrError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: TranscriptionResponse = response
            .json()
            .await
            .map_err(|e| AsrError::InvalidResponse(e.to_string()))?;
        Ok(Transcript { text: parsed.text })
    }
}

fn is_retryable(err: &AsrError) -> bool {
    match err {
        AsrError::Api { status, .. } => is_http_retryable(*status),
        AsrError::Network(e) => is_transport_retryable(e),
        AsrError::EmptyAudio | AsrError::InvalidResponse(_) => false,
    }
}

impl Transcriber for WhisperServerTranscriber {
    fn transcribe(&self, audio: AudioClip) -> BoxFuture<'_, Result<Transcript, AsrError>> {
        async move {
            if audio.bytes.is_empty() {
                return Err(AsrError::EmptyAudio);
            }
            tracing::debug!(
                target: LOG_TARGET,
                bytes = audio.bytes.len(),
                model = %self.model,
                "transcribing"
            );
            let transcript =
                retry_with_backoff(&self.retry, || self.send_once(&audio), is_retryable).await?;
            tracing::info!(
                target: LOG_TARGET,
                chars = transcript.text.len(),
                "transcription complete"
            );
            Ok(transcript)
        }
        .boxed()
    }
}
