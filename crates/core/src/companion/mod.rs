//! Request flows: an empathetic spoken reply to text or a voice note, and
//! one-word sentiment tagging of free text.

use crate::asr::{AsrError, AudioClip, Transcriber};
use crate::config::{AppConfig, SpeechLang};
use crate::emotion::{AcousticAnalyzer, AcousticEmotion};
use crate::labels::SentimentLabel;
use crate::reply::{ReplyError, ReplyGenerator};
use crate::tts::{AudioStore, SpeechSynthesizer, TtsError, TtsRequest};
use serde::{Deserialize, Serialize};

const LOG_TARGET: &str = "companion";

#[derive(Clone, Debug, PartialEq)]
pub enum UserInput {
    Text(String),
    Audio(AudioClip),
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompanionReply {
    pub transcript: String,
    pub response: String,
    pub audio_url: String,
    pub emotion: AcousticEmotion,
}

#[derive(thiserror::Error, Debug)]
pub enum CompanionError {
    #[error("no text provided")]
    EmptyInput,
    #[error(transparent)]
    Transcription(#[from] AsrError),
    #[error(transparent)]
    Generation(#[from] ReplyError),
    #[error(transparent)]
    Synthesis(#[from] TtsError),
}

#[derive(Clone, Debug)]
pub struct CompanionConfig {
    pub fallback_reply: String,
    pub speech_lang: SpeechLang,
}

impl CompanionConfig {
    pub fn from_app(app: &AppConfig) -> Self {
        Self {
            fallback_reply: app.fallback_reply.clone(),
            speech_lang: app.speech_lang.clone(),
        }
    }
}

pub fn reply_prompt(transcript: &str, emotion: AcousticEmotion) -> String {
    format!(
        "The user said: \"{transcript}\".\n\
         Detected emotion: {emotion}.\n\
         Respond briefly, empathetically, and supportively."
    )
}

pub fn sentiment_prompt(text: &str) -> String {
    format!(
        "Analyze the sentiment of the following text and categorize it as a single emotion \
         from this list: {}.\n\
         Provide only the emotion word.\n\
         Text: \"{text}\"",
        SentimentLabel::choices()
    )
}

pub struct Companion<A, G, S> {
    pub asr: A,
    pub generator: G,
    pub tts: S,
    pub analyzer: AcousticAnalyzer,
    pub store: AudioStore,
    pub config: CompanionConfig,
}

impl<A, G, S> Companion<A, G, S>
where
    A: Transcriber,
    G: ReplyGenerator,
    S: SpeechSynthesizer,
{
    pub async fn respond(&self, input: UserInput) -> Result<CompanionReply, CompanionError> {
        let (transcript, emotion) = match input {
            UserInput::Text(text) => {
                if text.trim().is_empty() {
                    return Err(CompanionError::EmptyInput);
                }
                (text, AcousticEmotion::Neutral)
            }
            UserInput::Audio(clip) => {
                let transcript = self.asr.transcribe(clip.clone()).await?;
                let emotion = self.classify(clip).await;
                (transcript.text, emotion)
            }
        };

        tracing::info!(target: LOG_TARGET, %emotion, chars = transcript.len(), "generating reply");
        let generated = self
            .generator
            .generate(reply_prompt(&transcript, emotion))
            .await?;
        let response = match generated.trim() {
            "" => self.config.fallback_reply.clone(),
            reply => reply.to_owned(),
        };

        let audio = self
            .tts
            .synthesize(TtsRequest {
                text: response.clone(),
                lang: self.config.speech_lang.clone(),
            })
            .await?;
        let stored = self.store.save(&audio).await?;

        Ok(CompanionReply {
            transcript,
            response,
            audio_url: stored.url,
            emotion,
        })
    }

    pub async fn analyze_sentiment(&self, text: &str) -> Result<SentimentLabel, CompanionError> {
        if text.is_empty() {
            return Err(CompanionError::EmptyInput);
        }
        let answer = self.generator.generate(sentiment_prompt(text)).await?;
        let label = answer.parse::<SentimentLabel>().unwrap_or_else(|e| {
            tracing::warn!(target: LOG_TARGET, error = %e, "model answered outside the label set");
            SentimentLabel::Neutral
        });
        Ok(label)
    }

    // Feature extraction is CPU bound; keep it off the async workers.
    async fn classify(&self, clip: AudioClip) -> AcousticEmotion {
        let analyzer = self.analyzer;
        match tokio::task::spawn_blocking(move || analyzer.classify_audio(clip.bytes)).await {
            Ok(emotion) => emotion,
            Err(e) => {
                tracing::warn!(target: LOG_TARGET, error = %e, "emotion analysis task failed");
                AcousticEmotion::Neutral
            }
        }
    }
}
