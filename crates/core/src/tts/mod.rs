mod google;
mod store;

use crate::config::SpeechLang;
use bytes::Bytes;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

pub use google::GoogleTranslateTts;
pub use store::{AudioStore, StoredAudio};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TtsRequest {
    pub text: String,
    pub lang: SpeechLang,
}

/// Encoded audio ready to be written out, e.g. MP3 bytes with extension `mp3`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpeechAudio {
    pub bytes: Bytes,
    pub extension: &'static str,
}

#[derive(thiserror::Error, Debug)]
pub enum TtsError {
    #[error("nothing to synthesize")]
    EmptyText,
    #[error("tts request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("tts service returned HTTP {status}")]
    Api { status: u16 },
    #[error("failed to store synthesized audio: {0}")]
    Storage(#[from] std::io::Error),
}

pub trait SpeechSynthesizer: Send + Sync {
    fn synthesize(&self, request: TtsRequest) -> BoxFuture<'_, Result<SpeechAudio, TtsError>>;
}
