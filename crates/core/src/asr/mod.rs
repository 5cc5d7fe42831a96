mod whisper;

use bytes::Bytes;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

pub use whisper::WhisperServerTranscriber;

/// An encoded recording as uploaded by the user.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioClip {
    pub bytes: Bytes,
    pub file_name: String,
}

impl AudioClip {
    pub fn new<S: Into<String>>(bytes: Bytes, file_name: S) -> Self {
        Self {
            bytes,
            file_name: file_name.into(),
        }
    }

    pub fn wav(bytes: Bytes) -> Self {
        Self::new(bytes, "audio.wav")
    }

    /// File extension of `file_name`, if any.
    pub fn extension(&self) -> Option<&str> {
        std::path::Path::new(&self.file_name)
            .extension()
            .and_then(|e| e.to_str())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Transcript {
    pub text: String,
}

#[derive(thiserror::Error, Debug)]
pub enum AsrError {
    #[error("audio clip is empty")]
    EmptyAudio,
    #[error("transcription request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("transcription service returned HTTP {status}: {body}")]
    Api { status: u16, body: String },
    #[error("invalid transcription response: {0}")]
    InvalidResponse(String),
}

pub trait Transcriber: Send + Sync {
    fn transcribe(&self, audio: AudioClip) -> BoxFuture<'_, Result<Transcript, AsrError>>;
}
