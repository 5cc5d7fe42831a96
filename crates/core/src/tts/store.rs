use crate::tts::{SpeechAudio, TtsError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

const LOG_TARGET: &str = "tts::store";

/// Where a synthesized reply was written and how clients fetch it.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredAudio {
    pub path: PathBuf,
    pub url: String,
}

/// Writes synthesized audio under a static directory using random file
/// names, so concurrent replies never collide.
#[derive(Clone, Debug)]
pub struct AudioStore {
    dir: PathBuf,
    url_prefix: String,
}

impl AudioStore {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self {
            dir: dir.into(),
            url_prefix: "/static".to_owned(),
        }
    }

    pub fn with_url_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.url_prefix = prefix.into().trim_end_matches('/').to_owned();
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn save(&self, audio: &SpeechAudio) -> Result<StoredAudio, TtsError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let file_name = format!("{}.{}", Uuid::new_v4(), audio.extension);
        let path = self.dir.join(&file_name);
        tokio::fs::write(&path, &audio.bytes).await?;

        let url = format!("{}/{}", self.url_prefix, file_name);
        tracing::debug!(target: LOG_TARGET, path = %path.display(), %url, "stored reply audio");
        Ok(StoredAudio { path, url })
    }
}
