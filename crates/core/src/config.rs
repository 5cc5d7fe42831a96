use serde::{Deserialize, Serialize};
use std::{fmt, path::PathBuf, time::Duration};

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_WHISPER_URL: &str = "http://localhost:8000";
pub const DEFAULT_WHISPER_MODEL: &str = "base";
pub const DEFAULT_DEEPFACE_URL: &str = "http://localhost:5005";
pub const DEFAULT_SPEECH_LANG: &str = "en";
pub const DEFAULT_STATIC_DIR: &str = "static";
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_FALLBACK_REPLY: &str = "I'm here for you.";
pub const ENV_GEMINI_API_KEY: &str = "GEMINI_API_KEY";
pub const ENV_GEMINI_MODEL: &str = "GEMINI_MODEL";
pub const ENV_WHISPER_URL: &str = "WHISPER_SERVER_URL";
pub const ENV_WHISPER_MODEL: &str = "WHISPER_MODEL";
pub const ENV_DEEPFACE_URL: &str = "DEEPFACE_SERVER_URL";
pub const ENV_STATIC_DIR: &str = "MANNSAFAR_STATIC_DIR";

/// Language code handed to the speech synthesizer.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SpeechLang(pub String);

impl SpeechLang {
    pub fn new<S: Into<String>>(value: S) -> Result<Self, ConfigError> {
        let v = value.into();
        if v.trim().is_empty() {
            return Err(ConfigError::EmptySpeechLang);
        }
        Ok(Self(v))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SpeechLang {
    fn default() -> Self {
        Self(DEFAULT_SPEECH_LANG.to_owned())
    }
}

#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new<S: Into<String>>(value: S) -> Result<Self, ConfigError> {
        let v = value.into();
        if v.trim().is_empty() {
            return Err(ConfigError::EmptyApiKey);
        }
        Ok(Self(v))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(**redacted**)")
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RequestTimeout {
    pub millis: u64,
}

impl RequestTimeout {
    pub fn new(millis: u64) -> Result<Self, ConfigError> {
        if millis == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(Self { millis })
    }

    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.millis)
    }
}

impl Default for RequestTimeout {
    fn default() -> Self {
        Self {
            millis: DEFAULT_TIMEOUT_MS,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct GeminiConfig {
    pub api_key: Option<ApiKey>,
    pub model: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_GEMINI_MODEL.to_owned(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct WhisperConfig {
    pub base_url: String,
    pub model: String,
}

impl Default for WhisperConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_WHISPER_URL.to_owned(),
            model: DEFAULT_WHISPER_MODEL.to_owned(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeepFaceConfig {
    pub base_url: String,
}

impl Default for DeepFaceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_DEEPFACE_URL.to_owned(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    pub gemini: GeminiConfig,
    pub whisper: WhisperConfig,
    pub deepface: DeepFaceConfig,
    pub speech_lang: SpeechLang,
    pub static_dir: PathBuf,
    pub fallback_reply: String,
    pub timeout: RequestTimeout,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            gemini: GeminiConfig::default(),
            whisper: WhisperConfig::default(),
            deepface: DeepFaceConfig::default(),
            speech_lang: SpeechLang::default(),
            static_dir: PathBuf::from(DEFAULT_STATIC_DIR),
            fallback_reply: DEFAULT_FALLBACK_REPLY.to_owned(),
            timeout: RequestTimeout::default(),
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("speech language must not be empty")]
    EmptySpeechLang,
    #[error("api key must not be empty")]
    EmptyApiKey,
    #[error("request timeout must be > 0 ms")]
    ZeroTimeout,
    #[error("{0} must not be empty")]
    EmptyValue(&'static str),
}

pub trait Env {
    fn var(&self, key: &str) -> Option<String>;
}

#[derive(Clone, Debug, Default)]
pub struct StdEnv;

impl Env for StdEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

#[derive(Clone, Debug, Default)]
pub struct MapEnv {
    vars: std::collections::BTreeMap<String, String>,
}

impl MapEnv {
    pub fn with_var(mut self, key: &str, value: &str) -> Self {
        self.vars.insert(key.to_owned(), value.to_owned());
        self
    }
}

impl Env for MapEnv {
    fn var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}

pub fn resolve_api_key(
    cli_value: Option<String>,
    env_key: &str,
    env: &impl Env,
) -> Result<Option<ApiKey>, ConfigError> {
    match cli_value {
        Some(v) => Ok(Some(ApiKey::new(v)?)),
        None => match env.var(env_key) {
            Some(v) => Ok(Some(ApiKey::new(v)?)),
            None => Ok(None),
        },
    }
}

pub fn resolve_string_with_default(
    cli_value: Option<String>,
    env_key: &str,
    env: &impl Env,
    default: &str,
) -> String {
    match cli_value {
        Some(v) => v,
        None => env.var(env_key).unwrap_or_else(|| default.to_owned()),
    }
}

/// Like [`resolve_string_with_default`] but rejects a blank result.
pub fn resolve_required_string(
    name: &'static str,
    cli_value: Option<String>,
    env_key: &str,
    env: &impl Env,
    default: &str,
) -> Result<String, ConfigError> {
    let v = resolve_string_with_default(cli_value, env_key, env, default);
    if v.trim().is_empty() {
        return Err(ConfigError::EmptyValue(name));
    }
    Ok(v)
}
