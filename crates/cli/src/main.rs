use anyhow::Context;
use bytes::Bytes;
use clap::{ArgGroup, Parser, Subcommand};
use mannsafar_core::asr::{AudioClip, WhisperServerTranscriber};
use mannsafar_core::companion::{Companion, CompanionConfig, UserInput};
use mannsafar_core::config::{
    resolve_api_key, resolve_required_string, AppConfig, DeepFaceConfig, Env, GeminiConfig,
    RequestTimeout, SpeechLang, StdEnv, WhisperConfig, DEFAULT_DEEPFACE_URL,
    DEFAULT_FALLBACK_REPLY, DEFAULT_GEMINI_MODEL, DEFAULT_SPEECH_LANG, DEFAULT_STATIC_DIR,
    DEFAULT_TIMEOUT_MS, DEFAULT_WHISPER_MODEL, DEFAULT_WHISPER_URL, ENV_DEEPFACE_URL,
    ENV_GEMINI_API_KEY, ENV_GEMINI_MODEL, ENV_STATIC_DIR, ENV_WHISPER_MODEL, ENV_WHISPER_URL,
};
use mannsafar_core::decode;
use mannsafar_core::emotion::AcousticAnalyzer;
use mannsafar_core::face::{DeepFaceClassifier, FaceMoodPredictor};
use mannsafar_core::labels::LabelMap;
use mannsafar_core::reply::GeminiClient;
use mannsafar_core::tts::{AudioStore, GoogleTranslateTts};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "mannsafar")]
#[command(about = "Emotion-aware companion: voice/text in, empathetic spoken reply out")]
struct Args {
    #[arg(long, global = true)]
    gemini_api_key: Option<String>,

    #[arg(long, global = true)]
    gemini_model: Option<String>,

    #[arg(long, global = true)]
    whisper_url: Option<String>,

    #[arg(long, global = true)]
    whisper_model: Option<String>,

    #[arg(long, global = true)]
    deepface_url: Option<String>,

    #[arg(long, global = true)]
    static_dir: Option<String>,

    #[arg(long, global = true, default_value = DEFAULT_SPEECH_LANG)]
    speech_lang: String,

    #[arg(long, global = true, default_value_t = DEFAULT_TIMEOUT_MS)]
    timeout_ms: u64,

    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Reply to a message or voice note with text and synthesized speech
    #[command(group(
        ArgGroup::new("input")
            .required(true)
            .multiple(false)
            .args(["text", "audio"])
    ))]
    Respond {
        #[arg(long)]
        text: Option<String>,

        #[arg(long)]
        audio: Option<PathBuf>,
    },
    /// Tag free text with one of the eight sentiment labels
    Sentiment {
        #[arg(long)]
        text: String,
    },
    /// Classify a recording from its energy and pitch (offline)
    Classify { path: PathBuf },
    /// Predict the product mood from a face image via the DeepFace service
    PredictFace { image: PathBuf },
    /// Translate a face-model emotion label to the product mood (offline)
    MapFace { label: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level)?;

    let env = StdEnv;
    let cfg = build_config(&args, &env)?;

    match args.command {
        Command::Respond { text, audio } => {
            let input = match (text, audio) {
                (Some(t), None) => UserInput::Text(t),
                (None, Some(path)) => read_clip(path).await?,
                _ => anyhow::bail!("exactly one of --text or --audio must be provided"),
            };
            let companion = build_companion(&cfg)?;
            let reply = companion.respond(input).await?;
            println!("{}", serde_json::to_string_pretty(&reply)?);
        }
        Command::Sentiment { text } => {
            let companion = build_companion(&cfg)?;
            let label = companion.analyze_sentiment(&text).await?;
            println!("{}", serde_json::json!({ "emotion": label }));
        }
        Command::Classify { path } => {
            let waveform = decode::decode_file(&path)
                .with_context(|| format!("failed to decode {}", path.display()))?;
            let (features, emotion) = AcousticAnalyzer::default().analyze(&waveform)?;
            println!(
                "{}",
                serde_json::json!({
                    "energy": features.energy,
                    "mean_pitch": features.mean_pitch,
                    "emotion": emotion,
                })
            );
        }
        Command::PredictFace { image } => {
            let classifier = DeepFaceClassifier::new(&cfg.deepface, cfg.timeout)?;
            let predictor = FaceMoodPredictor::new(classifier, LabelMap::face_default());
            println!("{}", predictor.predict(image).await);
        }
        Command::MapFace { label } => {
            let labels = LabelMap::face_default();
            println!("{}", labels.map(&label));
        }
    }

    Ok(())
}

async fn read_clip(path: PathBuf) -> anyhow::Result<UserInput> {
    let bytes = tokio::fs::read(&path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("audio.wav")
        .to_owned();
    Ok(UserInput::Audio(AudioClip::new(Bytes::from(bytes), file_name)))
}

fn build_companion(
    cfg: &AppConfig,
) -> anyhow::Result<Companion<WhisperServerTranscriber, GeminiClient, GoogleTranslateTts>> {
    let asr = WhisperServerTranscriber::new(&cfg.whisper, cfg.timeout)?;
    let generator = GeminiClient::new(&cfg.gemini, cfg.timeout)
        .with_context(|| format!("set --gemini-api-key or {ENV_GEMINI_API_KEY}"))?;
    let tts = GoogleTranslateTts::new(cfg.timeout)?;

    Ok(Companion {
        asr,
        generator,
        tts,
        analyzer: AcousticAnalyzer::default(),
        store: AudioStore::new(cfg.static_dir.clone()),
        config: CompanionConfig::from_app(cfg),
    })
}

fn init_tracing(level: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(
            level
                .parse()
                .with_context(|| format!("invalid --log-level: {level}"))?,
        )
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn build_config(args: &Args, env: &impl Env) -> anyhow::Result<AppConfig> {
    let api_key = resolve_api_key(args.gemini_api_key.clone(), ENV_GEMINI_API_KEY, env)?;
    let gemini = GeminiConfig {
        api_key,
        model: resolve_required_string(
            "gemini model",
            args.gemini_model.clone(),
            ENV_GEMINI_MODEL,
            env,
            DEFAULT_GEMINI_MODEL,
        )?,
    };
    let whisper = WhisperConfig {
        base_url: resolve_required_string(
            "whisper url",
            args.whisper_url.clone(),
            ENV_WHISPER_URL,
            env,
            DEFAULT_WHISPER_URL,
        )?,
        model: resolve_required_string(
            "whisper model",
            args.whisper_model.clone(),
            ENV_WHISPER_MODEL,
            env,
            DEFAULT_WHISPER_MODEL,
        )?,
    };
    let deepface = DeepFaceConfig {
        base_url: resolve_required_string(
            "deepface url",
            args.deepface_url.clone(),
            ENV_DEEPFACE_URL,
            env,
            DEFAULT_DEEPFACE_URL,
        )?,
    };
    let static_dir = resolve_required_string(
        "static dir",
        args.static_dir.clone(),
        ENV_STATIC_DIR,
        env,
        DEFAULT_STATIC_DIR,
    )?;

    let cfg = AppConfig {
        gemini,
        whisper,
        deepface,
        speech_lang: SpeechLang::new(args.speech_lang.clone())?,
        static_dir: PathBuf::from(static_dir),
        fallback_reply: DEFAULT_FALLBACK_REPLY.to_owned(),
        timeout: RequestTimeout::new(args.timeout_ms)?,
    };

    tracing::debug!(
        gemini_model = %cfg.gemini.model,
        whisper_url = %cfg.whisper.base_url,
        deepface_url = %cfg.deepface.base_url,
        static_dir = %cfg.static_dir.display(),
        "config loaded"
    );
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mannsafar_core::config::MapEnv;

    #[test]
    fn env_fills_unset_options() {
        let args = Args::parse_from(["mannsafar", "map-face", "happy"]);
        let env = MapEnv::default()
            .with_var(ENV_GEMINI_API_KEY, "key")
            .with_var(ENV_WHISPER_URL, "http://whisper:9000");
        let cfg = build_config(&args, &env).unwrap();
        assert_eq!(cfg.gemini.api_key.unwrap().expose(), "key");
        assert_eq!(cfg.gemini.model, DEFAULT_GEMINI_MODEL);
        assert_eq!(cfg.whisper.base_url, "http://whisper:9000");
        assert_eq!(cfg.static_dir, PathBuf::from("static"));
        assert_eq!(cfg.deepface.base_url, DEFAULT_DEEPFACE_URL);
    }

    #[test]
    fn predict_face_takes_image_and_service_url() {
        let args = Args::parse_from([
            "mannsafar",
            "predict-face",
            "selfie.jpg",
            "--deepface-url",
            "http://faces:5005",
        ]);
        assert!(
            matches!(&args.command, Command::PredictFace { image } if image == &PathBuf::from("selfie.jpg"))
        );
        let cfg = build_config(&args, &MapEnv::default()).unwrap();
        assert_eq!(cfg.deepface.base_url, "http://faces:5005");
    }

    #[test]
    fn flags_override_env() {
        let args = Args::parse_from([
            "mannsafar",
            "sentiment",
            "--text",
            "hi",
            "--gemini-model",
            "gemini-2.0-flash",
            "--timeout-ms",
            "500",
        ]);
        let env = MapEnv::default().with_var(ENV_GEMINI_MODEL, "from-env");
        let cfg = build_config(&args, &env).unwrap();
        assert_eq!(cfg.gemini.model, "gemini-2.0-flash");
        assert_eq!(cfg.timeout.millis, 500);
        assert!(cfg.gemini.api_key.is_none());
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let args = Args::parse_from(["mannsafar", "--timeout-ms", "0", "map-face", "sad"]);
        assert!(build_config(&args, &MapEnv::default()).is_err());
    }

    #[test]
    fn respond_requires_exactly_one_input() {
        assert!(Args::try_parse_from(["mannsafar", "respond"]).is_err());
        assert!(Args::try_parse_from([
            "mannsafar",
            "respond",
            "--text",
            "a",
            "--audio",
            "b.wav"
        ])
        .is_err());
        assert!(Args::try_parse_from(["mannsafar", "respond", "--audio", "note.wav"]).is_ok());
    }
}
