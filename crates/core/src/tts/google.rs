use crate::config::RequestTimeout;
use crate::tts::{SpeechAudio, SpeechSynthesizer, TtsError, TtsRequest};
use crate::util::{is_http_retryable, is_transport_retryable, retry_with_backoff, RetryConfig};
use bytes::{Bytes, BytesMut};
use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::Client;

const TRANSLATE_TTS_URL: &str = "https://translate.google.com/translate_tts";
const LOG_TARGET: &str = "tts::google";

/// The endpoint rejects longer inputs.
pub const MAX_CHUNK_CHARS: usize = 100;

/// Google Translate's speech endpoint, the same one gTTS talks to.
/// Long replies are split into chunks and the MP3 responses concatenated.
#[derive(Clone)]
pub struct GoogleTranslateTts {
    client: Client,
    base_url: String,
    retry: RetryConfig,
}

impl GoogleTranslateTts {
    pub fn new(timeout: RequestTimeout) -> Result<Self, TtsError> {
        let client = Client::builder().timeout(timeout.duration()).build()?;
        Ok(Self {
            client,
            base_url: TRANSLATE_TTS_URL.to_owned(),
            retry: RetryConfig::default(),
        })
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    async fn fetch_chunk(
        &self,
        chunk: &str,
        lang: &str,
        idx: usize,
        total: usize,
    ) -> Result<Bytes, TtsError> {
        let idx = idx.to_string();
        let total = total.to_string();
        let textlen = chunk.chars().count().to_string();
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("ie", "UTF-8"),
                ("client", "tw-ob"),
                ("q", chunk),
                ("tl", lang),
                ("idx", idx.as_str()),
                ("total", total.as_str()),
                ("textlen", textlen.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TtsError::Api {
                status: status.as_u16(),
            });
        }
        Ok(response.bytes().await?)
    }
}

fn is_retryable(err: &TtsError) -> bool {
    match err {
        TtsError::Api { status } => is_http_retryable(*status),
        TtsError::Network(e) => is_transport_retryable(e),
        TtsError::EmptyText | TtsError::Storage(_) => false,
    }
}

/// Splits `text` into pieces of at most `max_chars` characters, preferring
/// sentence punctuation, then whitespace, and hard-cutting words that are
/// longer than a whole chunk.
pub fn split_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut rest = text.trim();

    while !rest.is_empty() {
        if rest.chars().count() <= max_chars {
            chunks.push(rest.to_owned());
            break;
        }

        let limit = rest
            .char_indices()
            .nth(max_chars)
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let window = &rest[..limit];

        let cut = window
            .rfind(['.', '!', '?', ';', ':', ','])
            .map(|i| i + 1)
            .filter(|&i| i > 0 && i <= limit)
            .or_else(|| window.rfind(char::is_whitespace).filter(|&i| i > 0))
            .unwrap_or(limit);

        let piece = rest[..cut].trim();
        if !piece.is_empty() {
            chunks.push(piece.to_owned());
        }
        rest = rest[cut..].trim_start();
    }
    chunks
}

impl SpeechSynthesizer for GoogleTranslateTts {
    fn synthesize(&self, request: TtsRequest) -> BoxFuture<'_, Result<SpeechAudio, TtsError>> {
        async move {
            let chunks = split_text(&request.text, MAX_CHUNK_CHARS);
            if chunks.is_empty() {
                return Err(TtsError::EmptyText);
            }

            let lang = request.lang.as_str();
            let total = chunks.len();
            let mut audio = BytesMut::new();
            for (idx, chunk) in chunks.iter().enumerate() {
                let bytes = retry_with_backoff(
                    &self.retry,
                    || self.fetch_chunk(chunk, lang, idx, total),
                    is_retryable,
                )
                .await?;
                audio.extend_from_slice(&bytes);
            }

            tracing::debug!(
                target: LOG_TARGET,
                chunks = total,
                bytes = audio.len(),
                "synthesized speech"
            );
            Ok(SpeechAudio {
                bytes: audio.freeze(),
                extension: "mp3",
            })
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SpeechLang;
    use crate::util::test_server::{serve, Canned};
    use std::time::Duration;

    fn tts(base_url: &str, retry: RetryConfig) -> GoogleTranslateTts {
        GoogleTranslateTts::new(RequestTimeout::default())
            .expect("client")
            .with_base_url(format!("{base_url}/translate_tts"))
            .with_retry(retry)
    }

    fn request(text: &str) -> TtsRequest {
        TtsRequest {
            text: text.to_owned(),
            lang: SpeechLang::default(),
        }
    }

    #[test]
    fn short_text_is_one_chunk() {
        assert_eq!(split_text("  I'm here for you.  ", 100), vec!["I'm here for you."]);
    }

    #[test]
    fn empty_text_has_no_chunks() {
        assert!(split_text("   ", 100).is_empty());
    }

    #[test]
    fn long_text_prefers_sentence_breaks() {
        let text = "That sounds really tough. You are not alone in this, and it is okay to rest.";
        let chunks = split_text(text, 40);
        assert_eq!(chunks[0], "That sounds really tough.");
        assert!(chunks.iter().all(|c| c.chars().count() <= 40));
        assert_eq!(chunks.join(" "), text);
    }

    #[test]
    fn falls_back_to_whitespace() {
        let chunks = split_text("one two three four five", 9);
        assert_eq!(chunks, vec!["one two", "three", "four five"]);
    }

    #[test]
    fn hard_cuts_overlong_words() {
        let chunks = split_text("abcdefghij", 4);
        assert_eq!(chunks, vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn multibyte_text_is_split_on_char_boundaries() {
        let chunks = split_text("ééééé ééééé", 6);
        assert_eq!(chunks, vec!["ééééé", "ééééé"]);
    }

    #[test]
    fn blank_request_is_rejected() {
        let tts = GoogleTranslateTts::new(RequestTimeout::default()).expect("client");
        let err = futures::executor::block_on(tts.synthesize(TtsRequest {
            text: " ".to_owned(),
            lang: SpeechLang::default(),
        }))
        .unwrap_err();
        assert!(matches!(err, TtsError::EmptyText));
    }

    #[test]
    fn retry_policy() {
        assert!(is_retryable(&TtsError::Api { status: 503 }));
        assert!(!is_retryable(&TtsError::Api { status: 404 }));
        assert!(!is_retryable(&TtsError::EmptyText));
    }

    #[tokio::test]
    async fn chunks_are_fetched_in_order_and_concatenated() {
        let (base_url, server) = serve(vec![
            Canned::bytes(200, "audio/mpeg", b"ID3one"),
            Canned::bytes(200, "audio/mpeg", b"ID3two"),
        ])
        .await;
        let text = "That sounds really tough, friend. ".repeat(4);

        let audio = tts(&base_url, RetryConfig::none())
            .synthesize(request(&text))
            .await
            .unwrap();
        assert_eq!(&audio.bytes[..], b"ID3oneID3two");
        assert_eq!(audio.extension, "mp3");

        let requests = server.await.unwrap();
        assert_eq!(requests.len(), 2);
        assert!(requests[0].starts_with("GET /translate_tts?"));
        assert!(requests[0].contains("client=tw-ob"));
        assert!(requests[0].contains("tl=en"));
        assert!(requests[0].contains("idx=0"));
        assert!(requests[1].contains("idx=1"));
        assert!(requests[1].contains("total=2"));
    }

    #[tokio::test]
    async fn server_error_is_retried() {
        let (base_url, server) = serve(vec![
            Canned::bytes(503, "text/plain", b"busy"),
            Canned::bytes(200, "audio/mpeg", b"ID3ok"),
        ])
        .await;

        let audio = tts(&base_url, RetryConfig::new(2, Duration::from_millis(1)))
            .synthesize(request("Hello there."))
            .await
            .unwrap();
        assert_eq!(&audio.bytes[..], b"ID3ok");
        assert_eq!(server.await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn rejected_request_maps_to_api_error() {
        let (base_url, _server) = serve(vec![Canned::bytes(403, "text/html", b"denied")]).await;
        let err = tts(&base_url, RetryConfig::none())
            .synthesize(request("Hello there."))
            .await
            .unwrap_err();
        assert!(matches!(err, TtsError::Api { status: 403 }));
    }
}
