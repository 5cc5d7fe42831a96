use crate::config::{DeepFaceConfig, RequestTimeout};
use crate::face::{FaceClassifier, FaceError, FacePrediction};
use crate::util::{is_http_retryable, is_transport_retryable, retry_with_backoff, RetryConfig};
use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

const LOG_TARGET: &str = "face::deepface";

/// Client for the DeepFace REST service (`POST /analyze`), asking only for
/// the emotion action and tolerating images where no face is detected.
#[derive(Clone)]
pub struct DeepFaceClassifier {
    client: Client,
    base_url: String,
    retry: RetryConfig,
}

#[derive(Debug, Deserialize)]
struct AnalyzeResponse {
    #[serde(default)]
    results: Vec<FaceResult>,
}

#[derive(Debug, Deserialize)]
struct FaceResult {
    dominant_emotion: Option<String>,
    #[serde(default)]
    emotion: BTreeMap<String, f32>,
}

impl DeepFaceClassifier {
    pub fn new(config: &DeepFaceConfig, timeout: RequestTimeout) -> Result<Self, FaceError> {
        let client = Client::builder().timeout(timeout.duration()).build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            retry: RetryConfig::default(),
        })
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/analyze", self.base_url)
    }

    fn form(image: &[u8], file_name: &str) -> Form {
        Form::new()
            .part("img", Part::bytes(image.to_vec()).file_name(file_name.to_owned()))
            .text("actions", "emotion")
            .text("enforce_detection", "false")
    }

    /// First detected face wins. The service's own dominant label is
    /// preferred; otherwise the best score is taken.
    fn prediction(response: AnalyzeResponse) -> Result<FacePrediction, FaceError> {
        let face = response
            .results
            .into_iter()
            .next()
            .ok_or_else(|| FaceError::Classifier("no face in response".to_owned()))?;
        match face.dominant_emotion {
            Some(dominant) => Ok(FacePrediction {
                dominant,
                scores: face.emotion,
            }),
            None => FacePrediction::from_scores(face.emotion)
                .ok_or_else(|| FaceError::Classifier("response has no emotion scores".to_owned())),
        }
    }

    async fn send_once(&self, image: &[u8], file_name: &str) -> Result<FacePrediction, FaceError> {
        let response = self
            .client
            .post(self.endpoint())
            .multipart(Self::form(image, file_name))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body: String = body.chars().take(200).collect();
            return Err(FaceError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: AnalyzeResponse = response
            .json()
            .await
            .map_err(|e| FaceError::Classifier(e.to_string()))?;
        Self::prediction(parsed)
    }
}

fn is_retryable(err: &FaceError) -> bool {
    match err {
        FaceError::Api { status, .. } => is_http_retryable(*status),
        FaceError::Network(e) => is_transport_retryable(e),
        FaceError::Io(_) | FaceError::Classifier(_) => false,
    }
}

impl FaceClassifier for DeepFaceClassifier {
    fn classify(&self, image: PathBuf) -> BoxFuture<'_, Result<FacePrediction, FaceError>> {
        async move {
            let bytes = tokio::fs::read(&image).await?;
            let file_name = image
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("image.jpg")
                .to_owned();
            tracing::debug!(target: LOG_TARGET, bytes = bytes.len(), %file_name, "analyzing face");

            let prediction = retry_with_backoff(
                &self.retry,
                || self.send_once(&bytes, &file_name),
                is_retryable,
            )
            .await?;
            tracing::info!(target: LOG_TARGET, dominant = %prediction.dominant, "face analyzed");
            Ok(prediction)
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::face::FaceMoodPredictor;
    use crate::labels::{LabelMap, ProductMood};
    use crate::util::test_server::{serve, Canned};

    fn classifier(base_url: &str) -> DeepFaceClassifier {
        let config = DeepFaceConfig {
            base_url: base_url.to_owned(),
        };
        DeepFaceClassifier::new(&config, RequestTimeout::default())
            .expect("client")
            .with_retry(RetryConfig::none())
    }

    fn image_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".jpg").tempfile().unwrap();
        std::io::Write::write_all(&mut file, b"\xff\xd8\xff\xe0fake-jpeg").unwrap();
        file
    }

    #[test]
    fn endpoint_ignores_trailing_slash() {
        assert_eq!(
            classifier("http://localhost:5005/").endpoint(),
            "http://localhost:5005/analyze"
        );
    }

    #[test]
    fn dominant_label_is_taken_from_service() {
        let response: AnalyzeResponse = serde_json::from_value(serde_json::json!({
            "results": [{
                "dominant_emotion": "sad",
                "emotion": {"sad": 61.2, "neutral": 30.1, "happy": 8.7},
                "region": {"x": 0, "y": 0, "w": 10, "h": 10}
            }]
        }))
        .unwrap();
        let p = DeepFaceClassifier::prediction(response).unwrap();
        assert_eq!(p.dominant, "sad");
        assert_eq!(p.scores.len(), 3);
    }

    #[test]
    fn missing_dominant_label_uses_best_score() {
        let response: AnalyzeResponse = serde_json::from_value(serde_json::json!({
            "results": [{"emotion": {"fear": 70.0, "angry": 20.0}}]
        }))
        .unwrap();
        assert_eq!(
            DeepFaceClassifier::prediction(response).unwrap().dominant,
            "fear"
        );
    }

    #[test]
    fn empty_results_are_an_error() {
        let response: AnalyzeResponse =
            serde_json::from_value(serde_json::json!({"results": []})).unwrap();
        assert!(matches!(
            DeepFaceClassifier::prediction(response),
            Err(FaceError::Classifier(_))
        ));
    }

    #[tokio::test]
    async fn missing_image_is_an_io_error() {
        let err = classifier("http://127.0.0.1:9")
            .classify(PathBuf::from("/nonexistent/face.jpg"))
            .await
            .unwrap_err();
        assert!(matches!(err, FaceError::Io(_)));
    }

    #[tokio::test]
    async fn uploads_image_and_parses_result() {
        let (base_url, server) = serve(vec![Canned::json(
            200,
            r#"{"results":[{"dominant_emotion":"happy","emotion":{"happy":90.0,"sad":10.0}}]}"#,
        )])
        .await;
        let image = image_file();

        let prediction = classifier(&base_url)
            .classify(image.path().to_path_buf())
            .await
            .unwrap();
        assert_eq!(prediction.dominant, "happy");

        let requests = server.await.unwrap();
        assert!(requests[0].starts_with("POST /analyze "));
        assert!(requests[0].contains("name=\"actions\""));
        assert!(requests[0].contains("fake-jpeg"));
    }

    #[tokio::test]
    async fn service_error_maps_to_api_error() {
        let (base_url, _server) =
            serve(vec![Canned::json(400, r#"{"error":"Face could not be detected"}"#)]).await;
        let image = image_file();

        let err = classifier(&base_url)
            .classify(image.path().to_path_buf())
            .await
            .unwrap_err();
        match err {
            FaceError::Api { status, body } => {
                assert_eq!(status, 400);
                assert!(body.contains("Face could not be detected"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unreachable_service_predicts_carefree() {
        let (base_url, _server) = serve(vec![Canned::json(500, "{}")]).await;
        let image = image_file();
        let predictor = FaceMoodPredictor::new(classifier(&base_url), LabelMap::face_default());
        assert_eq!(
            predictor.predict(image.path().to_path_buf()).await,
            ProductMood::Carefree
        );
    }
}
