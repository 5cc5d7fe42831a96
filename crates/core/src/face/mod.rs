//! Face-image mood prediction on top of an external emotion model.

mod deepface;

use crate::labels::{FaceEmotion, LabelMap, ProductMood};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

pub use deepface::DeepFaceClassifier;

const LOG_TARGET: &str = "face";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct FacePrediction {
    /// Highest-confidence label in the model's own vocabulary.
    pub dominant: String,
    pub scores: BTreeMap<String, f32>,
}

impl FacePrediction {
    /// Builds a prediction whose dominant label is the best-scoring one.
    /// Returns `None` for an empty score set.
    pub fn from_scores(scores: BTreeMap<String, f32>) -> Option<Self> {
        let dominant = scores
            .iter()
            .filter(|(_, s)| s.is_finite())
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(label, _)| label.clone())?;
        Some(Self { dominant, scores })
    }
}

#[derive(thiserror::Error, Debug)]
pub enum FaceError {
    #[error("failed to read image: {0}")]
    Io(#[from] std::io::Error),
    #[error("face analysis request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("face service returned HTTP {status}: {body}")]
    Api { status: u16, body: String },
    #[error("face classifier failed: {0}")]
    Classifier(String),
}

pub trait FaceClassifier: Send + Sync {
    fn classify(&self, image: PathBuf) -> BoxFuture<'_, Result<FacePrediction, FaceError>>;
}

/// Maps a face image to a [`ProductMood`]; never fails.
pub struct FaceMoodPredictor<C> {
    classifier: C,
    labels: LabelMap,
}

impl<C: FaceClassifier> FaceMoodPredictor<C> {
    pub fn new(classifier: C, labels: LabelMap) -> Self {
        Self { classifier, labels }
    }

    pub async fn predict(&self, image: PathBuf) -> ProductMood {
        let dominant = match self.classifier.classify(image.clone()).await {
            Ok(prediction) => prediction.dominant,
            Err(e) => {
                tracing::warn!(
                    target: LOG_TARGET,
                    error = %e,
                    image = %image.display(),
                    "face prediction failed"
                );
                FaceEmotion::Neutral.as_str().to_owned()
            }
        };
        self.labels.map(&dominant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;

    struct FixedClassifier(Result<&'static str, &'static str>);

    impl FaceClassifier for FixedClassifier {
        fn classify(&self, _image: PathBuf) -> BoxFuture<'_, Result<FacePrediction, FaceError>> {
            let outcome = self.0;
            async move {
                match outcome {
                    Ok(label) => Ok(FacePrediction {
                        dominant: label.to_owned(),
                        scores: BTreeMap::new(),
                    }),
                    Err(msg) => Err(FaceError::Classifier(msg.to_owned())),
                }
            }
            .boxed()
        }
    }

    fn predict(outcome: Result<&'static str, &'static str>) -> ProductMood {
        let predictor = FaceMoodPredictor::new(FixedClassifier(outcome), LabelMap::face_default());
        futures::executor::block_on(predictor.predict(PathBuf::from("face.jpg")))
    }

    #[test]
    fn dominant_label_is_remapped() {
        assert_eq!(predict(Ok("sad")), ProductMood::Lonely);
        assert_eq!(predict(Ok("Fear")), ProductMood::Tensed);
    }

    #[test]
    fn unknown_dominant_label_is_carefree() {
        assert_eq!(predict(Ok("contempt")), ProductMood::Carefree);
    }

    #[test]
    fn classifier_failure_is_carefree() {
        assert_eq!(predict(Err("no face found")), ProductMood::Carefree);
    }

    #[test]
    fn from_scores_picks_highest() {
        let scores: BTreeMap<String, f32> = [
            ("angry".to_owned(), 0.1),
            ("happy".to_owned(), 0.7),
            ("sad".to_owned(), f32::NAN),
            ("neutral".to_owned(), 0.2),
        ]
        .into_iter()
        .collect();
        let p = FacePrediction::from_scores(scores).expect("non-empty");
        assert_eq!(p.dominant, "happy");
        assert!(FacePrediction::from_scores(BTreeMap::new()).is_none());
    }
}
