//! Label vocabularies and the tables that translate between them.

mod sentiment;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

pub use sentiment::{SentimentLabel, UnknownSentiment};

/// Labels reported by the external face-emotion model.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FaceEmotion {
    Angry,
    Disgust,
    Fear,
    Happy,
    Sad,
    Surprise,
    Neutral,
}

impl FaceEmotion {
    pub const ALL: [FaceEmotion; 7] = [
        FaceEmotion::Angry,
        FaceEmotion::Disgust,
        FaceEmotion::Fear,
        FaceEmotion::Happy,
        FaceEmotion::Sad,
        FaceEmotion::Surprise,
        FaceEmotion::Neutral,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FaceEmotion::Angry => "angry",
            FaceEmotion::Disgust => "disgust",
            FaceEmotion::Fear => "fear",
            FaceEmotion::Happy => "happy",
            FaceEmotion::Sad => "sad",
            FaceEmotion::Surprise => "surprise",
            FaceEmotion::Neutral => "neutral",
        }
    }
}

impl fmt::Display for FaceEmotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The product's own mood vocabulary, shown to users.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ProductMood {
    Angry,
    Demotivated,
    Tensed,
    Happy,
    Lonely,
    Curious,
    Carefree,
}

impl ProductMood {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductMood::Angry => "Angry",
            ProductMood::Demotivated => "Demotivated",
            ProductMood::Tensed => "Tensed",
            ProductMood::Happy => "Happy",
            ProductMood::Lonely => "Lonely",
            ProductMood::Curious => "Curious",
            ProductMood::Carefree => "Carefree",
        }
    }
}

impl fmt::Display for ProductMood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Case-insensitive lookup from external labels to product moods.
///
/// Built once and shared by reference; lookups never fail and resolve any
/// unknown key to the table's default.
#[derive(Clone, Debug)]
pub struct LabelMap {
    entries: HashMap<String, ProductMood>,
    default: ProductMood,
}

impl LabelMap {
    pub fn new<I, K>(entries: I, default: ProductMood) -> Self
    where
        I: IntoIterator<Item = (K, ProductMood)>,
        K: AsRef<str>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(k, v)| (k.as_ref().to_lowercase(), v))
                .collect(),
            default,
        }
    }

    /// Face-model labels onto product moods, defaulting to `Carefree`.
    pub fn face_default() -> Self {
        Self::new(
            FaceEmotion::ALL.map(|e| (e.as_str(), Self::face_mood(e))),
            ProductMood::Carefree,
        )
    }

    fn face_mood(emotion: FaceEmotion) -> ProductMood {
        match emotion {
            FaceEmotion::Angry => ProductMood::Angry,
            FaceEmotion::Disgust => ProductMood::Demotivated,
            FaceEmotion::Fear => ProductMood::Tensed,
            FaceEmotion::Happy => ProductMood::Happy,
            FaceEmotion::Sad => ProductMood::Lonely,
            FaceEmotion::Surprise => ProductMood::Curious,
            FaceEmotion::Neutral => ProductMood::Carefree,
        }
    }

    pub fn map(&self, label: &str) -> ProductMood {
        self.entries
            .get(&label.to_lowercase())
            .copied()
            .unwrap_or(self.default)
    }

    pub fn default_mood(&self) -> ProductMood {
        self.default
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
