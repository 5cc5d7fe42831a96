//! Acoustic emotion classification.
//!
//! A recording is reduced to two scalar features (mean energy and mean
//! voiced pitch) which are then run through an ordered rule table.

mod analyzer;
pub mod features;
pub mod rules;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use analyzer::AcousticAnalyzer;
pub use features::{extract_features, FeatureError};
pub use rules::{classify_features, EmotionRule, RuleTable};

/// Emotion inferred from how something was said rather than what.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AcousticEmotion {
    Energetic,
    Tense,
    Calm,
    Sad,
    #[default]
    Neutral,
}

impl AcousticEmotion {
    pub const ALL: [AcousticEmotion; 5] = [
        AcousticEmotion::Energetic,
        AcousticEmotion::Tense,
        AcousticEmotion::Calm,
        AcousticEmotion::Sad,
        AcousticEmotion::Neutral,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AcousticEmotion::Energetic => "energetic",
            AcousticEmotion::Tense => "tense",
            AcousticEmotion::Calm => "calm",
            AcousticEmotion::Sad => "sad",
            AcousticEmotion::Neutral => "neutral",
        }
    }
}

impl fmt::Display for AcousticEmotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct AcousticFeatures {
    /// Mean squared amplitude over the whole recording.
    pub energy: f32,
    /// Mean fundamental frequency in Hz over voiced frames; `0.0` when no
    /// frame was voiced.
    pub mean_pitch: f32,
}

impl AcousticFeatures {
    pub fn new(energy: f32, mean_pitch: f32) -> Self {
        Self { energy, mean_pitch }
    }
}
