//! Audio-to-label classification: decode, extract features, apply the rule
//! table, and fall back to neutral when any step fails.

use crate::decode::{self, Waveform};
use crate::emotion::features::{extract_features, FeatureError};
use crate::emotion::{AcousticEmotion, AcousticFeatures, RuleTable};
use bytes::Bytes;

const LOG_TARGET: &str = "emotion::analyzer";

/// Rule-based classifier over a recording's energy and pitch.
///
/// Classification never fails: anything that goes wrong while reading the
/// audio or extracting features is logged and reported as
/// [`AcousticEmotion::Neutral`].
#[derive(Clone, Copy, Debug, Default)]
pub struct AcousticAnalyzer {
    rules: RuleTable,
}

impl AcousticAnalyzer {
    pub fn new(rules: RuleTable) -> Self {
        Self { rules }
    }

    pub fn analyze(
        &self,
        waveform: &Waveform,
    ) -> Result<(AcousticFeatures, AcousticEmotion), FeatureError> {
        let features = extract_features(waveform)?;
        let emotion = self.rules.classify(&features);
        tracing::debug!(
            target: LOG_TARGET,
            energy = features.energy,
            mean_pitch = features.mean_pitch,
            %emotion,
            "classified waveform"
        );
        Ok((features, emotion))
    }

    pub fn classify(&self, waveform: &Waveform) -> AcousticEmotion {
        match self.analyze(waveform) {
            Ok((_, emotion)) => emotion,
            Err(e) => {
                tracing::warn!(target: LOG_TARGET, error = %e, "emotion analysis failed");
                AcousticEmotion::Neutral
            }
        }
    }

    /// Decodes an encoded recording (WAV, MP3, ...) and classifies it.
    pub fn classify_audio(&self, audio: Bytes) -> AcousticEmotion {
        match decode::decode_bytes(audio, None) {
            Ok(waveform) => self.classify(&waveform),
            Err(e) => {
                tracing::warn!(target: LOG_TARGET, error = %e, "emotion analysis failed");
                AcousticEmotion::Neutral
            }
        }
    }
}
