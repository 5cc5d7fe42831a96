//! Ordered decision rules mapping acoustic features to an emotion.
//!
//! Rules are checked top to bottom and the first match wins. The default
//! thresholds were calibrated by ear and must not drift: the boundaries are
//! strict, so an energy of exactly `HIGH_ENERGY` or `LOW_ENERGY` lands in
//! the neutral band.

use crate::emotion::{AcousticEmotion, AcousticFeatures};

/// Energy above which speech counts as loud.
pub const HIGH_ENERGY: f32 = 0.1;

/// Energy below which speech counts as quiet.
pub const LOW_ENERGY: f32 = 0.05;

/// Mean pitch above which loud speech reads as energetic rather than tense.
pub const HIGH_PITCH_HZ: f32 = 150.0;

/// Mean pitch below which quiet, voiced speech reads as calm.
pub const LOW_PITCH_HZ: f32 = 120.0;

#[derive(Clone, Copy, Debug)]
pub struct EmotionRule {
    pub label: AcousticEmotion,
    pub matches: fn(&AcousticFeatures) -> bool,
}

fn loud_and_high(f: &AcousticFeatures) -> bool {
    f.energy > HIGH_ENERGY && f.mean_pitch > HIGH_PITCH_HZ
}

fn loud(f: &AcousticFeatures) -> bool {
    f.energy > HIGH_ENERGY
}

// A mean pitch of zero means no voiced frame, which is not "low".
fn quiet_and_low(f: &AcousticFeatures) -> bool {
    f.energy < LOW_ENERGY && f.mean_pitch > 0.0 && f.mean_pitch < LOW_PITCH_HZ
}

fn quiet(f: &AcousticFeatures) -> bool {
    f.energy < LOW_ENERGY
}

pub const CALIBRATED_RULES: &[EmotionRule] = &[
    EmotionRule {
        label: AcousticEmotion::Energetic,
        matches: loud_and_high,
    },
    EmotionRule {
        label: AcousticEmotion::Tense,
        matches: loud,
    },
    EmotionRule {
        label: AcousticEmotion::Calm,
        matches: quiet_and_low,
    },
    EmotionRule {
        label: AcousticEmotion::Sad,
        matches: quiet,
    },
];

#[derive(Clone, Copy, Debug)]
pub struct RuleTable {
    rules: &'static [EmotionRule],
    fallback: AcousticEmotion,
}

impl RuleTable {
    pub const fn new(rules: &'static [EmotionRule], fallback: AcousticEmotion) -> Self {
        Self { rules, fallback }
    }

    pub fn classify(&self, features: &AcousticFeatures) -> AcousticEmotion {
        self.rules
            .iter()
            .find(|rule| (rule.matches)(features))
            .map(|rule| rule.label)
            .unwrap_or(self.fallback)
    }

    pub fn rules(&self) -> &'static [EmotionRule] {
        self.rules
    }

    pub fn fallback(&self) -> AcousticEmotion {
        self.fallback
    }
}

impl Default for RuleTable {
    fn default() -> Self {
        Self::new(CALIBRATED_RULES, AcousticEmotion::Neutral)
    }
}

/// Classifies with the calibrated table.
pub fn classify_features(features: &AcousticFeatures) -> AcousticEmotion {
    RuleTable::default().classify(features)
}
