//! Energy and pitch extraction.
//!
//! Framing follows the usual centered layout: the signal is zero padded by
//! half a frame on both sides and cut into `FRAME_LENGTH` windows every
//! `HOP_LENGTH` samples, so even a very short clip yields at least one frame.

use crate::decode::Waveform;
use crate::emotion::AcousticFeatures;
use pitch_detection::detector::mcleod::McLeodDetector;
use pitch_detection::detector::PitchDetector;

/// Analysis window in samples.
pub const FRAME_LENGTH: usize = 2048;

/// Step between consecutive windows (75% overlap).
pub const HOP_LENGTH: usize = FRAME_LENGTH / 4;

/// Lowest pitch considered voiced (C2).
pub const MIN_PITCH_HZ: f32 = 65.406_39;

/// Highest pitch considered voiced (C7).
pub const MAX_PITCH_HZ: f32 = 2093.004_5;

/// Minimum frame power (sum of squares) before the detector will report a
/// pitch. Only digital silence is gated; quiet speech must still be voiced.
const POWER_THRESHOLD: f32 = f32::EPSILON;

const CLARITY_THRESHOLD: f32 = 0.6;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum FeatureError {
    #[error("waveform has no samples")]
    EmptySignal,
    #[error("sample rate must be > 0")]
    InvalidSampleRate,
    #[error("non-finite sample at index {0}")]
    NonFiniteSample(usize),
}

pub fn extract_features(waveform: &Waveform) -> Result<AcousticFeatures, FeatureError> {
    let energy = signal_energy(&waveform.samples)?;
    let mean_pitch = mean_pitch(&waveform.samples, waveform.sample_rate)?;
    Ok(AcousticFeatures { energy, mean_pitch })
}

/// Mean squared amplitude.
pub fn signal_energy(samples: &[f32]) -> Result<f32, FeatureError> {
    if samples.is_empty() {
        return Err(FeatureError::EmptySignal);
    }
    let mut sum = 0.0f64;
    for (i, &s) in samples.iter().enumerate() {
        if !s.is_finite() {
            return Err(FeatureError::NonFiniteSample(i));
        }
        sum += f64::from(s) * f64::from(s);
    }
    Ok((sum / samples.len() as f64) as f32)
}

/// Per-frame pitch estimates inside the vocal range. Frames the detector
/// cannot resolve (silence, noise) are `None`.
pub fn frame_pitches(samples: &[f32], sample_rate: u32) -> Result<Vec<Option<f32>>, FeatureError> {
    if samples.is_empty() {
        return Err(FeatureError::EmptySignal);
    }
    if sample_rate == 0 {
        return Err(FeatureError::InvalidSampleRate);
    }
    if let Some(i) = samples.iter().position(|s| !s.is_finite()) {
        return Err(FeatureError::NonFiniteSample(i));
    }

    let pad = FRAME_LENGTH / 2;
    let mut padded = vec![0.0f32; samples.len() + 2 * pad];
    padded[pad..pad + samples.len()].copy_from_slice(samples);

    let sr = sample_rate as usize;
    let mut detector = McLeodDetector::new(FRAME_LENGTH, FRAME_LENGTH / 2);
    let pitches = padded
        .windows(FRAME_LENGTH)
        .step_by(HOP_LENGTH)
        .map(|frame| {
            detector
                .get_pitch(frame, sr, POWER_THRESHOLD, CLARITY_THRESHOLD)
                .map(|p| p.frequency)
                .filter(|f| f.is_finite() && (MIN_PITCH_HZ..=MAX_PITCH_HZ).contains(f))
        })
        .collect();
    Ok(pitches)
}

/// Mean of the voiced frame pitches, `0.0` when nothing was voiced.
pub fn mean_pitch(samples: &[f32], sample_rate: u32) -> Result<f32, FeatureError> {
    let voiced: Vec<f32> = frame_pitches(samples, sample_rate)?
        .into_iter()
        .flatten()
        .collect();
    if voiced.is_empty() {
        return Ok(0.0);
    }
    Ok(voiced.iter().sum::<f32>() / voiced.len() as f32)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::f32::consts::PI;

    pub(crate) fn sine(freq_hz: f32, amplitude: f32, sample_rate: u32, seconds: f32) -> Waveform {
        let n = (sample_rate as f32 * seconds) as usize;
        let samples = (0..n)
            .map(|i| amplitude * (2.0 * PI * freq_hz * i as f32 / sample_rate as f32).sin())
            .collect();
        Waveform::new(samples, sample_rate)
    }

    #[test]
    fn energy_is_mean_square() {
        let e = signal_energy(&[0.5, -0.5, 0.5, -0.5]).unwrap();
        assert!((e - 0.25).abs() < 1e-6);
    }

    #[test]
    fn energy_of_sine_is_half_amplitude_squared() {
        let wf = sine(220.0, 0.6, 16_000, 1.0);
        let e = signal_energy(&wf.samples).unwrap();
        assert!((e - 0.18).abs() < 1e-3, "energy {e}");
    }

    #[test]
    fn empty_signal_is_an_error() {
        assert_eq!(signal_energy(&[]), Err(FeatureError::EmptySignal));
        assert_eq!(mean_pitch(&[], 16_000), Err(FeatureError::EmptySignal));
    }

    #[test]
    fn zero_sample_rate_is_an_error() {
        assert_eq!(
            mean_pitch(&[0.1, 0.2], 0),
            Err(FeatureError::InvalidSampleRate)
        );
    }

    #[test]
    fn nan_sample_is_an_error() {
        assert_eq!(
            signal_energy(&[0.1, f32::NAN]),
            Err(FeatureError::NonFiniteSample(1))
        );
        assert_eq!(
            mean_pitch(&[f32::INFINITY], 16_000),
            Err(FeatureError::NonFiniteSample(0))
        );
    }

    #[test]
    fn silence_has_no_pitch() {
        let silent = vec![0.0f32; 16_000];
        assert_eq!(signal_energy(&silent).unwrap(), 0.0);
        assert_eq!(mean_pitch(&silent, 16_000).unwrap(), 0.0);
    }

    #[test]
    fn short_clip_still_yields_a_frame() {
        let frames = frame_pitches(&[0.0; 10], 16_000).unwrap();
        assert_eq!(frames.len(), 1);
    }

    #[test]
    fn sine_pitch_is_recovered() {
        let wf = sine(220.0, 0.5, 16_000, 1.0);
        let p = mean_pitch(&wf.samples, wf.sample_rate).unwrap();
        assert!((p - 220.0).abs() < 220.0 * 0.1, "pitch {p}");
    }

    #[test]
    fn low_sine_pitch_is_recovered() {
        let wf = sine(100.0, 0.5, 16_000, 1.0);
        let p = mean_pitch(&wf.samples, wf.sample_rate).unwrap();
        assert!((p - 100.0).abs() < 100.0 * 0.1, "pitch {p}");
    }

    #[test]
    fn quiet_sine_pitch_is_recovered() {
        for amplitude in [0.05, 0.02, 0.01, 0.005] {
            let wf = sine(100.0, amplitude, 16_000, 1.0);
            let p = mean_pitch(&wf.samples, wf.sample_rate).unwrap();
            assert!((p - 100.0).abs() < 100.0 * 0.1, "amplitude {amplitude}: pitch {p}");
        }
    }

    #[test]
    fn near_silent_frames_are_unvoiced() {
        let mut samples = vec![0.0f32; 16_000];
        samples[8_000] = 1e-6;
        assert_eq!(mean_pitch(&samples, 16_000).unwrap(), 0.0);
    }

    #[test]
    fn extract_features_combines_both() {
        let wf = sine(300.0, 0.2, 22_050, 0.5);
        let f = extract_features(&wf).unwrap();
        assert!((f.energy - 0.02).abs() < 1e-3);
        assert!((f.mean_pitch - 300.0).abs() < 30.0, "pitch {}", f.mean_pitch);
    }
}
