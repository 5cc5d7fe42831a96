use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::path::Path;
use std::time::Duration;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

const LOG_TARGET: &str = "decode";

/// Decoded mono audio at its native sample rate.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Waveform {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl Waveform {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::from_secs(0);
        }
        let micros =
            (self.samples.len() as u128 * 1_000_000u128) / u128::from(self.sample_rate);
        Duration::from_micros(micros.min(u128::from(u64::MAX)) as u64)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum DecodeError {
    #[error("failed to read audio: {0}")]
    Io(#[from] std::io::Error),

    #[error("unsupported or unreadable audio container: {0}")]
    Unsupported(String),

    #[error("no decodable audio track found")]
    NoAudioTrack,

    #[error("audio track has no sample rate")]
    MissingSampleRate,

    #[error("codec failed: {0}")]
    Codec(String),
}

pub type Result<T> = std::result::Result<T, DecodeError>;

/// Decodes an in-memory recording. `extension` (e.g. `"wav"`) is only a
/// probing hint; the container is detected from its contents.
pub fn decode_bytes(audio: Bytes, extension: Option<&str>) -> Result<Waveform> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(audio)), Default::default());
    let mut hint = Hint::new();
    if let Some(ext) = extension {
        hint.with_extension(ext);
    }
    decode_stream(mss, &hint)
}

pub fn decode_file<P: AsRef<Path>>(path: P) -> Result<Waveform> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());
    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }
    decode_stream(mss, &hint)
}

fn decode_stream(mss: MediaSourceStream, hint: &Hint) -> Result<Waveform> {
    let probed = symphonia::default::get_probe()
        .format(
            hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| DecodeError::Unsupported(e.to_string()))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or(DecodeError::NoAudioTrack)?;
    let track_id = track.id;
    let mut sample_rate = track.codec_params.sample_rate;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| DecodeError::Codec(e.to_string()))?;

    let mut samples = Vec::new();
    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(DecodeError::Codec(e.to_string())),
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                sample_rate.get_or_insert(spec.rate);
                let channels = spec.channels.count().max(1);
                let mut buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                buf.copy_interleaved_ref(decoded);
                downmix_into(&mut samples, buf.samples(), channels);
            }
            Err(SymphoniaError::DecodeError(e)) => {
                tracing::debug!(target: LOG_TARGET, error = %e, "skipping corrupt packet");
            }
            Err(SymphoniaError::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break
            }
            Err(e) => return Err(DecodeError::Codec(e.to_string())),
        }
    }

    let sample_rate = sample_rate.ok_or(DecodeError::MissingSampleRate)?;
    tracing::debug!(
        target: LOG_TARGET,
        samples = samples.len(),
        sample_rate,
        "decoded audio"
    );
    Ok(Waveform::new(samples, sample_rate))
}

/// Averages interleaved frames down to one channel.
fn downmix_into(out: &mut Vec<f32>, interleaved: &[f32], channels: usize) {
    if channels == 1 {
        out.extend_from_slice(interleaved);
        return;
    }
    let scale = 1.0 / channels as f32;
    out.extend(
        interleaved
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() * scale),
    );
}
