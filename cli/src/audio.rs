use base64::{engine::general_purpose::STANDARD as Base64, Engine as _};
use rodio::{buffer::SamplesBuffer, OutputStream, Sink};
use tracing::debug;

use crate::error::{FlowError, FlowResult};

/// Sample rate of the synthesis transport format.
pub const SPEECH_SAMPLE_RATE: u32 = 24_000;
pub const SPEECH_CHANNELS: u16 = 1;

const PCM16_SCALE: f32 = 32_768.0;

/// Decoded audio, one sample vector per channel, normalised to [-1.0, 1.0).
#[derive(Debug, Clone, PartialEq)]
pub struct PcmBuffer {
    sample_rate: u32,
    channels: Vec<Vec<f32>>,
}

impl PcmBuffer {
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channel_count(&self) -> u16 {
        self.channels.len() as u16
    }

    pub fn frame_count(&self) -> usize {
        self.channels.first().map(Vec::len).unwrap_or(0)
    }

    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.channels.get(index).map(Vec::as_slice)
    }

    pub fn interleaved(&self) -> Vec<f32> {
        let mut samples = Vec::with_capacity(self.frame_count() * self.channels.len());
        for frame in 0..self.frame_count() {
            for channel in &self.channels {
                samples.push(channel[frame]);
            }
        }
        samples
    }
}

/// base64 text → little-endian i16 samples → planar f32 channels.
pub fn decode_pcm16(encoded: &str, sample_rate: u32, channels: u16) -> FlowResult<PcmBuffer> {
    if channels == 0 {
        return Err(FlowError::PlaybackFailure("channel count must be positive".into()));
    }
    let bytes = Base64
        .decode(encoded.trim())
        .map_err(|err| FlowError::PlaybackFailure(format!("audio payload is not base64: {err}")))?;
    if bytes.len() % 2 != 0 {
        return Err(FlowError::PlaybackFailure(format!(
            "PCM16 payload has an odd byte count ({})",
            bytes.len()
        )));
    }

    let samples: Vec<i16> =
        bytes.chunks_exact(2).map(|pair| i16::from_le_bytes([pair[0], pair[1]])).collect();
    let channel_count = channels as usize;
    if samples.len() % channel_count != 0 {
        return Err(FlowError::PlaybackFailure(format!(
            "{} samples do not divide into {channel_count} channels",
            samples.len()
        )));
    }

    let frames = samples.len() / channel_count;
    let mut planar = vec![Vec::with_capacity(frames); channel_count];
    for frame in samples.chunks_exact(channel_count) {
        for (channel, sample) in planar.iter_mut().zip(frame) {
            channel.push(*sample as f32 / PCM16_SCALE);
        }
    }
    debug!(frames, sample_rate, channels, "decoded PCM16 payload");

    Ok(PcmBuffer { sample_rate, channels: planar })
}

/// Host audio sink. `play_to_end` blocks until playback finishes and must not
/// hold the device after it returns.
pub trait AudioOutput: Send + Sync {
    fn play_to_end(&self, buffer: &PcmBuffer) -> FlowResult<()>;
}

/// Default output device via rodio. The stream is opened per playback and
/// dropped on return, whether playback finished or failed.
#[derive(Debug, Default)]
pub struct RodioOutput;

impl AudioOutput for RodioOutput {
    fn play_to_end(&self, buffer: &PcmBuffer) -> FlowResult<()> {
        let (_stream, handle) = OutputStream::try_default().map_err(|err| {
            FlowError::PlaybackFailure(format!("failed to open audio output: {err}"))
        })?;
        let sink = Sink::try_new(&handle).map_err(|err| {
            FlowError::PlaybackFailure(format!("failed to create audio sink: {err}"))
        })?;
        sink.append(SamplesBuffer::new(
            buffer.channel_count(),
            buffer.sample_rate(),
            buffer.interleaved(),
        ));
        sink.play();
        sink.sleep_until_end();
        Ok(())
    }
}
