use anyhow::{Context, Result};
use std::time::Duration;
use tokio::sync::mpsc;

use super::pcm::PcmEncoder;

/// Audio sample data (16-bit PCM, interleaved)
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Raw audio samples (i16 PCM, interleaved)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Timestamp in milliseconds since capture started
    pub timestamp_ms: u64,
}

impl AudioFrame {
    /// Duration covered by this frame
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 || self.channels == 0 {
            return Duration::ZERO;
        }
        let frames = self.samples.len() as u64 / u64::from(self.channels);
        Duration::from_micros(frames * 1_000_000 / u64::from(self.sample_rate))
    }
}

/// Configuration for a capture platform
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Target sample rate (will downsample if needed)
    pub target_sample_rate: u32,
    /// Target channel count (1 = mono, 2 = stereo)
    pub target_channels: u16,
    /// Frame size in milliseconds (affects latency)
    pub frame_duration_ms: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            target_sample_rate: 16000, // 16kHz for speech
            target_channels: 1,        // Mono
            frame_duration_ms: 100,    // 100ms frames
        }
    }
}

/// Options passed to the encoder when it is bound to a stream
#[derive(Debug, Clone)]
pub struct EncoderOptions {
    /// Preferred output format. `None` lets the encoder pick.
    pub mime_type: Option<String>,
    /// Emit a chunk every `timeslice` of audio. `None` emits a single
    /// chunk when the encoder halts.
    pub timeslice: Option<Duration>,
}

impl Default for EncoderOptions {
    fn default() -> Self {
        Self {
            mime_type: None,
            timeslice: Some(Duration::from_millis(250)),
        }
    }
}

/// Events pushed by an encoder, in production order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncoderEvent {
    /// One encoded chunk
    Data(Vec<u8>),
    /// Capture has fully ceased; no `Data` follows
    Stopped,
}

/// A live capture stream acquired from the host
pub trait CaptureStream: Send {
    /// Hand out the frame receiver. Returns `None` once an encoder has
    /// already taken it.
    fn take_frames(&mut self) -> Option<mpsc::Receiver<AudioFrame>>;

    /// Sample rate of the frames this stream produces
    fn sample_rate(&self) -> u32;

    /// Channel count of the frames this stream produces
    fn channels(&self) -> u16;

    /// Stop every track of the stream. Idempotent.
    fn stop_tracks(&mut self);

    /// Whether any track is still producing audio
    fn is_live(&self) -> bool;

    /// Device label for logging
    fn label(&self) -> &str;
}

/// Encoding pipeline bound to a capture stream
pub trait Encoder: Send {
    /// Negotiated output format
    fn mime_type(&self) -> &str;

    /// Begin encoding. Chunks and the final `Stopped` confirmation are
    /// pushed to `events`.
    fn start(&mut self, events: mpsc::UnboundedSender<EncoderEvent>) -> Result<()>;

    /// Request a halt. Everything buffered is pushed before `Stopped`.
    /// Idempotent.
    fn stop(&mut self);
}

/// Host capabilities consumed by the capture session
///
/// Implementations:
/// - File: replay a WAV file as a microphone (testing/demos)
/// - Microphone: default cpal input device (feature `microphone`)
#[async_trait::async_trait]
pub trait CapturePlatform: Send + Sync {
    /// Whether microphone capture is available at all
    fn supports_capture(&self) -> bool;

    /// Request an exclusive audio-only capture stream
    async fn acquire_microphone(&self) -> Result<Box<dyn CaptureStream>>;

    /// Bind an encoder to an acquired stream
    fn bind_encoder(
        &self,
        stream: &mut dyn CaptureStream,
        options: &EncoderOptions,
    ) -> Result<Box<dyn Encoder>> {
        let frames = stream
            .take_frames()
            .context("Capture stream is already bound to an encoder")?;
        let encoder = PcmEncoder::new(frames, stream.sample_rate(), stream.channels(), options)?;
        Ok(Box::new(encoder))
    }

    /// Platform name for logging
    fn name(&self) -> &str;
}
