use anyhow::{Context, Result};
use hound::WavReader;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::backend::{AudioFrame, CaptureConfig, CapturePlatform, CaptureStream};
use super::convert::convert_frame;

pub struct AudioFile {
    pub path: String,
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<i16>,
}

impl AudioFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening audio file: {}", path.display());

        let reader = WavReader::open(path).context("Failed to open WAV file")?;

        let spec = reader.spec();
        let samples: Vec<i16> = reader
            .into_samples::<i16>()
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read audio samples")?;

        let duration_seconds =
            samples.len() as f64 / (spec.sample_rate as f64 * spec.channels as f64);

        info!(
            "Audio file loaded: {:.1}s, {}Hz, {} channels, {} samples",
            duration_seconds,
            spec.sample_rate,
            spec.channels,
            samples.len()
        );

        Ok(Self {
            path: path.display().to_string(),
            duration_seconds,
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            samples,
        })
    }
}

/// Capture platform that replays a WAV file as if it were a microphone
pub struct FilePlatform {
    path: PathBuf,
    config: CaptureConfig,
    realtime: bool,
}

impl FilePlatform {
    pub fn new(path: impl Into<PathBuf>, config: CaptureConfig) -> Self {
        Self {
            path: path.into(),
            config,
            realtime: true,
        }
    }

    /// Pace frames at the rate they would arrive from a device
    /// (default), or deliver them as fast as the encoder consumes them.
    pub fn realtime(mut self, realtime: bool) -> Self {
        self.realtime = realtime;
        self
    }
}

#[async_trait::async_trait]
impl CapturePlatform for FilePlatform {
    fn supports_capture(&self) -> bool {
        self.path.is_file()
    }

    async fn acquire_microphone(&self) -> Result<Box<dyn CaptureStream>> {
        let audio = AudioFile::open(&self.path)
            .with_context(|| format!("Failed to acquire file source {}", self.path.display()))?;
        let stream = FileStream::spawn(audio, &self.config, self.realtime);
        Ok(Box::new(stream))
    }

    fn name(&self) -> &str {
        "file"
    }
}

struct FileStream {
    label: String,
    frames: Option<mpsc::Receiver<AudioFrame>>,
    sample_rate: u32,
    channels: u16,
    task: Option<JoinHandle<()>>,
}

impl FileStream {
    fn spawn(audio: AudioFile, config: &CaptureConfig, realtime: bool) -> Self {
        let converted = convert_frame(
            AudioFrame {
                samples: audio.samples,
                sample_rate: audio.sample_rate,
                channels: audio.channels,
                timestamp_ms: 0,
            },
            config.target_sample_rate,
            config.target_channels,
        );

        let sample_rate = converted.sample_rate;
        let channels = converted.channels;
        let frame_ms = config.frame_duration_ms.max(1);
        let frame_len = (sample_rate as usize * frame_ms as usize / 1000 * usize::from(channels))
            .max(usize::from(channels.max(1)));

        let (tx, rx) = mpsc::channel(100);
        let samples = converted.samples;

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_millis(frame_ms));

            for (index, chunk) in samples.chunks(frame_len).enumerate() {
                if realtime {
                    ticker.tick().await;
                }

                let frame = AudioFrame {
                    samples: chunk.to_vec(),
                    sample_rate,
                    channels,
                    timestamp_ms: index as u64 * frame_ms,
                };
                if tx.send(frame).await.is_err() {
                    break;
                }
            }

            debug!("File source exhausted");
        });

        Self {
            label: audio.path,
            frames: Some(rx),
            sample_rate,
            channels,
            task: Some(task),
        }
    }
}

impl CaptureStream for FileStream {
    fn take_frames(&mut self) -> Option<mpsc::Receiver<AudioFrame>> {
        self.frames.take()
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn channels(&self) -> u16 {
        self.channels
    }

    fn stop_tracks(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            debug!("File source stopped: {}", self.label);
        }
    }

    fn is_live(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    fn label(&self) -> &str {
        &self.label
    }
}

impl Drop for FileStream {
    fn drop(&mut self) {
        self.stop_tracks();
    }
}
