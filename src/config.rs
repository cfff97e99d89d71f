use anyhow::Result;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::assistant::AssistantConfig;
use crate::audio::{CaptureConfig, EncoderOptions};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub audio: AudioConfig,
    pub assistant: AssistantConfig,
    pub playback: PlaybackConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub channels: u16,
    pub frame_ms: u64,
    /// Chunk length; 0 delivers a single segment when capture stops
    pub timeslice_ms: u64,
    /// Pace file sources like a live device
    pub realtime: bool,
    /// Preferred encoder format
    pub mime_type: Option<String>,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            channels: 1,
            frame_ms: 100,
            timeslice_ms: 250,
            realtime: true,
            mime_type: None,
        }
    }
}

impl AudioConfig {
    pub fn capture_config(&self) -> CaptureConfig {
        CaptureConfig {
            target_sample_rate: self.sample_rate,
            target_channels: self.channels,
            frame_duration_ms: self.frame_ms,
        }
    }

    pub fn encoder_options(&self) -> EncoderOptions {
        EncoderOptions {
            mime_type: self.mime_type.clone(),
            timeslice: (self.timeslice_ms > 0).then(|| Duration::from_millis(self.timeslice_ms)),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    pub output_dir: String,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            output_dir: "recordings".to_string(),
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Load `path` if a matching file exists, otherwise use defaults
    pub fn load_or_default(path: &str) -> Result<Self> {
        let exists = ["toml", "yaml", "yml", "json"]
            .iter()
            .any(|ext| Path::new(&format!("{path}.{ext}")).exists())
            || Path::new(path).is_file();

        if exists {
            Self::load(path)
        } else {
            info!("No config found at {}, using defaults", path);
            Ok(Self::default())
        }
    }
}
