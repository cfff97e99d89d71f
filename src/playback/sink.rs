use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use super::decode::DecodedAudio;

/// Destination for decoded audio
pub trait AudioSink: Send {
    /// Play one clip to completion
    fn play(&mut self, audio: &DecodedAudio) -> Result<()>;

    /// Sink name for logging
    fn name(&self) -> &str;
}

/// Sink that writes each clip to a numbered WAV file
pub struct WavFileSink {
    output_dir: PathBuf,
    prefix: String,
    next_index: usize,
    played: Vec<PathBuf>,
}

impl WavFileSink {
    pub fn new(output_dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Result<Self> {
        let output_dir = output_dir.into();
        fs::create_dir_all(&output_dir).context("Failed to create output directory")?;

        Ok(Self {
            output_dir,
            prefix: prefix.into(),
            next_index: 0,
            played: Vec::new(),
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Files written so far, in play order
    pub fn played(&self) -> &[PathBuf] {
        &self.played
    }
}

impl AudioSink for WavFileSink {
    fn play(&mut self, audio: &DecodedAudio) -> Result<()> {
        let path = self
            .output_dir
            .join(format!("{}-{:03}.wav", self.prefix, self.next_index));

        let spec = hound::WavSpec {
            channels: audio.channels,
            sample_rate: audio.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut writer = hound::WavWriter::create(&path, spec)
            .with_context(|| format!("Failed to create WAV file: {:?}", path))?;
        for &sample in &audio.samples {
            writer
                .write_sample(sample)
                .context("Failed to write sample to WAV")?;
        }
        writer.finalize().context("Failed to finalize WAV file")?;

        info!(
            "Played {:.1}s clip to {}",
            audio.duration_seconds(),
            path.display()
        );

        self.next_index += 1;
        self.played.push(path);
        Ok(())
    }

    fn name(&self) -> &str {
        "wav-file"
    }
}
