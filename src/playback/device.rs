// Playback through the default cpal output device
//
// Each clip opens the default output, plays to completion and releases
// the stream, so nothing non-Send is held between clips.

use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, SampleRate, SupportedStreamConfigRange};
use std::sync::mpsc as std_mpsc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::decode::DecodedAudio;
use super::sink::AudioSink;

/// Grace period on top of the clip length before giving up on the device
const DRAIN_GRACE: Duration = Duration::from_millis(500);

/// Sink that plays through the host's default audio output
#[derive(Debug)]
pub struct DeviceSink;

impl DeviceSink {
    pub fn new() -> Result<Self> {
        let device = cpal::default_host()
            .default_output_device()
            .context("No output device available")?;
        info!(
            "Audio output: {}",
            device.name().unwrap_or_else(|_| "default output".to_string())
        );
        Ok(Self)
    }
}

fn supports(range: &SupportedStreamConfigRange, rate: u32) -> bool {
    range.sample_format() == SampleFormat::F32
        && range.min_sample_rate() <= SampleRate(rate)
        && range.max_sample_rate() >= SampleRate(rate)
}

impl AudioSink for DeviceSink {
    fn play(&mut self, audio: &DecodedAudio) -> Result<()> {
        if audio.samples.is_empty() {
            return Ok(());
        }

        let device = cpal::default_host()
            .default_output_device()
            .context("No output device available")?;

        // Prefer the clip's own layout, fall back to any layout at its rate
        let ranges: Vec<_> = device
            .supported_output_configs()
            .context("Failed to query output device configurations")?
            .filter(|range| supports(range, audio.sample_rate))
            .collect();
        let range = ranges
            .iter()
            .find(|range| range.channels() == audio.channels)
            .or_else(|| ranges.first())
            .cloned()
            .with_context(|| {
                format!("Output device cannot play {}Hz audio", audio.sample_rate)
            })?;

        let config = range.with_sample_rate(SampleRate(audio.sample_rate)).config();
        let samples = audio.to_f32_interleaved(config.channels);
        let total = samples.len();

        let (done_tx, done_rx) = std_mpsc::sync_channel(1);
        let mut position = 0;

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    for out in data.iter_mut() {
                        *out = samples.get(position).copied().unwrap_or(0.0);
                        position += 1;
                    }
                    if position >= total {
                        let _ = done_tx.try_send(());
                    }
                },
                |err: cpal::StreamError| error!("Audio output error: {}", err),
                None,
            )
            .context("Failed to open output stream")?;

        stream.play().context("Failed to start output stream")?;

        let clip = Duration::from_secs_f64(audio.duration_seconds());
        if done_rx.recv_timeout(clip + DRAIN_GRACE).is_err() {
            warn!("Output device did not drain within {:?}", clip + DRAIN_GRACE);
        }
        drop(stream);

        debug!(
            "Played {:.1}s clip ({} channels) to the default output",
            audio.duration_seconds(),
            config.channels
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "device"
    }
}
