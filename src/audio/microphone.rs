// Microphone capture via cpal
//
// cpal streams are not Send on every platform, so each acquired stream is
// owned by a dedicated thread that builds it, plays it, and drops it when
// the halt signal arrives.

use anyhow::{bail, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, Stream};
use std::sync::mpsc as std_mpsc;
use std::time::Instant;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use super::backend::{AudioFrame, CaptureConfig, CapturePlatform, CaptureStream};
use super::convert::convert_frame;

/// Capture platform backed by the default cpal input device
pub struct MicrophonePlatform {
    config: CaptureConfig,
}

impl MicrophonePlatform {
    pub fn new(config: CaptureConfig) -> Self {
        Self { config }
    }
}

#[async_trait::async_trait]
impl CapturePlatform for MicrophonePlatform {
    fn supports_capture(&self) -> bool {
        cpal::default_host().default_input_device().is_some()
    }

    async fn acquire_microphone(&self) -> Result<Box<dyn CaptureStream>> {
        let (ready_tx, ready_rx) = oneshot::channel();
        let (halt_tx, halt_rx) = std_mpsc::channel();
        let (frame_tx, frame_rx) = mpsc::channel(100);
        let config = self.config.clone();

        std::thread::Builder::new()
            .name("voicekit-microphone".to_string())
            .spawn(move || run_device(config, frame_tx, ready_tx, halt_rx))
            .context("Failed to spawn capture thread")?;

        let device = ready_rx.await.context("Capture thread exited early")??;

        info!(
            "Microphone acquired: {} ({}Hz, {} channels)",
            device.label, device.sample_rate, device.channels
        );

        Ok(Box::new(MicrophoneStream {
            label: device.label,
            frames: Some(frame_rx),
            sample_rate: device.sample_rate,
            channels: device.channels,
            halt_tx: Some(halt_tx),
        }))
    }

    fn name(&self) -> &str {
        "microphone"
    }
}

struct OpenedDevice {
    label: String,
    sample_rate: u32,
    channels: u16,
}

fn run_device(
    config: CaptureConfig,
    frame_tx: mpsc::Sender<AudioFrame>,
    ready_tx: oneshot::Sender<Result<OpenedDevice>>,
    halt_rx: std_mpsc::Receiver<()>,
) {
    let (stream, device) = match open_stream(&config, frame_tx) {
        Ok(opened) => opened,
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
        }
    };

    if ready_tx.send(Ok(device)).is_err() {
        return;
    }

    // Either an explicit halt or the handle being dropped ends capture
    let _ = halt_rx.recv();
    drop(stream);
    debug!("Microphone stream released");
}

fn open_stream(
    config: &CaptureConfig,
    frame_tx: mpsc::Sender<AudioFrame>,
) -> Result<(Stream, OpenedDevice)> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .context("No input device available")?;
    let label = device.name().unwrap_or_else(|_| "default input".to_string());

    let supported = device
        .default_input_config()
        .context("Failed to query input device configuration")?;
    let sample_format = supported.sample_format();
    let stream_config = supported.config();
    let source_rate = stream_config.sample_rate.0;
    let source_channels = stream_config.channels;

    let target_rate = config.target_sample_rate;
    let target_channels = config.target_channels;
    let started = Instant::now();

    let deliver = move |samples: Vec<i16>| {
        let frame = convert_frame(
            AudioFrame {
                samples,
                sample_rate: source_rate,
                channels: source_channels,
                timestamp_ms: started.elapsed().as_millis() as u64,
            },
            target_rate,
            target_channels,
        );
        if frame_tx.try_send(frame).is_err() {
            warn!("Microphone frame dropped: encoder is not keeping up");
        }
    };

    let on_error = |err: cpal::StreamError| error!("Microphone stream error: {}", err);

    let stream = match sample_format {
        SampleFormat::F32 => device.build_input_stream(
            &stream_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                deliver(
                    data.iter()
                        .map(|s| (s * 32767.0).clamp(-32768.0, 32767.0) as i16)
                        .collect(),
                );
            },
            on_error,
            None,
        ),
        SampleFormat::I16 => device.build_input_stream(
            &stream_config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| deliver(data.to_vec()),
            on_error,
            None,
        ),
        other => bail!("Unsupported microphone sample format: {other:?}"),
    }
    .context("Failed to open microphone stream")?;

    stream.play().context("Failed to start microphone stream")?;

    // Format of the frames after conversion
    let probe = convert_frame(
        AudioFrame {
            samples: Vec::new(),
            sample_rate: source_rate,
            channels: source_channels,
            timestamp_ms: 0,
        },
        target_rate,
        target_channels,
    );

    Ok((
        stream,
        OpenedDevice {
            label,
            sample_rate: probe.sample_rate,
            channels: probe.channels,
        },
    ))
}

struct MicrophoneStream {
    label: String,
    frames: Option<mpsc::Receiver<AudioFrame>>,
    sample_rate: u32,
    channels: u16,
    halt_tx: Option<std_mpsc::Sender<()>>,
}

impl CaptureStream for MicrophoneStream {
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
        if let Some(halt_tx) = self.halt_tx.take() {
            let _ = halt_tx.send(());
            debug!("Microphone halt requested: {}", self.label);
        }
    }

    fn is_live(&self) -> bool {
        self.halt_tx.is_some()
    }

    fn label(&self) -> &str {
        &self.label
    }
}

impl Drop for MicrophoneStream {
    fn drop(&mut self) {
        self.stop_tracks();
    }
}
