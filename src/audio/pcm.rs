// 16-bit PCM encoder
//
// Converts captured frames into little-endian PCM chunks. Chunks are cut
// by audio duration (sample count) rather than wall-clock time, so the
// same input always produces the same chunk boundaries.

use anyhow::{bail, Result};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use super::backend::{AudioFrame, Encoder, EncoderEvent, EncoderOptions};
use super::mime;

/// Encoder producing `audio/pcm;rate=..;channels=..` chunks
pub struct PcmEncoder {
    frames: Option<mpsc::Receiver<AudioFrame>>,
    mime_type: String,
    slice_bytes: Option<usize>,
    stop_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl PcmEncoder {
    pub fn new(
        frames: mpsc::Receiver<AudioFrame>,
        sample_rate: u32,
        channels: u16,
        options: &EncoderOptions,
    ) -> Result<Self> {
        if let Some(preferred) = &options.mime_type {
            if !mime::essence(preferred).eq_ignore_ascii_case(mime::PCM_ESSENCE) {
                bail!("Encoder does not support format {preferred}");
            }
        }
        if sample_rate == 0 || channels == 0 {
            bail!("Invalid stream format: {sample_rate}Hz, {channels} channels");
        }

        let slice_bytes = options.timeslice.map(|slice| {
            let frames = (u128::from(sample_rate) * slice.as_millis() / 1000).max(1);
            frames as usize * usize::from(channels) * 2
        });

        let mime_type = mime::pcm_mime(sample_rate, channels);
        debug!("PCM encoder bound: {} (slice: {:?} bytes)", mime_type, slice_bytes);

        Ok(Self {
            frames: Some(frames),
            mime_type,
            slice_bytes,
            stop_tx: None,
            task: None,
        })
    }
}

impl Encoder for PcmEncoder {
    fn mime_type(&self) -> &str {
        &self.mime_type
    }

    fn start(&mut self, events: mpsc::UnboundedSender<EncoderEvent>) -> Result<()> {
        let Some(frames) = self.frames.take() else {
            bail!("Encoder already started");
        };

        let (stop_tx, stop_rx) = oneshot::channel();
        self.stop_tx = Some(stop_tx);
        self.task = Some(tokio::spawn(encode(frames, stop_rx, events, self.slice_bytes)));

        Ok(())
    }

    fn stop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
    }
}

impl Drop for PcmEncoder {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn encode(
    mut frames: mpsc::Receiver<AudioFrame>,
    mut stop_rx: oneshot::Receiver<()>,
    events: mpsc::UnboundedSender<EncoderEvent>,
    slice_bytes: Option<usize>,
) {
    let mut pending = Vec::new();

    loop {
        tokio::select! {
            biased;
            _ = &mut stop_rx => {
                // Frames captured before the halt still belong to the recording
                while let Ok(frame) = frames.try_recv() {
                    push_frame(&mut pending, &frame, slice_bytes, &events);
                }
                break;
            }
            frame = frames.recv() => match frame {
                Some(frame) => push_frame(&mut pending, &frame, slice_bytes, &events),
                None => break,
            },
        }
    }

    if !pending.is_empty() {
        trace!("Flushing final PCM chunk ({} bytes)", pending.len());
        let _ = events.send(EncoderEvent::Data(pending));
    }
    let _ = events.send(EncoderEvent::Stopped);
}

fn push_frame(
    pending: &mut Vec<u8>,
    frame: &AudioFrame,
    slice_bytes: Option<usize>,
    events: &mpsc::UnboundedSender<EncoderEvent>,
) {
    pending.extend(frame.samples.iter().flat_map(|s| s.to_le_bytes()));

    if let Some(slice) = slice_bytes {
        while pending.len() >= slice {
            let rest = pending.split_off(slice);
            let chunk = std::mem::replace(pending, rest);
            trace!("PCM chunk ready ({} bytes)", chunk.len());
            let _ = events.send(EncoderEvent::Data(chunk));
        }
    }
}
