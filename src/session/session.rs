use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::captured::{CapturedAudio, Segment};
use super::error::CaptureError;
use super::stats::{CaptureState, SessionStats};
use crate::audio::{CapturePlatform, CaptureStream, Encoder, EncoderEvent, EncoderOptions};

type SegmentCallback = Box<dyn FnMut(&Segment) + Send>;

/// Device and encoder owned while recording. Both exist or neither does.
struct ActiveCapture {
    device: Box<dyn CaptureStream>,
    encoder: Box<dyn Encoder>,
    pump: JoinHandle<()>,
    /// The encoder has confirmed that capture fully ceased
    flushed: bool,
    /// Pending stop waiting for the flush confirmation
    flush_tx: Option<oneshot::Sender<()>>,
}

impl ActiveCapture {
    /// Halt the encoder and stop every track. Safe to repeat.
    fn halt(&mut self) {
        self.encoder.stop();
        self.device.stop_tracks();
    }
}

struct Inner {
    state: CaptureState,
    /// Bumped on every start and cancel; stale tasks compare against it
    lifecycle: u64,
    lifecycle_id: Option<Uuid>,
    active: Option<ActiveCapture>,
    segments: Vec<Segment>,
    mime_type: Option<String>,
    started_at: Option<DateTime<Utc>>,
}

impl Inner {
    fn new() -> Self {
        Self {
            state: CaptureState::Idle,
            lifecycle: 0,
            lifecycle_id: None,
            active: None,
            segments: Vec::new(),
            mime_type: None,
            started_at: None,
        }
    }

    fn reset(&mut self) {
        self.active = None;
        self.segments.clear();
        self.mime_type = None;
        self.started_at = None;
        self.lifecycle_id = None;
        self.state = CaptureState::Idle;
    }

    /// Record a failed start and make the session reusable
    fn fail(&mut self) {
        self.state = CaptureState::Failed;
        info!("Capture lifecycle failed, resetting to idle");
        self.reset();
    }
}

fn lock(inner: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A single microphone capture lifecycle at a time
///
/// `start` acquires the microphone and binds an encoder, every encoded
/// chunk is appended to the session and passed to the caller's callback,
/// `stop` waits for the encoder to flush and returns the concatenated
/// audio, and `cancel` releases everything without producing a result.
pub struct CaptureSession {
    platform: Arc<dyn CapturePlatform>,
    inner: Arc<Mutex<Inner>>,
}

impl CaptureSession {
    pub fn new(platform: Arc<dyn CapturePlatform>) -> Self {
        Self {
            platform,
            inner: Arc::new(Mutex::new(Inner::new())),
        }
    }

    /// Start capturing with default encoder options
    pub async fn start<F>(&self, on_segment: F) -> Result<(), CaptureError>
    where
        F: FnMut(&Segment) + Send + 'static,
    {
        self.start_with(EncoderOptions::default(), on_segment).await
    }

    /// Start capturing
    ///
    /// `on_segment` is invoked once per encoded chunk, in arrival order.
    /// No chunk is delivered before this returns `Ok`.
    pub async fn start_with<F>(
        &self,
        options: EncoderOptions,
        on_segment: F,
    ) -> Result<(), CaptureError>
    where
        F: FnMut(&Segment) + Send + 'static,
    {
        let lifecycle = {
            let mut inner = lock(&self.inner);
            if inner.state != CaptureState::Idle {
                warn!("Start rejected: session is {}", inner.state);
                return Err(CaptureError::InvalidTransition {
                    operation: "start",
                    state: inner.state,
                });
            }

            if !self.platform.supports_capture() {
                warn!("Platform {} cannot capture audio", self.platform.name());
                return Err(CaptureError::UnsupportedPlatform {
                    platform: self.platform.name().to_string(),
                });
            }

            let id = Uuid::new_v4();
            inner.lifecycle += 1;
            inner.lifecycle_id = Some(id);
            inner.state = CaptureState::Acquiring;
            info!("Acquiring microphone via {} ({})", self.platform.name(), id);
            inner.lifecycle
        };

        let acquired = self.platform.acquire_microphone().await;

        let mut guard = lock(&self.inner);
        let inner = &mut *guard;

        if inner.lifecycle != lifecycle || inner.state != CaptureState::Acquiring {
            if let Ok(mut stream) = acquired {
                stream.stop_tracks();
            }
            info!("Start overtaken by cancel, late stream released");
            return Err(CaptureError::Cancelled);
        }

        let mut stream = match acquired {
            Ok(stream) => stream,
            Err(e) => {
                error!("Device acquisition failed: {:#}", e);
                inner.fail();
                return Err(CaptureError::acquisition(e));
            }
        };

        let mut encoder = match self.platform.bind_encoder(stream.as_mut(), &options) {
            Ok(encoder) => encoder,
            Err(e) => {
                error!("Encoder binding failed: {:#}", e);
                stream.stop_tracks();
                inner.fail();
                return Err(CaptureError::encoder(e));
            }
        };

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        if let Err(e) = encoder.start(events_tx) {
            error!("Encoder failed to start: {:#}", e);
            encoder.stop();
            stream.stop_tracks();
            inner.fail();
            return Err(CaptureError::encoder(e));
        }

        let mime_type = encoder.mime_type().to_string();
        info!("Recording from {} as {}", stream.label(), mime_type);

        let (armed_tx, armed_rx) = oneshot::channel();
        let pump = tokio::spawn(deliver_segments(
            Arc::clone(&self.inner),
            lifecycle,
            events_rx,
            armed_rx,
            Box::new(on_segment),
        ));

        inner.segments.clear();
        inner.mime_type = Some(mime_type);
        inner.started_at = Some(Utc::now());
        inner.active = Some(ActiveCapture {
            device: stream,
            encoder,
            pump,
            flushed: false,
            flush_tx: None,
        });
        inner.state = CaptureState::Recording;
        drop(guard);

        let _ = armed_tx.send(());
        Ok(())
    }

    /// Stop capturing and return everything captured in this lifecycle
    ///
    /// Resolves only after the encoder confirms that capture has ceased,
    /// so every chunk produced before the halt is included. Dropping the
    /// returned future before it resolves (e.g. on a caller timeout)
    /// cancels the lifecycle, so the session is idle again.
    pub async fn stop(&self) -> Result<CapturedAudio, CaptureError> {
        let (flush_rx, lifecycle) = {
            let mut guard = lock(&self.inner);
            let inner = &mut *guard;

            let (CaptureState::Recording, Some(active)) = (inner.state, inner.active.as_mut())
            else {
                warn!("Stop rejected: session is {}", inner.state);
                return Err(CaptureError::InvalidTransition {
                    operation: "stop",
                    state: inner.state,
                });
            };

            active.halt();
            let (flush_tx, flush_rx) = oneshot::channel();
            if active.flushed {
                let _ = flush_tx.send(());
            } else {
                active.flush_tx = Some(flush_tx);
            }

            inner.state = CaptureState::Stopping;
            info!("Stopping capture, waiting for encoder flush");
            (flush_rx, inner.lifecycle)
        };

        let mut abandoned = CancelOnDrop {
            session: self,
            lifecycle: Some(lifecycle),
        };
        let flushed = flush_rx.await;
        abandoned.lifecycle = None;

        if flushed.is_err() {
            info!("Stop overtaken by cancel");
            return Err(CaptureError::Cancelled);
        }

        let mut guard = lock(&self.inner);
        let inner = &mut *guard;
        if inner.lifecycle != lifecycle || inner.state != CaptureState::Stopping {
            return Err(CaptureError::Cancelled);
        }

        if let Some(mut active) = inner.active.take() {
            active.halt();
        }

        let mime_type = inner.mime_type.take().unwrap_or_default();
        let audio = CapturedAudio::assemble(&inner.segments, mime_type);
        inner.state = CaptureState::Stopped;
        info!(
            "Capture complete: {} segments, {} bytes ({})",
            audio.segment_count(),
            audio.size(),
            audio.mime_type()
        );
        inner.reset();

        Ok(audio)
    }

    /// Abandon the current lifecycle, releasing the device and dropping
    /// every captured segment. A no-op when idle.
    pub fn cancel(&self) {
        self.cancel_lifecycle(None);
    }

    /// Cancel, restricted to `lifecycle` when given
    fn cancel_lifecycle(&self, lifecycle: Option<u64>) {
        let mut guard = lock(&self.inner);
        let inner = &mut *guard;

        if !inner.state.is_active() {
            debug!("Cancel ignored: session is {}", inner.state);
            return;
        }
        if lifecycle.is_some_and(|lifecycle| lifecycle != inner.lifecycle) {
            return;
        }

        let previous = inner.state;
        inner.lifecycle += 1;
        if let Some(mut active) = inner.active.take() {
            active.halt();
            active.pump.abort();
        }

        let discarded = inner.segments.len();
        inner.reset();
        info!(
            "Capture cancelled while {} ({} segments discarded)",
            previous, discarded
        );
    }

    pub fn state(&self) -> CaptureState {
        lock(&self.inner).state
    }

    /// Format negotiated with the encoder for the current lifecycle
    pub fn mime_type(&self) -> Option<String> {
        lock(&self.inner).mime_type.clone()
    }

    pub fn segment_count(&self) -> usize {
        lock(&self.inner).segments.len()
    }

    /// Whether a device and encoder are currently held
    pub fn holds_device(&self) -> bool {
        lock(&self.inner).active.is_some()
    }

    pub fn platform_name(&self) -> &str {
        self.platform.name()
    }

    pub fn stats(&self) -> SessionStats {
        let inner = lock(&self.inner);
        SessionStats {
            state: inner.state,
            lifecycle_id: inner.lifecycle_id,
            started_at: inner.started_at,
            mime_type: inner.mime_type.clone(),
            segments_count: inner.segments.len(),
            bytes_captured: inner.segments.iter().map(Segment::size).sum(),
        }
    }
}

/// Cancels an abandoned stop so the session does not stay in `Stopping`
struct CancelOnDrop<'a> {
    session: &'a CaptureSession,
    lifecycle: Option<u64>,
}

impl Drop for CancelOnDrop<'_> {
    fn drop(&mut self) {
        if let Some(lifecycle) = self.lifecycle {
            warn!("Stop abandoned before the encoder flushed, cancelling capture");
            self.session.cancel_lifecycle(Some(lifecycle));
        }
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Move encoder output into the session, in production order
async fn deliver_segments(
    inner: Arc<Mutex<Inner>>,
    lifecycle: u64,
    mut events: mpsc::UnboundedReceiver<EncoderEvent>,
    armed: oneshot::Receiver<()>,
    mut on_segment: SegmentCallback,
) {
    if armed.await.is_err() {
        return;
    }

    // Fires the flush confirmation however the pump ends, including a
    // panicking callback
    let mut flush = ConfirmFlush {
        inner: Arc::clone(&inner),
        lifecycle,
        completed: false,
    };

    while let Some(event) = events.recv().await {
        let segment = match event {
            EncoderEvent::Data(data) => Segment::new(data),
            EncoderEvent::Stopped => break,
        };

        {
            let mut inner = lock(&inner);
            let capturing = matches!(
                inner.state,
                CaptureState::Recording | CaptureState::Stopping
            );
            if inner.lifecycle != lifecycle || !capturing {
                return;
            }
            inner.segments.push(segment.clone());
            debug!(
                "Segment {} captured ({} bytes)",
                inner.segments.len(),
                segment.size()
            );
        }

        // A cancel may have landed after the append; a callback that is
        // already running when cancel is called is allowed to finish
        if lock(&inner).lifecycle != lifecycle {
            return;
        }
        on_segment(&segment);
    }

    flush.completed = true;
}

/// Marks the capture as flushed when the segment pump ends
///
/// After `Stopped` or the encoder going away nothing further can arrive.
/// A pump that died in the callback is treated the same way, so a
/// pending stop still resolves with what was captured.
struct ConfirmFlush {
    inner: Arc<Mutex<Inner>>,
    lifecycle: u64,
    /// The encoder event stream ended normally
    completed: bool,
}

impl Drop for ConfirmFlush {
    fn drop(&mut self) {
        let mut inner = lock(&self.inner);
        if inner.lifecycle != self.lifecycle {
            return;
        }

        if !self.completed {
            warn!("Segment delivery ended early, no further segments are captured");
        }
        if let Some(active) = inner.active.as_mut() {
            active.flushed = true;
            if let Some(flush_tx) = active.flush_tx.take() {
                let _ = flush_tx.send(());
            }
        }
        debug!("Encoder flushed");
    }
}
