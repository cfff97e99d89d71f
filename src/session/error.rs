use thiserror::Error;

use super::stats::CaptureState;

/// Errors surfaced by [`CaptureSession`](super::CaptureSession) operations
#[derive(Debug, Error)]
pub enum CaptureError {
    /// The host exposes no microphone capture capability
    #[error("microphone capture is not supported by platform {platform}")]
    UnsupportedPlatform { platform: String },

    /// Permission denied, device busy, or driver error during start
    #[error("failed to acquire capture device: {source}")]
    DeviceAcquisitionFailed {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The encoder could not be bound to the stream or started
    #[error("failed to start encoder: {source}")]
    EncoderFailed {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Operation not allowed in the current state
    #[error("cannot {operation} while {state}")]
    InvalidTransition {
        operation: &'static str,
        state: CaptureState,
    },

    /// A pending start or stop was overtaken by cancel
    #[error("capture was cancelled")]
    Cancelled,
}

impl CaptureError {
    pub(crate) fn acquisition(source: anyhow::Error) -> Self {
        Self::DeviceAcquisitionFailed {
            source: source.into(),
        }
    }

    pub(crate) fn encoder(source: anyhow::Error) -> Self {
        Self::EncoderFailed {
            source: source.into(),
        }
    }
}
