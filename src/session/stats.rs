use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Lifecycle state of a capture session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureState {
    Idle,
    Acquiring,
    Recording,
    Stopping,
    Stopped,
    Failed,
}

impl CaptureState {
    /// States in which a device may be held and cancel has work to do
    pub fn is_active(self) -> bool {
        matches!(self, Self::Acquiring | Self::Recording | Self::Stopping)
    }
}

impl fmt::Display for CaptureState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Acquiring => "acquiring",
            Self::Recording => "recording",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Snapshot of a capture session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    /// Current state
    pub state: CaptureState,

    /// ID of the current lifecycle, if one is active
    pub lifecycle_id: Option<Uuid>,

    /// When recording began
    pub started_at: Option<DateTime<Utc>>,

    /// Negotiated encoder format
    pub mime_type: Option<String>,

    /// Number of segments captured so far
    pub segments_count: usize,

    /// Total size of captured segments in bytes
    pub bytes_captured: usize,
}
