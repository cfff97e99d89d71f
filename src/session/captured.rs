use base64::Engine;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

use crate::audio::mime;

/// One encoded chunk of audio, immutable once captured
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    data: Arc<[u8]>,
    received_at: DateTime<Utc>,
}

impl Segment {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data: data.into(),
            received_at: Utc::now(),
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// When the encoder delivered this segment
    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }
}

/// Result of a completed capture: every segment in arrival order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedAudio {
    data: Vec<u8>,
    mime_type: String,
    segment_count: usize,
}

impl CapturedAudio {
    /// Wrap bytes that were not produced by a capture session
    pub fn new(data: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            data,
            mime_type: mime_type.into(),
            segment_count: 1,
        }
    }

    pub(crate) fn assemble(segments: &[Segment], mime_type: String) -> Self {
        let mut data = Vec::with_capacity(segments.iter().map(Segment::size).sum());
        for segment in segments {
            data.extend_from_slice(segment.data());
        }

        Self {
            data,
            mime_type,
            segment_count: segments.len(),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Format tag, including any parameters
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Format tag without parameters (e.g. `audio/webm` for `audio/webm;codecs=opus`)
    pub fn essence(&self) -> &str {
        mime::essence(&self.mime_type)
    }

    /// Number of segments that were concatenated
    pub fn segment_count(&self) -> usize {
        self.segment_count
    }

    /// Playback length, known only for raw PCM
    pub fn duration(&self) -> Option<Duration> {
        let (rate, channels) = mime::pcm_params(&self.mime_type)?;
        let bytes_per_second = u64::from(rate) * u64::from(channels) * 2;
        if bytes_per_second == 0 {
            return None;
        }
        Some(Duration::from_micros(
            self.data.len() as u64 * 1_000_000 / bytes_per_second,
        ))
    }

    /// Render as a `data:` URL
    pub fn to_data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.mime_type,
            base64::engine::general_purpose::STANDARD.encode(&self.data)
        )
    }
}
