//! Microphone capture session
//!
//! This module provides the `CaptureSession` abstraction that manages:
//! - Microphone acquisition through a `CapturePlatform`
//! - Encoder binding and ordered segment delivery
//! - Flush-then-assemble on stop, immediate release on cancel
//! - Lifecycle state and statistics

mod captured;
mod error;
mod session;
mod stats;

pub use captured::{CapturedAudio, Segment};
pub use error::CaptureError;
pub use session::CaptureSession;
pub use stats::{CaptureState, SessionStats};
