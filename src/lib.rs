pub mod assistant;
pub mod audio;
pub mod config;
pub mod playback;
pub mod session;

pub use assistant::{Assistant, AssistantConfig, CommandHandler, Recognition, Recognizer, Speaker};
pub use audio::{
    AudioFile, AudioFrame, CaptureConfig, CapturePlatform, CaptureStream, Encoder, EncoderEvent,
    EncoderOptions, FilePlatform, PcmEncoder,
};
pub use config::Config;
pub use playback::{AudioSink, DecodedAudio, WavFileSink};
#[cfg(feature = "speaker")]
pub use playback::DeviceSink;
pub use session::{
    CaptureError, CaptureSession, CaptureState, CapturedAudio, Segment, SessionStats,
};
