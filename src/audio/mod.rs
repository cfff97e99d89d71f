pub mod backend;
pub mod convert;
pub mod file;
pub mod mime;
pub mod pcm;

#[cfg(feature = "microphone")]
pub mod microphone;

pub use backend::{
    AudioFrame, CaptureConfig, CapturePlatform, CaptureStream, Encoder, EncoderEvent,
    EncoderOptions,
};
pub use file::{AudioFile, FilePlatform};
pub use pcm::PcmEncoder;

#[cfg(feature = "microphone")]
pub use microphone::MicrophonePlatform;
