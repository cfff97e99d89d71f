//! Playback of captured and assistant audio
//!
//! Picks a decoder from the format tag (parameters such as `;codecs=`
//! are ignored for container formats), decodes, and hands the samples to
//! an `AudioSink`.

mod decode;
#[cfg(feature = "speaker")]
mod device;
mod sink;

pub use decode::{decode, encode_wav, DecodedAudio};
#[cfg(feature = "speaker")]
pub use device::DeviceSink;
pub use sink::{AudioSink, WavFileSink};

use anyhow::{Context, Result};
use std::path::Path;
use tracing::{debug, info};

use crate::audio::mime::WAV_MIME;
use crate::session::CapturedAudio;

/// Decode `audio` and play it through `sink`
pub fn play(audio: &CapturedAudio, sink: &mut dyn AudioSink) -> Result<()> {
    if audio.is_empty() {
        debug!("Nothing to play: empty {} audio", audio.essence());
        return Ok(());
    }

    let decoded = decode(audio)
        .with_context(|| format!("Failed to decode {} audio", audio.essence()))?;

    info!(
        "Playing {} ({:.1}s) through {}",
        audio.essence(),
        decoded.duration_seconds(),
        sink.name()
    );
    sink.play(&decoded)
}

/// Play raw WAV bytes, e.g. an assistant's spoken reply
pub fn play_once(raw_wav: Vec<u8>, sink: &mut dyn AudioSink) -> Result<CapturedAudio> {
    let audio = CapturedAudio::new(raw_wav, WAV_MIME);
    play(&audio, sink)?;
    Ok(audio)
}

/// The sink `play` should use on this build
///
/// The default audio output when built with the `speaker` feature,
/// otherwise numbered WAV files under `output_dir`.
pub fn default_sink(output_dir: impl AsRef<Path>) -> Result<Box<dyn AudioSink>> {
    #[cfg(feature = "speaker")]
    {
        let _ = output_dir;
        Ok(Box::new(DeviceSink::new()?))
    }

    #[cfg(not(feature = "speaker"))]
    {
        Ok(Box::new(WavFileSink::new(output_dir.as_ref(), "playback")?))
    }
}
