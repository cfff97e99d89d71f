use anyhow::{Context, Result};
use std::io::Cursor;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

use crate::audio::mime;
use crate::session::CapturedAudio;

/// Interleaved 16-bit samples ready for an output device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedAudio {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl DecodedAudio {
    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 || self.channels == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / (self.sample_rate as f64 * self.channels as f64)
    }

    /// Normalised f32 samples laid out for an output with `channels`
    /// channels. Extra output channels repeat the last source channel.
    pub fn to_f32_interleaved(&self, channels: u16) -> Vec<f32> {
        let source = usize::from(self.channels.max(1));
        let target = usize::from(channels.max(1));

        self.samples
            .chunks_exact(source)
            .flat_map(|frame| (0..target).map(move |c| frame[c.min(source - 1)]))
            .map(|s| f32::from(s) / 32768.0)
            .collect()
    }
}

/// Decode captured audio according to its format tag
///
/// Raw PCM is read directly; everything else goes through the symphonia
/// probe, using the MIME essence as a hint.
pub fn decode(audio: &CapturedAudio) -> Result<DecodedAudio> {
    if let Some((sample_rate, channels)) = mime::pcm_params(audio.mime_type()) {
        let samples = audio
            .bytes()
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        return Ok(DecodedAudio {
            samples,
            sample_rate,
            channels,
        });
    }

    decode_container(audio.bytes(), audio.essence())
}

fn decode_container(data: &[u8], essence: &str) -> Result<DecodedAudio> {
    let source = MediaSourceStream::new(Box::new(Cursor::new(data.to_vec())), Default::default());

    let mut hint = Hint::new();
    hint.mime_type(essence);

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            source,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .with_context(|| format!("Unrecognised audio format: {essence}"))?;
    let mut format = probed.format;

    let track = format
        .default_track()
        .context("Audio contains no playable track")?;
    let track_id = track.id;
    let mut sample_rate = track.codec_params.sample_rate.unwrap_or(0);
    let mut channels = track
        .codec_params
        .channels
        .map_or(0, |c| c.count() as u16);
    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .context("No decoder available for audio track")?;

    let mut samples = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(e).context("Failed to read audio packet"),
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                sample_rate = spec.rate;
                channels = spec.channels.count() as u16;

                let mut buffer = SampleBuffer::<i16>::new(decoded.capacity() as u64, spec);
                buffer.copy_interleaved_ref(decoded);
                samples.extend_from_slice(buffer.samples());
            }
            Err(SymphoniaError::DecodeError(e)) => warn!("Skipping undecodable packet: {}", e),
            Err(e) => return Err(e).context("Failed to decode audio"),
        }
    }

    debug!(
        "Decoded {}: {} samples, {}Hz, {} channels",
        essence,
        samples.len(),
        sample_rate,
        channels
    );

    Ok(DecodedAudio {
        samples,
        sample_rate,
        channels,
    })
}

/// Render decoded audio as WAV bytes
pub fn encode_wav(audio: &DecodedAudio) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: audio.channels,
        sample_rate: audio.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer =
            hound::WavWriter::new(&mut cursor, spec).context("Failed to create WAV writer")?;
        for &sample in &audio.samples {
            writer
                .write_sample(sample)
                .context("Failed to write sample to WAV")?;
        }
        writer.finalize().context("Failed to finalize WAV")?;
    }

    Ok(cursor.into_inner())
}
