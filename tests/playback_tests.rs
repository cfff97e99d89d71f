// Integration tests for playback
//
// These tests verify format-driven decoding, output layout and the WAV
// file sink.

use anyhow::Result;
use std::io::Cursor;
use voicekit::playback::{self, AudioSink, DecodedAudio, WavFileSink};
use voicekit::CapturedAudio;

fn pcm_bytes(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

fn tone(samples: usize) -> Vec<i16> {
    (0..samples).map(|i| ((i % 50) as i16 - 25) * 400).collect()
}

/// Sink that keeps clips in memory
#[derive(Default)]
struct RecordingSink {
    clips: Vec<DecodedAudio>,
}

impl AudioSink for RecordingSink {
    fn play(&mut self, audio: &DecodedAudio) -> Result<()> {
        self.clips.push(audio.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[test]
fn test_decode_pcm_uses_format_parameters() -> Result<()> {
    let samples = vec![1i16, -1, 300, -300];
    let audio = CapturedAudio::new(pcm_bytes(&samples), "audio/pcm;rate=8000;channels=2");

    let decoded = playback::decode(&audio)?;

    assert_eq!(decoded.samples, samples);
    assert_eq!(decoded.sample_rate, 8000);
    assert_eq!(decoded.channels, 2);
    assert!((decoded.duration_seconds() - 0.00025).abs() < 1e-9);

    Ok(())
}

#[test]
fn test_decode_wav_through_container_probe() -> Result<()> {
    let original = DecodedAudio {
        samples: tone(4410),
        sample_rate: 44100,
        channels: 1,
    };
    let wav = playback::encode_wav(&original)?;

    let decoded = playback::decode(&CapturedAudio::new(wav, "audio/wav"))?;

    assert_eq!(decoded, original);

    Ok(())
}

#[test]
fn test_encode_wav_is_readable_by_hound() -> Result<()> {
    let audio = DecodedAudio {
        samples: vec![10, -10, 20, -20],
        sample_rate: 16000,
        channels: 2,
    };

    let wav = playback::encode_wav(&audio)?;
    let mut reader = hound::WavReader::new(Cursor::new(wav))?;

    assert_eq!(reader.spec().sample_rate, 16000);
    assert_eq!(reader.spec().channels, 2);
    let samples = reader.samples::<i16>().collect::<Result<Vec<_>, _>>()?;
    assert_eq!(samples, audio.samples);

    Ok(())
}

#[test]
fn test_decode_rejects_unknown_container() {
    let audio = CapturedAudio::new(b"this is not audio at all".to_vec(), "audio/webm;codecs=opus");

    assert!(playback::decode(&audio).is_err());
}

#[test]
fn test_play_empty_audio_is_a_no_op() -> Result<()> {
    let mut sink = RecordingSink::default();

    playback::play(&CapturedAudio::new(Vec::new(), "audio/webm"), &mut sink)?;

    assert!(sink.clips.is_empty());

    Ok(())
}

#[test]
fn test_play_captured_pcm() -> Result<()> {
    let mut sink = RecordingSink::default();
    let audio = CapturedAudio::new(pcm_bytes(&tone(1600)), "audio/pcm;rate=16000;channels=1");

    playback::play(&audio, &mut sink)?;

    assert_eq!(sink.clips.len(), 1);
    assert_eq!(sink.clips[0].samples.len(), 1600);
    assert!((sink.clips[0].duration_seconds() - 0.1).abs() < 1e-9);

    Ok(())
}

#[test]
fn test_play_once_writes_numbered_files() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let mut sink = WavFileSink::new(dir.path().join("out"), "reply")?;
    let wav = playback::encode_wav(&DecodedAudio {
        samples: tone(800),
        sample_rate: 16000,
        channels: 1,
    })?;

    let first = playback::play_once(wav.clone(), &mut sink)?;
    playback::play_once(wav, &mut sink)?;

    assert_eq!(first.mime_type(), "audio/wav");
    assert_eq!(
        sink.played(),
        &[
            dir.path().join("out").join("reply-000.wav"),
            dir.path().join("out").join("reply-001.wav"),
        ]
    );

    let reader = hound::WavReader::open(&sink.played()[1])?;
    assert_eq!(reader.duration(), 800);

    Ok(())
}

#[test]
fn test_captured_audio_accessors() {
    let audio = CapturedAudio::new(vec![0u8; 3200], "audio/pcm;rate=16000;channels=1");

    assert_eq!(audio.size(), 3200);
    assert_eq!(audio.essence(), "audio/pcm");
    assert_eq!(audio.segment_count(), 1);
    assert_eq!(audio.duration(), Some(std::time::Duration::from_millis(100)));

    let webm = CapturedAudio::new(vec![1, 2, 3], "audio/webm;codecs=opus");
    assert_eq!(webm.duration(), None);
    assert_eq!(webm.essence(), "audio/webm");
    assert_eq!(webm.into_bytes(), vec![1, 2, 3]);
}

#[test]
fn test_captured_audio_data_url() {
    let audio = CapturedAudio::new(b"hi!".to_vec(), "audio/webm;codecs=opus");

    assert_eq!(audio.to_data_url(), "data:audio/webm;codecs=opus;base64,aGkh");
}

#[test]
fn test_output_layout_for_device() {
    let stereo = DecodedAudio {
        samples: vec![16384, -16384, 0, 32767],
        sample_rate: 16000,
        channels: 2,
    };

    // Same layout: only normalised
    assert_eq!(stereo.to_f32_interleaved(2), vec![0.5, -0.5, 0.0, 32767.0 / 32768.0]);
    // Fewer output channels keep the leading ones
    assert_eq!(stereo.to_f32_interleaved(1), vec![0.5, 0.0]);

    let mono = DecodedAudio {
        samples: vec![-32768, 8192],
        sample_rate: 16000,
        channels: 1,
    };
    // Mono is repeated across every output channel
    assert_eq!(mono.to_f32_interleaved(2), vec![-1.0, -1.0, 0.25, 0.25]);
}

#[cfg(not(feature = "speaker"))]
#[test]
fn test_default_sink_without_speaker_writes_files() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let mut sink = playback::default_sink(dir.path())?;
    let wav = playback::encode_wav(&DecodedAudio {
        samples: tone(160),
        sample_rate: 16000,
        channels: 1,
    })?;

    playback::play_once(wav, sink.as_mut())?;

    assert_eq!(sink.name(), "wav-file");
    assert!(dir.path().join("playback-000.wav").is_file());

    Ok(())
}
