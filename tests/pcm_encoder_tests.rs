// Integration tests for the PCM encoder
//
// These tests verify chunk boundaries, flush-on-halt and format
// negotiation.

use anyhow::Result;
use std::time::Duration;
use tokio::sync::mpsc;
use voicekit::audio::{AudioFrame, Encoder, EncoderEvent, EncoderOptions, PcmEncoder};

fn frame(value: i16, samples: usize, timestamp_ms: u64) -> AudioFrame {
    AudioFrame {
        samples: vec![value; samples],
        sample_rate: 16000,
        channels: 1,
        timestamp_ms,
    }
}

async fn collect(mut events: mpsc::UnboundedReceiver<EncoderEvent>) -> Vec<EncoderEvent> {
    let mut collected = Vec::new();
    while let Some(event) = events.recv().await {
        let stopped = event == EncoderEvent::Stopped;
        collected.push(event);
        if stopped {
            break;
        }
    }
    collected
}

fn chunk_sizes(events: &[EncoderEvent]) -> Vec<usize> {
    events
        .iter()
        .filter_map(|event| match event {
            EncoderEvent::Data(data) => Some(data.len()),
            EncoderEvent::Stopped => None,
        })
        .collect()
}

#[tokio::test]
async fn test_pcm_encoder_cuts_chunks_by_timeslice() -> Result<()> {
    let (frame_tx, frame_rx) = mpsc::channel(100);
    let options = EncoderOptions {
        mime_type: None,
        timeslice: Some(Duration::from_millis(100)), // 1600 samples = 3200 bytes
    };
    let mut encoder = PcmEncoder::new(frame_rx, 16000, 1, &options)?;
    assert_eq!(encoder.mime_type(), "audio/pcm;rate=16000;channels=1");

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    encoder.start(events_tx)?;

    // 5 frames of 50ms each = 250ms of audio
    for i in 0..5 {
        frame_tx.send(frame(i as i16, 800, i * 50)).await?;
    }
    drop(frame_tx);

    let events = collect(events_rx).await;

    assert_eq!(chunk_sizes(&events), vec![3200, 3200, 1600]);
    assert_eq!(events.last(), Some(&EncoderEvent::Stopped));

    Ok(())
}

#[tokio::test]
async fn test_pcm_encoder_without_timeslice_emits_once() -> Result<()> {
    let (frame_tx, frame_rx) = mpsc::channel(100);
    let options = EncoderOptions {
        mime_type: None,
        timeslice: None,
    };
    let mut encoder = PcmEncoder::new(frame_rx, 16000, 1, &options)?;

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    encoder.start(events_tx)?;

    for i in 0..4 {
        frame_tx.send(frame(1, 1600, i * 100)).await?;
    }
    drop(frame_tx);

    let events = collect(events_rx).await;
    assert_eq!(chunk_sizes(&events), vec![4 * 1600 * 2]);

    Ok(())
}

#[tokio::test]
async fn test_pcm_encoder_flushes_buffered_frames_on_stop() -> Result<()> {
    let (frame_tx, frame_rx) = mpsc::channel(100);
    let options = EncoderOptions {
        mime_type: None,
        timeslice: Some(Duration::from_secs(10)),
    };
    let mut encoder = PcmEncoder::new(frame_rx, 16000, 1, &options)?;

    // Frames queued before the halt belong to the recording
    frame_tx.send(frame(7, 160, 0)).await?;
    frame_tx.send(frame(8, 160, 10)).await?;

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    encoder.start(events_tx)?;
    encoder.stop();
    encoder.stop(); // idempotent

    let events = collect(events_rx).await;
    assert_eq!(chunk_sizes(&events), vec![640]);

    let EncoderEvent::Data(data) = &events[0] else {
        panic!("Expected data first");
    };
    assert_eq!(i16::from_le_bytes([data[0], data[1]]), 7);
    assert_eq!(i16::from_le_bytes([data[638], data[639]]), 8);

    drop(frame_tx);
    Ok(())
}

#[tokio::test]
async fn test_pcm_encoder_encodes_little_endian() -> Result<()> {
    let (frame_tx, frame_rx) = mpsc::channel(10);
    let options = EncoderOptions {
        mime_type: Some("audio/pcm".to_string()),
        timeslice: None,
    };
    let mut encoder = PcmEncoder::new(frame_rx, 16000, 1, &options)?;
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    encoder.start(events_tx)?;

    frame_tx
        .send(AudioFrame {
            samples: vec![1, -2, 0x1234],
            sample_rate: 16000,
            channels: 1,
            timestamp_ms: 0,
        })
        .await?;
    drop(frame_tx);

    let events = collect(events_rx).await;
    assert_eq!(
        events[0],
        EncoderEvent::Data(vec![0x01, 0x00, 0xFE, 0xFF, 0x34, 0x12])
    );

    Ok(())
}

#[test]
fn test_pcm_encoder_rejects_unsupported_format() {
    let (_frame_tx, frame_rx) = mpsc::channel(1);
    let options = EncoderOptions {
        mime_type: Some("audio/webm;codecs=opus".to_string()),
        timeslice: None,
    };

    let result = PcmEncoder::new(frame_rx, 16000, 1, &options);
    assert!(result.is_err(), "Non-PCM format should be refused at bind time");
}

#[tokio::test]
async fn test_pcm_encoder_cannot_start_twice() -> Result<()> {
    let (_frame_tx, frame_rx) = mpsc::channel(1);
    let mut encoder = PcmEncoder::new(frame_rx, 16000, 1, &EncoderOptions::default())?;

    let (events_tx, _events_rx) = mpsc::unbounded_channel();
    encoder.start(events_tx.clone())?;
    assert!(encoder.start(events_tx).is_err());

    Ok(())
}

#[test]
fn test_encoder_options_default() {
    let options = EncoderOptions::default();

    assert!(options.mime_type.is_none());
    assert_eq!(options.timeslice, Some(Duration::from_millis(250)));
}
