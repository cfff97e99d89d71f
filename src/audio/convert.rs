// Frame conversion to the capture target format
//
// Sources deliver whatever the device or file provides; frames are
// downsampled and mixed down here before they reach the encoder.

use super::backend::AudioFrame;

/// Process audio frame: downsample and convert to target format
pub fn convert_frame(frame: AudioFrame, target_sample_rate: u32, target_channels: u16) -> AudioFrame {
    let mut processed = frame;

    if processed.sample_rate != target_sample_rate {
        processed = downsample(processed, target_sample_rate);
    }

    if processed.channels != target_channels && target_channels == 1 {
        processed = stereo_to_mono(processed);
    }

    processed
}

/// Downsample audio frame by decimation
pub fn downsample(frame: AudioFrame, target_rate: u32) -> AudioFrame {
    if frame.sample_rate == target_rate || target_rate == 0 {
        return frame;
    }

    let ratio = frame.sample_rate / target_rate;
    if ratio <= 1 {
        return frame; // Can't upsample
    }

    // Keep every Nth sample frame so channels stay interleaved
    let channels = usize::from(frame.channels.max(1));
    let samples: Vec<i16> = frame
        .samples
        .chunks_exact(channels)
        .step_by(ratio as usize)
        .flatten()
        .copied()
        .collect();

    AudioFrame {
        samples,
        sample_rate: frame.sample_rate / ratio,
        channels: frame.channels,
        timestamp_ms: frame.timestamp_ms,
    }
}

/// Convert stereo to mono by summing channels
pub fn stereo_to_mono(frame: AudioFrame) -> AudioFrame {
    if frame.channels != 2 {
        return frame; // Only support stereo -> mono
    }

    // Sum left and right channels (no division to preserve volume)
    let samples = frame
        .samples
        .chunks_exact(2)
        .map(|pair| {
            let sum = i32::from(pair[0]) + i32::from(pair[1]);
            sum.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16
        })
        .collect();

    AudioFrame {
        samples,
        sample_rate: frame.sample_rate,
        channels: 1,
        timestamp_ms: frame.timestamp_ms,
    }
}
