use super::backend::AudioFrame;

/// Bring a frame to the target format: decimate, then downmix to mono
pub fn process_frame(frame: AudioFrame, target_sample_rate: u32, target_channels: u16) -> AudioFrame {
    let mut processed = frame;

    if processed.sample_rate != target_sample_rate {
        processed = downsample_frame(processed, target_sample_rate);
    }

    if processed.channels != target_channels && target_channels == 1 {
        processed = downmix_to_mono(processed);
    }

    processed
}

/// Downsample by decimation. Only integer ratios above 1 are applied; slower
/// devices keep their native rate.
pub fn downsample_frame(frame: AudioFrame, target_rate: u32) -> AudioFrame {
    if target_rate == 0 || frame.sample_rate <= target_rate {
        return frame;
    }

    let ratio = (frame.sample_rate / target_rate) as usize;
    if ratio <= 1 || frame.sample_rate % target_rate != 0 {
        return frame;
    }

    let channels = frame.channels.max(1) as usize;
    let samples = frame
        .samples
        .chunks_exact(channels)
        .step_by(ratio)
        .flatten()
        .copied()
        .collect();

    AudioFrame {
        samples,
        sample_rate: target_rate,
        ..frame
    }
}

/// Average all channels of each interleaved frame
pub fn downmix_to_mono(frame: AudioFrame) -> AudioFrame {
    if frame.channels <= 1 {
        return frame;
    }

    let channels = frame.channels as usize;
    let samples = frame
        .samples
        .chunks_exact(channels)
        .map(|group| {
            let sum: i32 = group.iter().map(|&s| s as i32).sum();
            (sum / channels as i32) as i16
        })
        .collect();

    AudioFrame {
        samples,
        channels: 1,
        ..frame
    }
}
