use anyhow::{bail, Context, Result};
use hound::{SampleFormat, WavSpec, WavWriter};
use std::io::Cursor;
use tracing::info;

use super::backend::AudioFrame;
use crate::media::MediaBlob;

pub const WAV_MIME: &str = "audio/wav";

/// Concatenate frames into one in-memory 16-bit PCM WAV clip.
///
/// All frames must share the format of the first one.
pub fn encode_frames(frames: &[AudioFrame]) -> Result<MediaBlob> {
    let Some(first) = frames.first() else {
        return Ok(MediaBlob::new(WAV_MIME, encode_samples(&[], 16000, 1)?));
    };

    let (sample_rate, channels) = (first.sample_rate, first.channels);
    if let Some(odd) = frames
        .iter()
        .find(|f| f.sample_rate != sample_rate || f.channels != channels)
    {
        bail!(
            "Frame format changed mid-recording ({}Hz/{}ch -> {}Hz/{}ch)",
            sample_rate,
            channels,
            odd.sample_rate,
            odd.channels
        );
    }

    let samples: Vec<i16> = frames.iter().flat_map(|f| f.samples.iter().copied()).collect();
    let data = encode_samples(&samples, sample_rate, channels)?;

    info!(
        "Encoded {} frames ({:.1}s, {}Hz, {} channels) into {} bytes",
        frames.len(),
        samples.len() as f64 / (sample_rate as f64 * channels.max(1) as f64),
        sample_rate,
        channels,
        data.len()
    );

    Ok(MediaBlob::new(WAV_MIME, data))
}

fn encode_samples(samples: &[i16], sample_rate: u32, channels: u16) -> Result<Vec<u8>> {
    let spec = WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer =
            WavWriter::new(&mut cursor, spec).context("Failed to create WAV writer")?;
        for &sample in samples {
            writer
                .write_sample(sample)
                .context("Failed to write sample to WAV")?;
        }
        writer.finalize().context("Failed to finalize WAV data")?;
    }

    Ok(cursor.into_inner())
}
