use anyhow::{Context, Result};
use hound::WavReader;
use mime_guess::mime;
use std::io::Cursor;
use std::path::Path;
use tracing::info;

use super::wav::WAV_MIME;
use crate::enhance::DEFAULT_AUDIO_MIME;
use crate::media::MediaBlob;

/// A pre-recorded audio file submitted in place of a live recording
pub struct AudioFile {
    pub path: String,
    /// Known only for WAV input
    pub duration_seconds: Option<f64>,
    pub clip: MediaBlob,
}

impl AudioFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening audio file: {}", path.display());

        let data = std::fs::read(path)
            .with_context(|| format!("Failed to read audio file: {}", path.display()))?;
        let mime_type = audio_mime_for_path(path);

        let duration_seconds = if mime_type == WAV_MIME {
            let reader = WavReader::new(Cursor::new(&data)).context("Failed to open WAV file")?;
            let spec = reader.spec();
            let duration = reader.duration() as f64 / spec.sample_rate as f64;

            info!(
                "Audio file loaded: {:.1}s, {}Hz, {} channels",
                duration, spec.sample_rate, spec.channels
            );
            Some(duration)
        } else {
            info!("Audio file loaded: {} ({} bytes)", mime_type, data.len());
            None
        };

        Ok(Self {
            path: path.display().to_string(),
            duration_seconds,
            clip: MediaBlob::new(mime_type, data),
        })
    }
}

/// Audio-only containers like `.mp4` and `.webm` are guessed as video
fn audio_mime_for_path(path: &Path) -> String {
    let guess = mime_guess::from_path(path);
    if let Some(audio) = guess.iter().find(|m| m.type_() == mime::AUDIO) {
        return audio.essence_str().to_string();
    }
    match guess.first() {
        Some(container) if container.type_() == mime::VIDEO => {
            format!("audio/{}", container.subtype())
        }
        _ => DEFAULT_AUDIO_MIME.to_string(),
    }
}
