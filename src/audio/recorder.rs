use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::backend::{AudioFrame, CaptureConfig, CaptureDevice};
use super::convert::process_frame;
use super::wav::encode_frames;
use crate::error::CaptureError;
use crate::media::MediaBlob;

/// Recordings of this size or less are treated as empty/silent by callers
pub const MIN_SUBMIT_BYTES: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderState {
    Idle,
    Recording,
    Stopped,
}

/// Three-state recorder over one capture device.
///
/// Produces a single audio clip per recording session. Holds at most one
/// open device handle at a time.
pub struct AudioRecorder<D: CaptureDevice> {
    device: D,
    config: CaptureConfig,
    state: RecorderState,
    collector: Option<JoinHandle<Vec<AudioFrame>>>,
    last_error: Option<CaptureError>,
}

impl<D: CaptureDevice> AudioRecorder<D> {
    pub fn new(device: D, config: CaptureConfig) -> Self {
        Self {
            device,
            config,
            state: RecorderState::Idle,
            collector: None,
            last_error: None,
        }
    }

    pub fn state(&self) -> RecorderState {
        self.state
    }

    pub fn is_recording(&self) -> bool {
        self.state == RecorderState::Recording
    }

    pub fn is_supported(&self) -> bool {
        self.device.is_supported()
    }

    /// Error from the most recent start attempt, if it failed
    pub fn last_error(&self) -> Option<&CaptureError> {
        self.last_error.as_ref()
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    /// Acquire the device and begin accumulating audio.
    ///
    /// A no-op while already recording. Failures are terminal for this
    /// attempt and remain readable through `last_error`.
    pub async fn start_capture(&mut self) -> Result<(), CaptureError> {
        if self.is_recording() {
            warn!("Recording already started");
            return Ok(());
        }

        self.last_error = None;

        if !self.device.is_supported() {
            let err = CaptureError::DeviceUnsupported(format!(
                "{} reports no capture support",
                self.device.name()
            ));
            return Err(self.fail(err));
        }

        let frames_rx = match self.device.open().await {
            Ok(rx) => rx,
            Err(e) => return Err(self.fail(e)),
        };

        self.collector = Some(tokio::spawn(collect_frames(frames_rx)));
        self.state = RecorderState::Recording;

        info!("Recording started on {}", self.device.name());
        Ok(())
    }

    /// Finalize the recording into one clip and release the device.
    ///
    /// Returns `None` when not recording.
    pub async fn stop_capture(&mut self) -> Result<Option<MediaBlob>, CaptureError> {
        if !self.is_recording() {
            return Ok(None);
        }

        if let Err(e) = self.device.close().await {
            error!("Failed to release capture device: {}", e);
        }
        self.state = RecorderState::Stopped;

        let frames = match self.collector.take() {
            Some(collector) => collector.await.map_err(|e| {
                CaptureError::DeviceError(format!("Frame collector failed: {e}"))
            })?,
            None => Vec::new(),
        };

        let frames: Vec<AudioFrame> = frames
            .into_iter()
            .map(|f| process_frame(f, self.config.target_sample_rate, self.config.target_channels))
            .collect();

        let clip = encode_frames(&frames)
            .map_err(|e| CaptureError::DeviceError(format!("Failed to encode recording: {e:#}")))?;

        info!("Recording stopped ({} bytes)", clip.len());
        Ok(Some(clip))
    }

    /// Release the device and discard everything captured so far
    pub async fn cancel_capture(&mut self) {
        if !self.is_recording() {
            return;
        }

        if let Err(e) = self.device.close().await {
            error!("Failed to release capture device: {}", e);
        }
        if let Some(collector) = self.collector.take() {
            collector.abort();
        }

        self.state = RecorderState::Idle;
        info!("Recording cancelled");
    }

    fn fail(&mut self, err: CaptureError) -> CaptureError {
        error!("Error starting audio recording: {}", err);
        self.last_error = Some(err.clone());
        self.state = RecorderState::Idle;
        err
    }
}

async fn collect_frames(mut frames_rx: mpsc::Receiver<AudioFrame>) -> Vec<AudioFrame> {
    let mut frames = Vec::new();
    while let Some(frame) = frames_rx.recv().await {
        if !frame.samples.is_empty() {
            frames.push(frame);
        }
    }
    frames
}

/// Caller-side guard against submitting empty or silent captures
pub fn is_submittable(clip: &MediaBlob, min_bytes: usize) -> bool {
    clip.len() > min_bytes
}
