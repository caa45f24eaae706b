// Microphone capture on the default input device via cpal
//
// cpal streams are not Send on every platform, so the stream lives on a
// dedicated thread for the duration of one recording. Dropping it there
// releases the device.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, SizedSample, Stream, StreamConfig};
use std::sync::mpsc as std_mpsc;
use std::thread::JoinHandle;
use std::time::Instant;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use super::backend::{classify_device_error, AudioFrame, CaptureDevice};
use crate::error::CaptureError;

/// Frames buffered between the audio callback and the recorder
const FRAME_CHANNEL_CAPACITY: usize = 512;

struct CaptureWorker {
    stop_tx: std_mpsc::Sender<()>,
    thread: JoinHandle<()>,
}

/// Default system microphone
pub struct MicrophoneDevice {
    worker: Option<CaptureWorker>,
}

impl MicrophoneDevice {
    pub fn new() -> Self {
        Self { worker: None }
    }
}

impl Default for MicrophoneDevice {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl CaptureDevice for MicrophoneDevice {
    fn is_supported(&self) -> bool {
        cpal::default_host().default_input_device().is_some()
    }

    async fn open(&mut self) -> Result<mpsc::Receiver<AudioFrame>, CaptureError> {
        if self.worker.is_some() {
            return Err(CaptureError::DeviceError("Already capturing".to_string()));
        }

        let (frame_tx, frame_rx) = mpsc::channel(FRAME_CHANNEL_CAPACITY);
        let (ready_tx, ready_rx) = oneshot::channel();
        let (stop_tx, stop_rx) = std_mpsc::channel();

        let thread = std::thread::Builder::new()
            .name("voice-canvas-mic".to_string())
            .spawn(move || run_capture(frame_tx, ready_tx, stop_rx))
            .map_err(|e| CaptureError::DeviceError(format!("Failed to spawn capture thread: {e}")))?;

        match ready_rx.await {
            Ok(Ok(())) => {
                self.worker = Some(CaptureWorker { stop_tx, thread });
                info!("Microphone capture started");
                Ok(frame_rx)
            }
            Ok(Err(e)) => {
                join_thread(thread).await;
                Err(e)
            }
            Err(_) => {
                join_thread(thread).await;
                Err(CaptureError::DeviceError(
                    "Capture thread exited before the stream started".to_string(),
                ))
            }
        }
    }

    async fn close(&mut self) -> Result<(), CaptureError> {
        let Some(worker) = self.worker.take() else {
            return Ok(());
        };

        // Send fails only if the thread is already gone
        let _ = worker.stop_tx.send(());
        join_thread(worker.thread).await;

        info!("Microphone released");
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.worker.is_some()
    }

    fn name(&self) -> &str {
        "cpal default input"
    }
}

async fn join_thread(thread: JoinHandle<()>) {
    match tokio::task::spawn_blocking(move || thread.join()).await {
        Ok(Ok(())) => {}
        Ok(Err(_)) => error!("Capture thread panicked"),
        Err(e) => error!("Failed to join capture thread: {}", e),
    }
}

/// Body of the capture thread: build the stream, report readiness, then hold
/// the stream until told to stop.
fn run_capture(
    frame_tx: mpsc::Sender<AudioFrame>,
    ready_tx: oneshot::Sender<Result<(), CaptureError>>,
    stop_rx: std_mpsc::Receiver<()>,
) {
    let stream = match build_stream(frame_tx) {
        Ok(stream) => stream,
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
        }
    };

    if let Err(e) = stream.play() {
        let _ = ready_tx.send(Err(classify_device_error(&e.to_string())));
        return;
    }

    if ready_tx.send(Ok(())).is_err() {
        warn!("Recorder stopped waiting for the microphone; releasing it");
        return;
    }

    // Returns on stop or when the recorder side is dropped
    let _ = stop_rx.recv();
    drop(stream);
    debug!("Capture thread exiting");
}

fn build_stream(frame_tx: mpsc::Sender<AudioFrame>) -> Result<Stream, CaptureError> {
    let host = cpal::default_host();
    let device = host.default_input_device().ok_or_else(|| {
        CaptureError::DeviceUnsupported("No input device available".to_string())
    })?;

    info!(
        "Using input device: {}",
        device.name().unwrap_or_else(|_| "Unknown".to_string())
    );

    let supported = device
        .default_input_config()
        .map_err(|e| classify_device_error(&e.to_string()))?;
    let sample_format = supported.sample_format();
    let config: StreamConfig = supported.into();

    let err_fn = |err: cpal::StreamError| error!("Audio input stream error: {}", err);
    let started = Instant::now();

    let stream = match sample_format {
        SampleFormat::F32 => device.build_input_stream(
            &config,
            frame_callback::<f32>(frame_tx, &config, started, |s| {
                (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
            }),
            err_fn,
            None,
        ),
        SampleFormat::I16 => device.build_input_stream(
            &config,
            frame_callback::<i16>(frame_tx, &config, started, |s| s),
            err_fn,
            None,
        ),
        SampleFormat::U16 => device.build_input_stream(
            &config,
            frame_callback::<u16>(frame_tx, &config, started, |s| {
                (s as i32 - 32768) as i16
            }),
            err_fn,
            None,
        ),
        other => {
            return Err(CaptureError::DeviceError(format!(
                "Unsupported sample format: {other:?}"
            )))
        }
    };

    stream.map_err(|e| classify_device_error(&e.to_string()))
}

fn frame_callback<T: SizedSample + 'static>(
    frame_tx: mpsc::Sender<AudioFrame>,
    config: &StreamConfig,
    started: Instant,
    convert: fn(T) -> i16,
) -> impl FnMut(&[T], &cpal::InputCallbackInfo) + Send + 'static {
    let sample_rate = config.sample_rate.0;
    let channels = config.channels;

    move |data: &[T], _: &cpal::InputCallbackInfo| {
        let frame = AudioFrame {
            samples: data.iter().map(|&s| convert(s)).collect(),
            sample_rate,
            channels,
            timestamp_ms: started.elapsed().as_millis() as u64,
        };

        if let Err(e) = frame_tx.try_send(frame) {
            debug!("Dropping audio frame: {}", e);
        }
    }
}
