// Shared test doubles: a scripted model backend and a scripted capture device
#![allow(dead_code)]

use anyhow::{anyhow, Result};
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::mpsc;
use voice_canvas::audio::{AudioFrame, CaptureDevice};
use voice_canvas::error::CaptureError;
use voice_canvas::gemini::{GenerativeBackend, ModelRequest, PartStream, StreamPart};
use voice_canvas::{Config, MediaBlob, SessionOrchestrator};

enum StreamScript {
    Chunks(Vec<Vec<StreamPart>>),
    /// Yields the given chunks, then errors
    FailAfter(Vec<Vec<StreamPart>>, String),
    /// Never yields
    Pending,
    /// The call itself never returns a stream
    Stalled,
}

/// In-memory model endpoint. Streaming and non-streaming calls each pop the
/// next scripted response in order.
#[derive(Default)]
pub struct ScriptedBackend {
    streams: Mutex<VecDeque<StreamScript>>,
    texts: Mutex<VecDeque<Result<String, String>>>,
    requests: Mutex<Vec<ModelRequest>>,
}

impl ScriptedBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_stream(&self, chunks: Vec<Vec<StreamPart>>) {
        self.streams.lock().push_back(StreamScript::Chunks(chunks));
    }

    pub fn push_stream_error(&self, chunks: Vec<Vec<StreamPart>>, message: &str) {
        self.streams
            .lock()
            .push_back(StreamScript::FailAfter(chunks, message.to_string()));
    }

    pub fn push_pending_stream(&self) {
        self.streams.lock().push_back(StreamScript::Pending);
    }

    pub fn push_stalled_stream(&self) {
        self.streams.lock().push_back(StreamScript::Stalled);
    }

    pub fn push_text(&self, text: &str) {
        self.texts.lock().push_back(Ok(text.to_string()));
    }

    pub fn push_text_error(&self, message: &str) {
        self.texts.lock().push_back(Err(message.to_string()));
    }

    /// Every request seen, in call order
    pub fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait::async_trait]
impl GenerativeBackend for ScriptedBackend {
    async fn stream_generate(&self, request: ModelRequest) -> Result<PartStream> {
        self.requests.lock().push(request);
        let script = self
            .streams
            .lock()
            .pop_front()
            .ok_or_else(|| anyhow!("No scripted stream left"))?;

        let stream: PartStream = match script {
            StreamScript::Chunks(chunks) => stream::iter(chunks.into_iter().map(Ok)).boxed(),
            StreamScript::FailAfter(chunks, message) => stream::iter(
                chunks
                    .into_iter()
                    .map(Ok)
                    .chain(std::iter::once(Err(anyhow!(message)))),
            )
            .boxed(),
            StreamScript::Pending => stream::pending().boxed(),
            StreamScript::Stalled => return std::future::pending().await,
        };
        Ok(stream)
    }

    async fn generate(&self, request: ModelRequest) -> Result<String> {
        self.requests.lock().push(request);
        match self.texts.lock().pop_front() {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(anyhow!(message)),
            None => Err(anyhow!("No scripted text left")),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

pub fn thought(text: &str) -> StreamPart {
    StreamPart::Thought(text.to_string())
}

pub fn answer(text: &str) -> StreamPart {
    StreamPart::Answer(text.to_string())
}

pub fn inline_image(mime_type: Option<&str>, data: &[u8]) -> StreamPart {
    StreamPart::InlineBinary {
        mime_type: mime_type.map(str::to_string),
        data: data.to_vec(),
    }
}

pub fn png(tag: u8) -> MediaBlob {
    MediaBlob::new("image/png", vec![0x89, b'P', b'N', b'G', tag])
}

/// A clip comfortably above the submission threshold
pub fn voice_clip() -> MediaBlob {
    MediaBlob::new("audio/webm", vec![7u8; 4096])
}

pub fn test_config() -> Result<Config> {
    Ok(Config::load("does/not/exist")?)
}

pub fn orchestrator(backend: Arc<ScriptedBackend>) -> Result<Arc<SessionOrchestrator>> {
    let config = test_config()?;
    Ok(Arc::new(SessionOrchestrator::from_config(backend, &config)))
}

/// Capture device that replays a fixed set of frames
pub struct ScriptedDevice {
    pub supported: bool,
    pub open_error: Option<CaptureError>,
    pub frames: Vec<AudioFrame>,
    pub open_count: usize,
    sender: Option<mpsc::Sender<AudioFrame>>,
}

impl ScriptedDevice {
    pub fn with_frames(frames: Vec<AudioFrame>) -> Self {
        Self {
            supported: true,
            open_error: None,
            frames,
            open_count: 0,
            sender: None,
        }
    }

    pub fn failing(err: CaptureError) -> Self {
        Self {
            open_error: Some(err),
            ..Self::with_frames(Vec::new())
        }
    }

    pub fn unsupported() -> Self {
        Self {
            supported: false,
            ..Self::with_frames(Vec::new())
        }
    }
}

#[async_trait::async_trait]
impl CaptureDevice for ScriptedDevice {
    fn is_supported(&self) -> bool {
        self.supported
    }

    async fn open(&mut self) -> Result<mpsc::Receiver<AudioFrame>, CaptureError> {
        if let Some(err) = self.open_error.clone() {
            return Err(err);
        }
        self.open_count += 1;

        let (tx, rx) = mpsc::channel(self.frames.len().max(1));
        for frame in &self.frames {
            tx.try_send(frame.clone())
                .map_err(|e| CaptureError::DeviceError(e.to_string()))?;
        }
        self.sender = Some(tx);
        Ok(rx)
    }

    async fn close(&mut self) -> Result<(), CaptureError> {
        self.sender = None;
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.sender.is_some()
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// `count` frames of 100ms each
pub fn frames(count: u64, sample_rate: u32, channels: u16) -> Vec<AudioFrame> {
    let per_frame = (sample_rate / 10) as usize * channels as usize;
    (0..count)
        .map(|i| AudioFrame {
            samples: vec![1000i16; per_frame],
            sample_rate,
            channels,
            timestamp_ms: i * 100,
        })
        .collect()
}
