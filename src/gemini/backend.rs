use anyhow::Result;
use futures::stream::BoxStream;

use crate::media::MediaBlob;

/// One outgoing content part, in request order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputPart {
    Text(String),
    Inline(MediaBlob),
}

/// One decoded part of a streamed response chunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamPart {
    /// Intermediate reasoning, excluded from the answer
    Thought(String),
    /// Answer text
    Answer(String),
    /// Inline binary payload (generated image)
    InlineBinary {
        mime_type: Option<String>,
        data: Vec<u8>,
    },
}

/// Output modality requested from the model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modality {
    Text,
    Image,
}

impl Modality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Modality::Text => "TEXT",
            Modality::Image => "IMAGE",
        }
    }
}

/// A single call against a generative model
#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub model: String,
    pub parts: Vec<InputPart>,
    /// Ask the model to surface its thinking as thought parts
    pub include_thoughts: bool,
    /// Empty means the endpoint default
    pub response_modalities: Vec<Modality>,
}

impl ModelRequest {
    pub fn new(model: impl Into<String>, parts: Vec<InputPart>) -> Self {
        Self {
            model: model.into(),
            parts,
            include_thoughts: false,
            response_modalities: Vec::new(),
        }
    }

    pub fn with_thoughts(mut self) -> Self {
        self.include_thoughts = true;
        self
    }

    pub fn with_modalities(mut self, modalities: &[Modality]) -> Self {
        self.response_modalities = modalities.to_vec();
        self
    }

    /// Concatenated text of all text parts
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|part| match part {
                InputPart::Text(text) => Some(text.as_str()),
                InputPart::Inline(_) => None,
            })
            .collect()
    }

    /// Inline payloads in request order
    pub fn inline_blobs(&self) -> Vec<&MediaBlob> {
        self.parts
            .iter()
            .filter_map(|part| match part {
                InputPart::Inline(blob) => Some(blob),
                InputPart::Text(_) => None,
            })
            .collect()
    }
}

/// Stream of decoded chunks; each item holds the parts of one chunk
pub type PartStream = BoxStream<'static, Result<Vec<StreamPart>>>;

/// Generative model endpoint
///
/// Implementations:
/// - `GeminiClient`: REST API over HTTPS (SSE for streaming calls)
/// - scripted in-memory backends (tests)
#[async_trait::async_trait]
pub trait GenerativeBackend: Send + Sync {
    /// Issue a streaming call
    async fn stream_generate(&self, request: ModelRequest) -> Result<PartStream>;

    /// Issue a non-streaming call and return the answer text
    async fn generate(&self, request: ModelRequest) -> Result<String>;

    /// Get backend name for logging
    fn name(&self) -> &str;
}
