use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::aspect::AspectRatio;
use super::prompts;
use crate::error::{PipelineError, Result};
use crate::gemini::{GenerativeBackend, InputPart, ModelRequest, StreamPart};
use crate::media::MediaBlob;
use crate::stream::{next_chunk, open_stream};

/// MIME type assumed for audio clips that arrive untagged
pub const DEFAULT_AUDIO_MIME: &str = "audio/webm";

/// Receives thought fragments as they stream in
pub type ThoughtSink<'a> = dyn FnMut(&str) + Send + 'a;

/// Which instruction template to use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnhanceMode {
    /// Fresh generation: answer is `{magicPrompt, aspectRatio}` JSON
    Generate,
    /// Edit of a base image: answer is the bare instruction
    Edit,
}

/// Images attached to an enhancement request
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageInputs<'a> {
    /// The image being edited, sent first
    pub base: Option<&'a MediaBlob>,
    /// Style/content references, sent after the base image
    pub context: &'a [MediaBlob],
}

impl<'a> ImageInputs<'a> {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn new(base: Option<&'a MediaBlob>, context: &'a [MediaBlob]) -> Self {
        Self { base, context }
    }

    fn parts(&self) -> impl Iterator<Item = InputPart> + '_ {
        self.base
            .into_iter()
            .chain(self.context.iter())
            .map(|blob| InputPart::Inline(blob.clone()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnhancedPrompt {
    pub original_prompt: String,
    pub magic_prompt: String,
    pub aspect_ratio: AspectRatio,
}

/// Generate-mode answer that could not be used as JSON. Always recovered.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Malformed enhancement response: {0}")]
pub struct MalformedEnhancement(pub String);

/// Turns raw requests into detailed image prompts via the text model
#[derive(Clone)]
pub struct PromptEnhancer {
    backend: Arc<dyn GenerativeBackend>,
    model: String,
}

impl PromptEnhancer {
    pub fn new(backend: Arc<dyn GenerativeBackend>, model: impl Into<String>) -> Self {
        Self {
            backend,
            model: model.into(),
        }
    }

    /// Stream an enhancement of `raw_text`, forwarding thought fragments to
    /// `on_thought` as they arrive.
    pub async fn enhance(
        &self,
        raw_text: &str,
        mode: EnhanceMode,
        images: ImageInputs<'_>,
        on_thought: &mut ThoughtSink<'_>,
        cancel: &CancellationToken,
    ) -> Result<EnhancedPrompt> {
        let instruction = match mode {
            EnhanceMode::Generate => prompts::generate_instruction(raw_text),
            EnhanceMode::Edit => prompts::edit_instruction(raw_text),
        };

        let mut parts: Vec<InputPart> = images.parts().collect();
        parts.push(InputPart::Text(instruction));

        info!(
            "Enhancing prompt ({:?} mode, {} images)",
            mode,
            parts.len() - 1
        );

        let request = ModelRequest::new(&self.model, parts).with_thoughts();
        let answer = self.stream_answer(request, on_thought, cancel).await?;

        let original_prompt = raw_text.to_string();
        if mode == EnhanceMode::Edit {
            return Ok(EnhancedPrompt {
                original_prompt,
                magic_prompt: answer.trim().to_string(),
                aspect_ratio: AspectRatio::Square,
            });
        }

        match parse_generate_answer(&answer) {
            Ok((magic_prompt, aspect_ratio)) => Ok(EnhancedPrompt {
                original_prompt,
                magic_prompt,
                aspect_ratio,
            }),
            Err(e) => {
                warn!(
                    "{}; using full text as prompt. Response text was: {:?}",
                    e, answer
                );
                Ok(EnhancedPrompt {
                    original_prompt,
                    magic_prompt: answer.trim().to_string(),
                    aspect_ratio: AspectRatio::Square,
                })
            }
        }
    }

    /// Extract the spoken instruction from `audio`, then enhance it
    pub async fn transcribe_then_enhance(
        &self,
        audio: &MediaBlob,
        mode: EnhanceMode,
        images: ImageInputs<'_>,
        on_thought: &mut ThoughtSink<'_>,
        cancel: &CancellationToken,
    ) -> Result<EnhancedPrompt> {
        let instruction = self.transcribe(audio, cancel).await?;
        self.enhance(&instruction, mode, images, on_thought, cancel)
            .await
    }

    /// Single non-streaming call returning the cleaned-up spoken command
    pub async fn transcribe(&self, audio: &MediaBlob, cancel: &CancellationToken) -> Result<String> {
        let mut audio = audio.clone();
        if audio.mime_type.is_empty() {
            audio.mime_type = DEFAULT_AUDIO_MIME.to_string();
        }

        info!("Transcribing {} bytes of {}", audio.len(), audio.mime_type);

        let request = ModelRequest::new(
            &self.model,
            vec![
                InputPart::Inline(audio),
                InputPart::Text(prompts::TRANSCRIPTION_INSTRUCTION.to_string()),
            ],
        );

        let text = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(PipelineError::Cancelled),
            text = self.backend.generate(request) => text?,
        };

        let text = text.trim();
        if text.is_empty() {
            return Err(PipelineError::EmptyTranscription);
        }

        info!("Transcribed instruction: {:?}", text);
        Ok(text.to_string())
    }

    /// Consume the stream: thoughts go to `on_thought`, everything else is
    /// concatenated into the answer.
    async fn stream_answer(
        &self,
        request: ModelRequest,
        on_thought: &mut ThoughtSink<'_>,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let mut stream = open_stream(self.backend.as_ref(), request, cancel).await?;

        let mut answer = String::new();
        while let Some(parts) = next_chunk(&mut stream, cancel).await? {
            for part in parts {
                match part {
                    StreamPart::Thought(text) => on_thought(&text),
                    StreamPart::Answer(text) => answer.push_str(&text),
                    StreamPart::InlineBinary { .. } => {
                        debug!("Ignoring inline payload in enhancement stream")
                    }
                }
            }
        }

        Ok(answer)
    }
}

/// Pull `{magicPrompt, aspectRatio}` out of a generate-mode answer.
///
/// The JSON region spans from the first `{` to the last `}` so prose before
/// and after the object is ignored.
pub fn parse_generate_answer(
    answer: &str,
) -> std::result::Result<(String, AspectRatio), MalformedEnhancement> {
    let region = match (answer.find('{'), answer.rfind('}')) {
        (Some(start), Some(end)) if start < end => &answer[start..=end],
        _ => {
            return Err(MalformedEnhancement(
                "No JSON object found in response".to_string(),
            ))
        }
    };

    let value: Value = serde_json::from_str(region)
        .map_err(|e| MalformedEnhancement(format!("Invalid JSON: {e}")))?;

    let aspect_ratio = match value.get("aspectRatio") {
        None | Some(Value::Null) => AspectRatio::Square,
        Some(Value::String(raw)) if raw.is_empty() => AspectRatio::Square,
        Some(Value::String(raw)) => AspectRatio::resolve(Some(raw.as_str())),
        Some(other) => AspectRatio::resolve(Some(other.to_string().as_str())),
    };

    let magic_prompt = value
        .get("magicPrompt")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|prompt| !prompt.is_empty())
        .ok_or_else(|| {
            MalformedEnhancement("Parsed JSON but magicPrompt is missing".to_string())
        })?;

    Ok((magic_prompt.to_string(), aspect_ratio))
}
