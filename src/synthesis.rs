use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::enhance::AspectRatio;
use crate::error::{PipelineError, Result};
use crate::gemini::{GenerativeBackend, InputPart, Modality, ModelRequest, StreamPart};
use crate::media::{MediaBlob, DEFAULT_IMAGE_MIME};
use crate::stream::{next_chunk, open_stream};

/// Sends enhanced prompts to the image model and collects the image
#[derive(Clone)]
pub struct ImageSynthesizer {
    backend: Arc<dyn GenerativeBackend>,
    model: String,
}

impl ImageSynthesizer {
    pub fn new(backend: Arc<dyn GenerativeBackend>, model: impl Into<String>) -> Self {
        Self {
            backend,
            model: model.into(),
        }
    }

    /// Generate a fresh image. The model has no aspect-ratio parameter, so
    /// the ratio is requested in the prompt text.
    pub async fn generate(
        &self,
        prompt: &str,
        aspect_ratio: AspectRatio,
        cancel: &CancellationToken,
    ) -> Result<MediaBlob> {
        let full_prompt = with_aspect_hint(prompt, aspect_ratio);

        info!("Generating image ({})", aspect_ratio);

        self.stream_image(vec![InputPart::Text(full_prompt)], cancel)
            .await
    }

    /// Edit `base_image`; image parts precede the prompt text
    pub async fn edit(
        &self,
        prompt: &str,
        base_image: &MediaBlob,
        context_images: &[MediaBlob],
        cancel: &CancellationToken,
    ) -> Result<MediaBlob> {
        let mut parts = Vec::with_capacity(context_images.len() + 2);
        parts.push(InputPart::Inline(base_image.clone()));
        parts.extend(context_images.iter().cloned().map(InputPart::Inline));
        parts.push(InputPart::Text(prompt.to_string()));

        info!("Editing image ({} context images)", context_images.len());

        self.stream_image(parts, cancel).await
    }

    /// Scan every chunk and keep the last inline payload seen
    async fn stream_image(
        &self,
        parts: Vec<InputPart>,
        cancel: &CancellationToken,
    ) -> Result<MediaBlob> {
        let request = ModelRequest::new(&self.model, parts)
            .with_modalities(&[Modality::Image, Modality::Text]);
        let mut stream = open_stream(self.backend.as_ref(), request, cancel).await?;

        let mut last_image = None;
        while let Some(chunk) = next_chunk(&mut stream, cancel).await? {
            for part in chunk {
                match part {
                    StreamPart::InlineBinary { mime_type, data } => {
                        last_image = Some(MediaBlob::new(
                            mime_type.unwrap_or_else(|| DEFAULT_IMAGE_MIME.to_string()),
                            data,
                        ));
                    }
                    StreamPart::Answer(text) | StreamPart::Thought(text) => {
                        debug!("Image stream text: {}", text)
                    }
                }
            }
        }

        match last_image {
            Some(image) => {
                info!("Received image ({}, {} bytes)", image.mime_type, image.len());
                Ok(image)
            }
            None => {
                error!("Image stream ended without image data");
                Err(PipelineError::NoImageReturned)
            }
        }
    }
}

pub fn with_aspect_hint(prompt: &str, aspect_ratio: AspectRatio) -> String {
    format!("{prompt} The desired aspect ratio is {aspect_ratio}.")
}
