use anyhow::{Context, Result};
use base64::Engine;
use image::ImageFormat;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Fallback for image payloads that arrive without a MIME type
pub const DEFAULT_IMAGE_MIME: &str = "image/png";

/// A binary payload tagged with its MIME type (images, audio)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaBlob {
    pub mime_type: String,
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
}

impl MediaBlob {
    pub fn new(mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data,
        }
    }

    /// Load an image from disk, detecting its type from the file header
    pub fn load_image(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path)
            .with_context(|| format!("Failed to read image file: {}", path.display()))?;
        let mime_type = detect_image_mime(&data).unwrap_or(DEFAULT_IMAGE_MIME);

        info!(
            "Loaded image {} ({}, {} bytes)",
            path.display(),
            mime_type,
            data.len()
        );

        Ok(Self::new(mime_type, data))
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.data)
    }

    /// `data:<mime>;base64,<payload>` for the presentation layer
    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.to_base64())
    }

    /// Preferred file extension for writing this blob to disk
    pub fn extension(&self) -> &'static str {
        if let Some(ext) = ImageFormat::from_mime_type(&self.mime_type)
            .and_then(|format| format.extensions_str().first().copied())
        {
            return ext;
        }
        mime_guess::get_mime_extensions_str(&self.mime_type)
            .and_then(|exts| exts.first().copied())
            .unwrap_or("png")
    }
}

/// Detect the image format from the file header
pub fn detect_image_mime(data: &[u8]) -> Option<&'static str> {
    image::guess_format(data)
        .ok()
        .map(|format| format.to_mime_type())
}

mod base64_bytes {
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&base64::engine::general_purpose::STANDARD.encode(data))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        base64::engine::general_purpose::STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}
