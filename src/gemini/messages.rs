use anyhow::{Context, Result};
use base64::Engine;
use serde::{Deserialize, Serialize};

use super::backend::{InputPart, ModelRequest, StreamPart};

/// Request body for `generateContent` / `streamGenerateContent`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
pub struct Content {
    pub role: String,
    pub parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineDataPayload,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineDataPayload {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thinking_config: Option<ThinkingConfig>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub response_modalities: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThinkingConfig {
    pub include_thoughts: bool,
}

impl From<&ModelRequest> for GenerateContentRequest {
    fn from(request: &ModelRequest) -> Self {
        let parts = request
            .parts
            .iter()
            .map(|part| match part {
                InputPart::Text(text) => Part::Text { text: text.clone() },
                InputPart::Inline(blob) => Part::InlineData {
                    inline_data: InlineDataPayload {
                        mime_type: blob.mime_type.clone(),
                        data: blob.to_base64(),
                    },
                },
            })
            .collect();

        let generation_config = if request.include_thoughts || !request.response_modalities.is_empty()
        {
            Some(GenerationConfig {
                thinking_config: request.include_thoughts.then_some(ThinkingConfig {
                    include_thoughts: true,
                }),
                response_modalities: request
                    .response_modalities
                    .iter()
                    .map(|m| m.as_str().to_string())
                    .collect(),
            })
        } else {
            None
        };

        Self {
            contents: vec![Content {
                role: "user".to_string(),
                parts,
            }],
            generation_config,
        }
    }
}

/// One response (or one streamed chunk)
#[derive(Debug, Deserialize)]
pub struct GenerateContentResponse {
    pub candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    pub content: Option<ContentResponse>,
}

#[derive(Debug, Deserialize)]
pub struct ContentResponse {
    pub parts: Option<Vec<PartResponse>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartResponse {
    pub text: Option<String>,
    pub thought: Option<bool>,
    pub inline_data: Option<InlineDataResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineDataResponse {
    pub mime_type: Option<String>,
    pub data: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ErrorWrapper {
    pub error: ErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub message: Option<String>,
    pub status: Option<String>,
}

impl GenerateContentResponse {
    /// Decode the first candidate's parts into typed stream parts.
    ///
    /// Inline payloads without data and empty texts are skipped.
    pub fn into_parts(self) -> Result<Vec<StreamPart>> {
        let parts = self
            .candidates
            .and_then(|candidates| candidates.into_iter().next())
            .and_then(|candidate| candidate.content)
            .and_then(|content| content.parts)
            .unwrap_or_default();

        let mut decoded = Vec::with_capacity(parts.len());
        for part in parts {
            if let Some(inline) = part.inline_data {
                if let Some(data) = inline.data.filter(|d| !d.is_empty()) {
                    let bytes = base64::engine::general_purpose::STANDARD
                        .decode(data.as_bytes())
                        .context("Failed to decode inline data payload")?;
                    decoded.push(StreamPart::InlineBinary {
                        mime_type: inline.mime_type,
                        data: bytes,
                    });
                }
                continue;
            }

            match part.text {
                Some(text) if !text.is_empty() => {
                    if part.thought.unwrap_or(false) {
                        decoded.push(StreamPart::Thought(text));
                    } else {
                        decoded.push(StreamPart::Answer(text));
                    }
                }
                _ => {}
            }
        }

        Ok(decoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gemini::backend::Modality;
    use crate::media::MediaBlob;

    #[test]
    fn decodes_thought_answer_and_inline_parts() {
        let json = r#"{
            "candidates": [{
                "content": {
                    "parts": [
                        { "text": "thinking...", "thought": true },
                        { "text": "answer" },
                        { "inlineData": { "mimeType": "image/png", "data": "AQID" } },
                        { "inlineData": { "mimeType": "image/png" } }
                    ]
                }
            }]
        }"#;

        let response: GenerateContentResponse = serde_json::from_str(json).unwrap();
        let parts = response.into_parts().unwrap();

        assert_eq!(
            parts,
            vec![
                StreamPart::Thought("thinking...".to_string()),
                StreamPart::Answer("answer".to_string()),
                StreamPart::InlineBinary {
                    mime_type: Some("image/png".to_string()),
                    data: vec![1, 2, 3],
                },
            ]
        );
    }

    #[test]
    fn missing_candidates_decode_to_no_parts() {
        let response: GenerateContentResponse = serde_json::from_str("{}").unwrap();
        assert!(response.into_parts().unwrap().is_empty());
    }

    #[test]
    fn request_body_matches_wire_shape() {
        let request = ModelRequest::new(
            "gemini-2.5-flash-image",
            vec![
                InputPart::Inline(MediaBlob::new("image/png", vec![1, 2, 3])),
                InputPart::Text("make it blue".to_string()),
            ],
        )
        .with_modalities(&[Modality::Image, Modality::Text]);

        let body = serde_json::to_value(GenerateContentRequest::from(&request)).unwrap();

        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][0]["inlineData"]["mimeType"], "image/png");
        assert_eq!(body["contents"][0]["parts"][0]["inlineData"]["data"], "AQID");
        assert_eq!(body["contents"][0]["parts"][1]["text"], "make it blue");
        assert_eq!(
            body["generationConfig"]["responseModalities"],
            serde_json::json!(["IMAGE", "TEXT"])
        );
        assert!(body["generationConfig"].get("thinkingConfig").is_none());
    }

    #[test]
    fn thinking_config_only_when_requested() {
        let plain = ModelRequest::new("gemini-2.5-flash", vec![InputPart::Text("hi".into())]);
        let body = serde_json::to_value(GenerateContentRequest::from(&plain)).unwrap();
        assert!(body.get("generationConfig").is_none());

        let thinking = plain.with_thoughts();
        let body = serde_json::to_value(GenerateContentRequest::from(&thinking)).unwrap();
        assert_eq!(body["generationConfig"]["thinkingConfig"]["includeThoughts"], true);
    }
}
