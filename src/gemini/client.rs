use anyhow::{bail, Context, Result};
use futures::stream::{self, Stream, StreamExt};
use reqwest::{Client, Response};
use std::collections::VecDeque;
use tracing::{debug, info};

use super::backend::{GenerativeBackend, ModelRequest, PartStream, StreamPart};
use super::messages::{ErrorWrapper, GenerateContentRequest, GenerateContentResponse};
use super::sse::SseDecoder;

/// Client for the Gemini REST API
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self, model: &str, method: &str) -> String {
        format!("{}/models/{}:{}", self.base_url, model, method)
    }

    async fn post(&self, url: &str, request: &ModelRequest) -> Result<Response> {
        let body = GenerateContentRequest::from(request);

        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("Request to model {} failed", request.model))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            let message = serde_json::from_str::<ErrorWrapper>(&body)
                .ok()
                .and_then(|wrapper| {
                    let msg = wrapper.error.message?;
                    Some(match wrapper.error.status {
                        Some(status_text) if !status_text.is_empty() => {
                            format!("{status_text}: {msg}")
                        }
                        _ => msg,
                    })
                })
                .unwrap_or(body);
            bail!("Model API error ({}): {}", status.as_u16(), message);
        }

        Ok(response)
    }
}

#[async_trait::async_trait]
impl GenerativeBackend for GeminiClient {
    async fn stream_generate(&self, request: ModelRequest) -> Result<PartStream> {
        let url = format!(
            "{}?alt=sse",
            self.endpoint(&request.model, "streamGenerateContent")
        );

        info!(
            "Streaming from {} ({} parts, thoughts={})",
            request.model,
            request.parts.len(),
            request.include_thoughts
        );

        let response = self.post(&url, &request).await?;
        Ok(sse_part_stream(response.bytes_stream().boxed()))
    }

    async fn generate(&self, request: ModelRequest) -> Result<String> {
        let url = self.endpoint(&request.model, "generateContent");

        info!("Calling {} ({} parts)", request.model, request.parts.len());

        let response: GenerateContentResponse = self
            .post(&url, &request)
            .await?
            .json()
            .await
            .context("Failed to parse model response")?;

        let text = response
            .into_parts()?
            .into_iter()
            .filter_map(|part| match part {
                StreamPart::Answer(text) => Some(text),
                _ => None,
            })
            .collect::<String>();

        Ok(text)
    }

    fn name(&self) -> &str {
        "Gemini REST"
    }
}

/// State carried between polls of the decoded stream
struct SseState<S> {
    bytes: S,
    decoder: SseDecoder,
    pending: VecDeque<String>,
    exhausted: bool,
}

/// Turn a raw SSE byte stream into a stream of decoded chunks
pub fn sse_part_stream<S, B, E>(bytes: S) -> PartStream
where
    S: Stream<Item = std::result::Result<B, E>> + Send + Unpin + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: std::error::Error + Send + Sync + 'static,
{
    let state = SseState {
        bytes,
        decoder: SseDecoder::new(),
        pending: VecDeque::new(),
        exhausted: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(payload) = state.pending.pop_front() {
                return Some((decode_chunk(&payload), state));
            }
            if state.exhausted {
                return None;
            }

            match state.bytes.next().await {
                Some(Ok(chunk)) => {
                    let payloads = state.decoder.push(chunk.as_ref());
                    state.pending.extend(payloads);
                }
                Some(Err(e)) => {
                    state.exhausted = true;
                    let err = anyhow::Error::new(e).context("Failed to read response stream");
                    return Some((Err(err), state));
                }
                None => {
                    state.exhausted = true;
                    state.pending.extend(state.decoder.finish());
                }
            }
        }
    })
    .boxed()
}

fn decode_chunk(payload: &str) -> Result<Vec<StreamPart>> {
    let chunk: GenerateContentResponse =
        serde_json::from_str(payload).context("Failed to parse stream chunk")?;
    let parts = chunk.into_parts()?;
    debug!("Decoded stream chunk with {} parts", parts.len());
    Ok(parts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn decodes_chunks_split_across_network_reads() {
        let reads: Vec<std::result::Result<Vec<u8>, std::io::Error>> = vec![
            Ok(b"data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"hm\",".to_vec()),
            Ok(b"\"thought\":true}]}}]}\r\n\r\n".to_vec()),
            Ok(b"data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"ok\"}]}}]}".to_vec()),
        ];

        let chunks: Vec<Vec<StreamPart>> = sse_part_stream(stream::iter(reads))
            .map(|chunk| chunk.unwrap())
            .collect()
            .await;

        assert_eq!(
            chunks,
            vec![
                vec![StreamPart::Thought("hm".to_string())],
                vec![StreamPart::Answer("ok".to_string())],
            ]
        );
    }

    #[tokio::test]
    async fn transport_error_ends_the_stream() {
        let reads: Vec<std::result::Result<Vec<u8>, std::io::Error>> = vec![
            Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset")),
            Ok(b"data: {}\n".to_vec()),
        ];

        let chunks: Vec<Result<Vec<StreamPart>>> = sse_part_stream(stream::iter(reads)).collect().await;

        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].is_err());
    }
}
