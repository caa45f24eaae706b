//! Generative model endpoint
//!
//! Typed request/response boundary for the text and image models:
//! - `backend`: the `GenerativeBackend` seam and the decoded part types
//! - `client`: REST implementation (SSE for streaming calls)
//! - `messages`: wire payloads

pub mod backend;
pub mod client;
pub mod messages;
pub mod sse;

pub use backend::{GenerativeBackend, InputPart, Modality, ModelRequest, PartStream, StreamPart};
pub use client::GeminiClient;
