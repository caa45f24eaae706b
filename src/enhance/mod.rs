//! Prompt enhancement
//!
//! Expands a raw spoken or typed request into a detailed "magic prompt" with
//! the text model, surfacing the model's thoughts live while it works.

pub mod aspect;
mod enhancer;
pub mod prompts;

pub use aspect::AspectRatio;
pub use enhancer::{
    parse_generate_answer, EnhanceMode, EnhancedPrompt, ImageInputs, MalformedEnhancement,
    PromptEnhancer, ThoughtSink, DEFAULT_AUDIO_MIME,
};
