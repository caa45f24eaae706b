pub mod audio;
pub mod config;
pub mod enhance;
pub mod error;
pub mod gemini;
pub mod http;
pub mod media;
pub mod session;
pub mod stream;
pub mod synthesis;

pub use audio::{AudioFile, AudioFrame, AudioRecorder, CaptureConfig, CaptureDevice, MicrophoneDevice};
pub use config::Config;
pub use enhance::{AspectRatio, EnhanceMode, EnhancedPrompt, PromptEnhancer};
pub use error::{CaptureError, PipelineError};
pub use gemini::{GeminiClient, GenerativeBackend};
pub use http::{create_router, AppState};
pub use media::MediaBlob;
pub use session::{
    EditInput, GenerationResult, Phase, SessionOrchestrator, SessionSnapshot, SessionState,
    Submission,
};
pub use synthesis::ImageSynthesizer;
