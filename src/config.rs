use anyhow::{bail, Result};
use serde::Deserialize;

/// Environment variables checked, in order, for the model API credential
pub const API_KEY_VARS: [&str; 2] = ["API_KEY", "GEMINI_API_KEY"];

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub models: ModelsConfig,
    pub audio: AudioConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelsConfig {
    pub base_url: String,
    /// Model used for transcription and prompt enhancement
    pub text_model: String,
    /// Model used for image generation and editing
    pub image_model: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub channels: u16,
    /// Recordings smaller than this are treated as empty and never submitted
    pub min_clip_bytes: usize,
}

impl Config {
    /// Load configuration: built-in defaults, then the (optional) file at
    /// `path`, then `VOICE_CANVAS__SECTION__KEY` environment overrides.
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .set_default("service.name", "voice-canvas")?
            .set_default("service.http.bind", "127.0.0.1")?
            .set_default("service.http.port", 8787)?
            .set_default(
                "models.base_url",
                "https://generativelanguage.googleapis.com/v1beta",
            )?
            .set_default("models.text_model", "gemini-2.5-flash")?
            .set_default("models.image_model", "gemini-2.5-flash-image")?
            .set_default("audio.sample_rate", 16000)?
            .set_default("audio.channels", 1)?
            .set_default("audio.min_clip_bytes", 1000)?
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("VOICE_CANVAS").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// The model API credential. Its absence is fatal at startup.
    pub fn api_key() -> Result<String> {
        for var in API_KEY_VARS {
            if let Ok(value) = std::env::var(var) {
                if !value.trim().is_empty() {
                    return Ok(value.trim().to_string());
                }
            }
        }

        bail!(
            "{} environment variable not set",
            API_KEY_VARS.join(" or ")
        )
    }
}
