use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::state::{GenerationResult, Phase, SessionState};
use crate::enhance::AspectRatio;

/// Serializable view of the session, as reported to API clients
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    /// One of `home`, `generating`, `display`, `error`
    pub screen: &'static str,

    /// Set while generating
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<Phase>,

    pub pending_images: usize,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ResultView>,

    /// Set in the error screen
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Accumulated thought text of the running phase
    pub thought: String,
}

/// A generation result with its images inlined as data URIs
#[derive(Debug, Clone, Serialize)]
pub struct ResultView {
    pub id: Uuid,
    pub original_prompt: String,
    pub enhanced_prompt: String,
    pub aspect_ratio: AspectRatio,
    pub image: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_image: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&GenerationResult> for ResultView {
    fn from(result: &GenerationResult) -> Self {
        Self {
            id: result.id,
            original_prompt: result.original_prompt.clone(),
            enhanced_prompt: result.enhanced_prompt.clone(),
            aspect_ratio: result.aspect_ratio,
            image: result.image.to_data_uri(),
            base_image: result.base_image.as_ref().map(|b| b.to_data_uri()),
            created_at: result.created_at,
        }
    }
}

impl SessionSnapshot {
    pub fn capture(state: &SessionState, thought: String) -> Self {
        let (phase, result, message) = match state {
            SessionState::Home { .. } => (None, None, None),
            SessionState::Generating { phase } => (Some(*phase), None, None),
            SessionState::Display { result } => (None, Some(ResultView::from(result.as_ref())), None),
            SessionState::Error { message } => (None, None, Some(message.clone())),
        };

        Self {
            screen: state.screen(),
            phase,
            pending_images: state.pending_images().len(),
            result,
            message,
            thought,
        }
    }
}
