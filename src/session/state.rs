use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use super::pending::PendingImages;
use crate::enhance::{AspectRatio, EnhancedPrompt};
use crate::media::MediaBlob;

/// Which remote call a generating session is waiting on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Enhance,
    Image,
}

/// A finished generation; seeds the next edit cycle
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationResult {
    pub id: Uuid,
    pub original_prompt: String,
    pub enhanced_prompt: String,
    pub aspect_ratio: AspectRatio,
    pub image: MediaBlob,
    /// The image that was edited, if this was an edit
    pub base_image: Option<MediaBlob>,
    pub created_at: DateTime<Utc>,
}

impl GenerationResult {
    pub fn new(enhanced: EnhancedPrompt, image: MediaBlob, base_image: Option<MediaBlob>) -> Self {
        Self {
            id: Uuid::new_v4(),
            original_prompt: enhanced.original_prompt,
            enhanced_prompt: enhanced.magic_prompt,
            aspect_ratio: enhanced.aspect_ratio,
            image,
            base_image,
            created_at: Utc::now(),
        }
    }
}

/// The one live session state. Replaced wholesale on every transition.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Home { images: PendingImages },
    Generating { phase: Phase },
    Display { result: Arc<GenerationResult> },
    Error { message: String },
}

impl Default for SessionState {
    fn default() -> Self {
        SessionState::Home {
            images: PendingImages::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum SessionEvent {
    ImagesAdded(Vec<MediaBlob>),
    ImageRemoved(usize),
    /// A submission passed its preconditions; enhancement starts
    Submitted,
    EnhancementFinished,
    Completed(Arc<GenerationResult>),
    /// A remote call failed mid-pipeline
    Failed(String),
    /// A submission was refused before any remote call
    Rejected(String),
    Reset,
}

impl SessionState {
    /// Pure transition function. Pairs without a defined transition leave
    /// the state unchanged.
    pub fn apply(self, event: SessionEvent) -> SessionState {
        use SessionEvent as E;
        use SessionState as S;

        match (self, event) {
            (_, E::Reset) => S::default(),

            (S::Home { mut images }, E::ImagesAdded(added)) => {
                images.extend(added);
                S::Home { images }
            }
            (S::Home { mut images }, E::ImageRemoved(index)) => {
                images.remove(index);
                S::Home { images }
            }

            (S::Home { .. } | S::Display { .. } | S::Error { .. }, E::Submitted) => S::Generating {
                phase: Phase::Enhance,
            },
            (S::Home { .. } | S::Display { .. }, E::Rejected(message)) => S::Error { message },

            (
                S::Generating {
                    phase: Phase::Enhance,
                },
                E::EnhancementFinished,
            ) => S::Generating {
                phase: Phase::Image,
            },
            (
                S::Generating {
                    phase: Phase::Image,
                },
                E::Completed(result),
            ) => S::Display { result },
            (S::Generating { .. }, E::Failed(message)) => S::Error { message },

            (state, event) => {
                debug!("Ignoring {:?} in {} state", event, state.screen());
                state
            }
        }
    }

    pub fn screen(&self) -> &'static str {
        match self {
            SessionState::Home { .. } => "home",
            SessionState::Generating { .. } => "generating",
            SessionState::Display { .. } => "display",
            SessionState::Error { .. } => "error",
        }
    }

    pub fn is_generating(&self) -> bool {
        matches!(self, SessionState::Generating { .. })
    }

    pub fn pending_images(&self) -> &[MediaBlob] {
        match self {
            SessionState::Home { images } => images.as_slice(),
            _ => &[],
        }
    }

    pub fn result(&self) -> Option<&Arc<GenerationResult>> {
        match self {
            SessionState::Display { result } => Some(result),
            _ => None,
        }
    }
}
