use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::pending::MAX_PENDING_IMAGES;
use super::state::{GenerationResult, SessionEvent, SessionState};
use crate::config::Config;
use crate::enhance::{EnhanceMode, ImageInputs, PromptEnhancer};
use crate::error::{PipelineError, Result};
use crate::gemini::GenerativeBackend;
use crate::media::MediaBlob;
use crate::synthesis::ImageSynthesizer;

const GENERATE_FAILED: &str = "Failed to generate image.";
const EDIT_WITH_PROMPT_FAILED: &str = "Failed to edit image with prompt.";
const EDIT_FAILED: &str = "Failed to edit image.";
const NO_INPUT_FOR_EDITING: &str = "No input provided for editing.";

/// A request from the home screen
#[derive(Debug, Clone)]
pub enum Submission {
    /// Typed prompt; any images become the base and context of an edit
    Text {
        text: String,
        images: Vec<MediaBlob>,
    },
    /// Recorded voice command
    Voice {
        audio: MediaBlob,
        images: Vec<MediaBlob>,
    },
}

/// Follow-up edit of the displayed result. Audio wins over text, text over
/// images alone.
#[derive(Debug, Clone, Default)]
pub struct EditInput {
    pub audio: Option<MediaBlob>,
    pub text: Option<String>,
    /// Extra context images for this edit
    pub images: Vec<MediaBlob>,
}

enum Instruction {
    Text(String),
    Audio(MediaBlob),
}

struct Plan {
    instruction: Instruction,
    base: Option<MediaBlob>,
    context: Vec<MediaBlob>,
    failure_message: &'static str,
}

struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Owns the live session state and drives enhance -> synthesize pipelines.
///
/// At most one pipeline runs at a time. `reset` cancels the running one; a
/// cancelled pipeline never writes another transition.
pub struct SessionOrchestrator {
    enhancer: PromptEnhancer,
    synthesizer: ImageSynthesizer,
    min_clip_bytes: usize,
    state: Mutex<SessionState>,
    thought: Mutex<String>,
    thought_tx: broadcast::Sender<String>,
    in_flight: AtomicBool,
    cancel: Mutex<Option<CancellationToken>>,
}

impl SessionOrchestrator {
    pub fn new(enhancer: PromptEnhancer, synthesizer: ImageSynthesizer, min_clip_bytes: usize) -> Self {
        let (thought_tx, _) = broadcast::channel(256);
        Self {
            enhancer,
            synthesizer,
            min_clip_bytes,
            state: Mutex::new(SessionState::default()),
            thought: Mutex::new(String::new()),
            thought_tx,
            in_flight: AtomicBool::new(false),
            cancel: Mutex::new(None),
        }
    }

    /// Wire both pipeline stages to one backend using the configured models
    pub fn from_config(backend: Arc<dyn GenerativeBackend>, config: &Config) -> Self {
        Self::new(
            PromptEnhancer::new(backend.clone(), &config.models.text_model),
            ImageSynthesizer::new(backend, &config.models.image_model),
            config.audio.min_clip_bytes,
        )
    }

    pub fn state(&self) -> SessionState {
        self.state.lock().clone()
    }

    /// Accumulated thought text of the current phase
    pub fn thought(&self) -> String {
        self.thought.lock().clone()
    }

    /// Live thought fragments. Lagging receivers drop old fragments.
    pub fn subscribe_thoughts(&self) -> broadcast::Receiver<String> {
        self.thought_tx.subscribe()
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn pending_images(&self) -> Vec<MediaBlob> {
        self.state.lock().pending_images().to_vec()
    }

    /// Append to the pending list (home screen only). Returns the new count.
    pub fn add_images(&self, images: Vec<MediaBlob>) -> usize {
        let mut state = self.state.lock();
        let next = std::mem::take(&mut *state).apply(SessionEvent::ImagesAdded(images));
        *state = next;
        state.pending_images().len()
    }

    pub fn remove_image(&self, index: usize) -> usize {
        let mut state = self.state.lock();
        let next = std::mem::take(&mut *state).apply(SessionEvent::ImageRemoved(index));
        *state = next;
        state.pending_images().len()
    }

    /// Cancel any running pipeline and return to an empty home screen
    pub fn reset(&self) {
        if let Some(token) = self.cancel.lock().take() {
            info!("Cancelling in-flight generation");
            token.cancel();
        }
        self.apply(SessionEvent::Reset);
        self.thought.lock().clear();
    }

    /// Run a fresh submission from the home screen
    pub async fn submit(&self, submission: Submission) -> Result<Arc<GenerationResult>> {
        let _guard = self.begin()?;

        let (instruction, images) = match submission {
            Submission::Text { text, images } => {
                if text.trim().is_empty() && images.is_empty() {
                    return Err(PipelineError::EmptyPrompt);
                }
                (Instruction::Text(text), images)
            }
            Submission::Voice { audio, images } => {
                self.check_audio(&audio)?;
                (Instruction::Audio(audio), images)
            }
        };

        let mut images = cap_images(images).into_iter();
        let base = images.next();
        let failure_message = match (&base, &instruction) {
            (None, _) => GENERATE_FAILED,
            (Some(_), Instruction::Text(_)) => EDIT_WITH_PROMPT_FAILED,
            (Some(_), Instruction::Audio(_)) => EDIT_FAILED,
        };

        self.run(Plan {
            instruction,
            base,
            context: images.collect(),
            failure_message,
        })
        .await
    }

    /// Edit the displayed result
    pub async fn submit_edit(&self, input: EditInput) -> Result<Arc<GenerationResult>> {
        let _guard = self.begin()?;

        let base = self
            .state
            .lock()
            .result()
            .map(|result| result.image.clone())
            .ok_or(PipelineError::NothingToEdit)?;

        let text = input.text.filter(|t| !t.trim().is_empty());
        let instruction = match (input.audio, text) {
            (Some(audio), _) => {
                self.check_audio(&audio)?;
                Instruction::Audio(audio)
            }
            (None, Some(text)) => Instruction::Text(text),
            (None, None) if !input.images.is_empty() => Instruction::Text(String::new()),
            (None, None) => {
                warn!("Edit submitted without audio, text or images");
                self.apply(SessionEvent::Rejected(NO_INPUT_FOR_EDITING.to_string()));
                return Err(PipelineError::NoInputForEditing);
            }
        };

        self.run(Plan {
            instruction,
            base: Some(base),
            context: cap_images(input.images),
            failure_message: EDIT_FAILED,
        })
        .await
    }

    async fn run(&self, plan: Plan) -> Result<Arc<GenerationResult>> {
        let cancel = CancellationToken::new();
        *self.cancel.lock() = Some(cancel.clone());

        self.thought.lock().clear();
        self.apply(SessionEvent::Submitted);

        let outcome = self.execute(&plan, &cancel).await;

        // Only this pipeline can have filled the slot while the guard is held
        self.cancel.lock().take();

        match outcome {
            Ok(result) => {
                if !self.apply_unless_cancelled(&cancel, SessionEvent::Completed(result.clone())) {
                    return Err(PipelineError::Cancelled);
                }
                info!("Generation {} complete", result.id);
                Ok(result)
            }
            Err(PipelineError::Cancelled) => {
                info!("Generation cancelled");
                Err(PipelineError::Cancelled)
            }
            Err(e) => {
                error!("Error during generation: {}", e);
                if !self.apply_unless_cancelled(
                    &cancel,
                    SessionEvent::Failed(plan.failure_message.to_string()),
                ) {
                    return Err(PipelineError::Cancelled);
                }
                Err(e)
            }
        }
    }

    async fn execute(
        &self,
        plan: &Plan,
        cancel: &CancellationToken,
    ) -> Result<Arc<GenerationResult>> {
        let mode = if plan.base.is_some() {
            EnhanceMode::Edit
        } else {
            EnhanceMode::Generate
        };
        let images = ImageInputs::new(plan.base.as_ref(), &plan.context);
        let mut on_thought = |delta: &str| self.push_thought(delta, cancel);

        let enhanced = match &plan.instruction {
            Instruction::Text(text) => {
                self.enhancer
                    .enhance(text, mode, images, &mut on_thought, cancel)
                    .await?
            }
            Instruction::Audio(audio) => {
                self.enhancer
                    .transcribe_then_enhance(audio, mode, images, &mut on_thought, cancel)
                    .await?
            }
        };

        if !self.apply_unless_cancelled(cancel, SessionEvent::EnhancementFinished) {
            return Err(PipelineError::Cancelled);
        }
        self.thought.lock().clear();
        debug!("Enhanced prompt: {}", enhanced.magic_prompt);

        let image = match &plan.base {
            None => {
                self.synthesizer
                    .generate(&enhanced.magic_prompt, enhanced.aspect_ratio, cancel)
                    .await?
            }
            Some(base) => {
                self.synthesizer
                    .edit(&enhanced.magic_prompt, base, &plan.context, cancel)
                    .await?
            }
        };

        Ok(Arc::new(GenerationResult::new(
            enhanced,
            image,
            plan.base.clone(),
        )))
    }

    fn begin(&self) -> Result<InFlightGuard<'_>> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!("Submission rejected: generation already in progress");
            return Err(PipelineError::Busy);
        }
        Ok(InFlightGuard(&self.in_flight))
    }

    fn check_audio(&self, audio: &MediaBlob) -> Result<()> {
        if audio.len() <= self.min_clip_bytes {
            warn!(
                "Audio clip too short ({} bytes), not submitting",
                audio.len()
            );
            return Err(PipelineError::AudioTooShort {
                bytes: audio.len(),
                min: self.min_clip_bytes,
            });
        }
        Ok(())
    }

    /// Dropped once `cancel` fires; reset has already cleared the text
    fn push_thought(&self, delta: &str, cancel: &CancellationToken) {
        let mut thought = self.thought.lock();
        if cancel.is_cancelled() {
            return;
        }
        thought.push_str(delta);
        // No receivers is fine
        let _ = self.thought_tx.send(delta.to_string());
    }

    fn apply(&self, event: SessionEvent) {
        let mut state = self.state.lock();
        let next = std::mem::take(&mut *state).apply(event);
        debug!("Session state -> {}", next.screen());
        *state = next;
    }

    /// Transition only while `cancel` is live. Checked under the state lock
    /// so a concurrent reset cannot interleave.
    fn apply_unless_cancelled(&self, cancel: &CancellationToken, event: SessionEvent) -> bool {
        let mut state = self.state.lock();
        if cancel.is_cancelled() {
            return false;
        }
        let next = std::mem::take(&mut *state).apply(event);
        debug!("Session state -> {}", next.screen());
        *state = next;
        true
    }
}

fn cap_images(mut images: Vec<MediaBlob>) -> Vec<MediaBlob> {
    if images.len() > MAX_PENDING_IMAGES {
        warn!(
            "Dropping {} images over the limit of {}",
            images.len() - MAX_PENDING_IMAGES,
            MAX_PENDING_IMAGES
        );
        images.truncate(MAX_PENDING_IMAGES);
    }
    images
}
