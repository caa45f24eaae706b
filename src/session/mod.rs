//! Generation session management
//!
//! One live session moves through four screens:
//! - Home: collecting up to seven pending images
//! - Generating: enhancement phase, then image phase
//! - Display: the last result, which seeds follow-up edits
//! - Error: a failed pipeline, recoverable by resubmitting or resetting

mod orchestrator;
mod pending;
mod snapshot;
mod state;

pub use orchestrator::{EditInput, SessionOrchestrator, Submission};
pub use pending::{PendingImages, MAX_PENDING_IMAGES};
pub use snapshot::{ResultView, SessionSnapshot};
pub use state::{GenerationResult, Phase, SessionEvent, SessionState};
