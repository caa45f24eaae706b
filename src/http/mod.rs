//! HTTP API server for driving the session from another process
//!
//! - GET /health - Health check
//! - GET /session - Session snapshot
//! - GET /session/thought - Accumulated thought text
//! - POST /session/images, DELETE /session/images/:index - Pending images
//! - POST /session/generate - Fresh submission
//! - POST /session/edit - Edit the displayed result
//! - POST /session/reset - Cancel and return home

mod handlers;
mod routes;
mod state;

pub use handlers::{ErrorResponse, SubmitRequest};
pub use routes::create_router;
pub use state::AppState;
