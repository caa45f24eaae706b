use super::state::AppState;
use crate::error::PipelineError;
use crate::media::MediaBlob;
use crate::session::{EditInput, GenerationResult, ResultView, SessionSnapshot, Submission};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

// ============================================================================
// Request/Response Types
// ============================================================================

/// Body of `/session/generate` and `/session/edit`
#[derive(Debug, Default, Deserialize)]
pub struct SubmitRequest {
    pub text: Option<String>,

    /// Recorded voice command; takes precedence over `text`
    pub audio: Option<MediaBlob>,

    /// Images for this request. On generate, omitted means the pending list.
    pub images: Option<Vec<MediaBlob>>,
}

#[derive(Debug, Deserialize)]
pub struct AddImagesRequest {
    pub images: Vec<MediaBlob>,
}

#[derive(Debug, Serialize)]
pub struct PendingImagesResponse {
    pub pending_images: usize,
}

#[derive(Debug, Serialize)]
pub struct ThoughtResponse {
    pub thought: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

fn pipeline_error_response(err: PipelineError) -> Response {
    let status = match &err {
        PipelineError::Busy | PipelineError::Cancelled => StatusCode::CONFLICT,
        e if e.is_precondition() => StatusCode::UNPROCESSABLE_ENTITY,
        _ => StatusCode::BAD_GATEWAY,
    };
    error_response(status, err.to_string())
}

fn result_response(
    outcome: Result<crate::error::Result<Arc<GenerationResult>>, tokio::task::JoinError>,
) -> Response {
    match outcome {
        Ok(Ok(result)) => (StatusCode::OK, Json(ResultView::from(result.as_ref()))).into_response(),
        Ok(Err(e)) => pipeline_error_response(e),
        Err(e) => {
            error!("Pipeline task failed: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Pipeline task failed")
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /session
pub async fn get_session(State(state): State<AppState>) -> impl IntoResponse {
    let orchestrator = &state.orchestrator;
    Json(SessionSnapshot::capture(
        &orchestrator.state(),
        orchestrator.thought(),
    ))
}

/// GET /session/thought
pub async fn get_thought(State(state): State<AppState>) -> impl IntoResponse {
    Json(ThoughtResponse {
        thought: state.orchestrator.thought(),
    })
}

/// POST /session/images
/// Append to the pending list; only accepted on the home screen
pub async fn add_images(
    State(state): State<AppState>,
    Json(req): Json<AddImagesRequest>,
) -> Response {
    let current = state.orchestrator.state();
    if current.screen() != "home" {
        return error_response(
            StatusCode::CONFLICT,
            format!("Images can only be added on the home screen (now {})", current.screen()),
        );
    }

    let pending_images = state.orchestrator.add_images(req.images);
    info!("{} pending images", pending_images);
    (StatusCode::OK, Json(PendingImagesResponse { pending_images })).into_response()
}

/// DELETE /session/images/:index
pub async fn remove_image(
    State(state): State<AppState>,
    Path(index): Path<usize>,
) -> impl IntoResponse {
    let pending_images = state.orchestrator.remove_image(index);
    Json(PendingImagesResponse { pending_images })
}

/// POST /session/generate
/// Run a fresh submission. The pipeline runs on its own task so a dropped
/// connection cannot strand the session mid-generation.
pub async fn generate(State(state): State<AppState>, Json(req): Json<SubmitRequest>) -> Response {
    let orchestrator = state.orchestrator.clone();
    let images = req
        .images
        .unwrap_or_else(|| orchestrator.pending_images());

    let submission = match req.audio {
        Some(audio) => Submission::Voice { audio, images },
        None => Submission::Text {
            text: req.text.unwrap_or_default(),
            images,
        },
    };

    info!("Generate requested");
    let outcome = tokio::spawn(async move { orchestrator.submit(submission).await }).await;
    result_response(outcome)
}

/// POST /session/edit
/// Edit the displayed result
pub async fn edit(State(state): State<AppState>, Json(req): Json<SubmitRequest>) -> Response {
    let orchestrator = state.orchestrator.clone();
    let input = EditInput {
        audio: req.audio,
        text: req.text,
        images: req.images.unwrap_or_default(),
    };

    info!("Edit requested");
    let outcome = tokio::spawn(async move { orchestrator.submit_edit(input).await }).await;
    result_response(outcome)
}

/// POST /session/reset
/// Cancel any running pipeline and return home
pub async fn reset(State(state): State<AppState>) -> impl IntoResponse {
    state.orchestrator.reset();
    Json(SessionSnapshot::capture(
        &state.orchestrator.state(),
        state.orchestrator.thought(),
    ))
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
