//! HTTP endpoint handlers.
//!
//! The events handler only runs after [`verify_slack_request`](super::auth::verify_slack_request)
//! has authenticated the request, so it can trust the body it receives.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{error, info};

use super::error::ApiError;
use crate::slack::{dispatch, parse_event, Outcome, SlackApi};
use crate::Config;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub slack: Arc<dyn SlackApi>,
}

impl AppState {
    pub fn new(config: Config, slack: Arc<dyn SlackApi>) -> Self {
        Self {
            config: Arc::new(config),
            slack,
        }
    }
}

// =============================================================================
// Health Check
// =============================================================================

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// =============================================================================
// Slack Events
// =============================================================================

/// Response to a url_verification request.
#[derive(Serialize)]
pub struct ChallengeResponse {
    pub challenge: String,
}

/// Response to a handled event callback.
#[derive(Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// Slack Events API endpoint.
///
/// This endpoint:
/// 1. Decodes the envelope from the already-verified body
/// 2. Answers url_verification directly
/// 3. Runs the handler for recognized event callbacks
pub async fn slack_events(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let event = parse_event(&body).map_err(|e| {
        error!(error = %e, body_length = body.len(), "slack_event_invalid");
        ApiError::from(e)
    })?;

    let outcome = dispatch(state.slack.as_ref(), event).await.map_err(|e| {
        error!(error = %e, "slack_event_handler_failed");
        ApiError::from(e)
    })?;

    match outcome {
        Outcome::Challenge(challenge) => {
            info!("slack_url_verification_answered");
            Ok(Json(ChallengeResponse { challenge }).into_response())
        }
        Outcome::Handled => Ok(Json(MessageResponse { message: "ok" }).into_response()),
    }
}
