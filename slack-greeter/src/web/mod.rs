//! Web server module for receiving Slack Events API webhooks.
//!
//! This module provides:
//! - Signature and replay verification for every event request
//! - The events endpoint and an unauthenticated health check
//! - The router tying them together

pub mod auth;
pub mod error;
pub mod handlers;
pub mod signature;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

pub use auth::{verify_slack_request, MAX_BODY_BYTES};
pub use error::{ApiError, ErrorResponse};
pub use handlers::{health, slack_events, AppState, ChallengeResponse, HealthResponse, MessageResponse};
pub use signature::{
    authenticate, compute_signature, is_fresh, verify_slack_signature, InboundRequest,
    RejectReason, SigningContext, VerificationResult, REPLAY_WINDOW, SIGNATURE_HEADER,
    SIGNATURE_VERSION, TIMESTAMP_HEADER,
};

/// Build the application router.
///
/// Only the events routes sit behind the signature middleware.
pub fn router(state: AppState) -> Router {
    let events = Router::new()
        .route("/events/", post(slack_events))
        .route("/events", post(slack_events))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            verify_slack_request,
        ));

    Router::new()
        .route("/health", get(health))
        .merge(events)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
