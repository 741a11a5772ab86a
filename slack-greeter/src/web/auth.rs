//! Slack request authentication middleware.
//!
//! Runs before the event handler on every request to the events route:
//! 1. Buffer the body once
//! 2. Check both signing headers, timestamp freshness and the signature
//! 3. Rebuild the request from the buffered bytes and forward it
//!
//! Any failure ends the request with 401 before the handler runs.

use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, error};

use super::handlers::AppState;
use super::signature::{authenticate, now_epoch_secs, InboundRequest, VerificationResult};

/// Largest request body accepted for signing.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Middleware verifying the Slack signature of each request.
///
/// # Usage
///
/// ```ignore
/// Router::new()
///     .route("/events/", post(slack_events))
///     .route_layer(axum::middleware::from_fn_with_state(state, verify_slack_request))
/// ```
pub async fn verify_slack_request(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let (parts, body) = request.into_parts();

    let bytes = match to_bytes(body, MAX_BODY_BYTES).await {
        Ok(b) => b,
        Err(e) => {
            error!(error = %e, uri = %parts.uri, "slack_request_body_unreadable");
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    let inbound = InboundRequest::capture(&parts.headers, bytes);

    match authenticate(&state.config.signing, &inbound, now_epoch_secs()) {
        VerificationResult::Verified => {
            debug!(body_length = inbound.body.len(), "slack_request_verified");
        }
        VerificationResult::Rejected(reason) => {
            error!(
                reason = %reason,
                uri = %parts.uri,
                has_signature = inbound.signature.is_some(),
                has_timestamp = inbound.timestamp.is_some(),
                "slack_request_rejected"
            );
            return StatusCode::UNAUTHORIZED.into_response();
        }
    }

    let request = Request::from_parts(parts, Body::from(inbound.body));
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::Request as HttpRequest;
    use axum::{body::Bytes, middleware, routing::post, Router};
    use tower::ServiceExt;

    use super::*;
    use crate::slack::{SlackApi, SlackError, SlackUser};
    use crate::web::signature::{compute_signature, SIGNATURE_HEADER, TIMESTAMP_HEADER};
    use crate::Config;

    struct NoSlack;

    #[async_trait::async_trait]
    impl SlackApi for NoSlack {
        async fn users_info(&self, _user_id: &str) -> Result<SlackUser, SlackError> {
            unreachable!("middleware tests never call Slack")
        }

        async fn send_message(&self, _channel: &str, _text: &str) -> Result<(), SlackError> {
            unreachable!("middleware tests never call Slack")
        }
    }

    fn state() -> AppState {
        let config = Config::from_vars(vec![
            ("SLACK_SIGNING_SECRET".to_string(), "secret".to_string()),
            ("SLACK_TOKEN".to_string(), "xoxb-test".to_string()),
        ])
        .unwrap();
        AppState::new(config, Arc::new(NoSlack))
    }

    // Echoes the body it receives, to prove the middleware forwards it intact.
    fn echo_app() -> Router {
        let state = state();
        Router::new()
            .route("/echo", post(|body: Bytes| async move { body }))
            .route_layer(middleware::from_fn_with_state(state.clone(), verify_slack_request))
            .with_state(state)
    }

    fn now() -> String {
        (now_epoch_secs() as u64).to_string()
    }

    #[tokio::test]
    async fn test_forwards_original_body() {
        let body = "{ \"type\" : \"url_verification\",\n  \"x\": 1 }";
        let ts = now();
        let sig = compute_signature(b"secret", "v0", &ts, body.as_bytes()).unwrap();

        let response = echo_app()
            .oneshot(
                HttpRequest::post("/echo")
                    .header(SIGNATURE_HEADER, sig)
                    .header(TIMESTAMP_HEADER, ts)
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let echoed = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&echoed[..], body.as_bytes());
    }

    #[tokio::test]
    async fn test_rejects_missing_headers() {
        let response = echo_app()
            .oneshot(HttpRequest::post("/echo").body(Body::from("{}")).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_rejects_stale_timestamp() {
        let ts = ((now_epoch_secs() as u64) - 301).to_string();
        let sig = compute_signature(b"secret", "v0", &ts, b"{}").unwrap();

        let response = echo_app()
            .oneshot(
                HttpRequest::post("/echo")
                    .header(SIGNATURE_HEADER, sig)
                    .header(TIMESTAMP_HEADER, ts)
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_rejects_oversized_body() {
        let response = echo_app()
            .oneshot(
                HttpRequest::post("/echo")
                    .header(SIGNATURE_HEADER, "v0=00")
                    .header(TIMESTAMP_HEADER, now())
                    .body(Body::from(vec![b'a'; MAX_BODY_BYTES + 1]))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
