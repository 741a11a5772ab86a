//! Request-level error responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::slack::{EventError, SlackError};

/// Failure of an authenticated event request.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Payload did not decode into a recognized event.
    #[error(transparent)]
    Event(#[from] EventError),

    /// An outbound Slack call failed.
    #[error(transparent)]
    Slack(#[from] SlackError),
}

/// Error body: `{"detail": "..."}`.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub detail: String,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Event(_) => StatusCode::BAD_REQUEST,
            ApiError::Slack(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            detail: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let err = ApiError::from(EventError::UnhandledType("x".to_string()));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

        let err = ApiError::from(SlackError::UnknownChannel {
            channel: "C9".to_string(),
        });
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        assert!(err.to_string().contains("SLACK_WEBHOOK_C9"));
    }
}
