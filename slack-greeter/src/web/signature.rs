//! Slack request signature verification.
//!
//! Slack signs every Events API request using HMAC-SHA256 over
//! `v0:{timestamp}:{body}` keyed with the app's signing secret.
//! Reference: https://api.slack.com/authentication/verifying-requests-from-slack

use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::body::Bytes;
use axum::http::HeaderMap;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;
use tracing::warn;

type HmacSha256 = Hmac<Sha256>;

/// Version tag prefixed to both the basestring and the signature.
pub const SIGNATURE_VERSION: &str = "v0";

/// Maximum clock skew accepted between the request timestamp and now.
pub const REPLAY_WINDOW: Duration = Duration::from_secs(300);

pub const SIGNATURE_HEADER: &str = "X-Slack-Signature";
pub const TIMESTAMP_HEADER: &str = "X-Slack-Request-Timestamp";

// =============================================================================
// Signing Context
// =============================================================================

/// Signing secret and version tag, created once at startup.
#[derive(Clone)]
pub struct SigningContext {
    secret: Vec<u8>,
    version: &'static str,
}

impl SigningContext {
    pub fn new(secret: Vec<u8>) -> Self {
        Self {
            secret,
            version: SIGNATURE_VERSION,
        }
    }

    pub fn secret(&self) -> &[u8] {
        &self.secret
    }

    pub fn version(&self) -> &'static str {
        self.version
    }
}

impl fmt::Debug for SigningContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningContext")
            .field("secret", &"<redacted>")
            .field("version", &self.version)
            .finish()
    }
}

// =============================================================================
// Inbound Request Capture
// =============================================================================

/// The parts of an inbound request that take part in authentication.
///
/// Captured before any parsing so the body bytes are exactly what Slack signed.
#[derive(Debug, Clone)]
pub struct InboundRequest {
    pub body: Bytes,
    pub signature: Option<String>,
    pub timestamp: Option<String>,
}

impl InboundRequest {
    pub fn capture(headers: &HeaderMap, body: Bytes) -> Self {
        Self {
            body,
            signature: header_text(headers, SIGNATURE_HEADER),
            timestamp: header_text(headers, TIMESTAMP_HEADER),
        }
    }
}

fn header_text(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Why a request failed authentication.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RejectReason {
    #[error("missing header {0}")]
    MissingHeader(&'static str),

    #[error("request timestamp outside replay window")]
    Stale,

    #[error("signature mismatch")]
    Mismatch,
}

/// Outcome of authenticating one inbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationResult {
    Verified,
    Rejected(RejectReason),
}

/// Authenticate a captured request against the signing context.
///
/// Checks run in order: both headers present, timestamp fresh, signature valid.
pub fn authenticate(ctx: &SigningContext, request: &InboundRequest, now: f64) -> VerificationResult {
    let Some(signature) = request.signature.as_deref() else {
        return VerificationResult::Rejected(RejectReason::MissingHeader(SIGNATURE_HEADER));
    };
    let Some(timestamp) = request.timestamp.as_deref() else {
        return VerificationResult::Rejected(RejectReason::MissingHeader(TIMESTAMP_HEADER));
    };

    if !is_fresh(timestamp, now, REPLAY_WINDOW) {
        return VerificationResult::Rejected(RejectReason::Stale);
    }

    if !verify_slack_signature(signature, timestamp, &request.body, ctx.secret(), ctx.version()) {
        return VerificationResult::Rejected(RejectReason::Mismatch);
    }

    VerificationResult::Verified
}

// =============================================================================
// Replay Guard
// =============================================================================

/// Check that `timestamp` (epoch seconds) lies within `window` of `now`.
///
/// The boundary is inclusive. Unparsable or non-finite timestamps are never fresh.
pub fn is_fresh(timestamp: &str, now: f64, window: Duration) -> bool {
    let request_time: f64 = match timestamp.trim().parse() {
        Ok(t) => t,
        Err(_) => {
            warn!(timestamp = %timestamp, "slack_signature_invalid_timestamp");
            return false;
        }
    };

    if !request_time.is_finite() {
        return false;
    }

    let age = (now - request_time).abs();
    if age > window.as_secs_f64() {
        warn!(
            request_time = request_time,
            current_time = now,
            age_seconds = age,
            max_age_seconds = window.as_secs(),
            "slack_signature_stale"
        );
        return false;
    }

    true
}

/// Current wall-clock time as fractional epoch seconds.
pub fn now_epoch_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

// =============================================================================
// Signature Verifier
// =============================================================================

/// Compute the signature header value Slack would send for this request.
///
/// Returns `None` if the body is not valid UTF-8.
pub fn compute_signature(secret: &[u8], version: &str, timestamp: &str, body: &[u8]) -> Option<String> {
    let body = std::str::from_utf8(body).ok()?;

    let mut mac = HmacSha256::new_from_slice(secret).ok()?;
    mac.update(format!("{}:{}:{}", version, timestamp, body).as_bytes());

    Some(format!("{}={}", version, hex::encode(mac.finalize().into_bytes())))
}

/// Verify a Slack request signature.
///
/// # Arguments
///
/// * `signature` - The `X-Slack-Signature` header, e.g. `v0=1a2b...`
/// * `timestamp` - The raw `X-Slack-Request-Timestamp` header
/// * `body` - The raw request body exactly as received
/// * `secret` - The app's signing secret
/// * `version` - The version tag, `v0` for all current requests
///
/// # Returns
///
/// `true` only if the signature matches. Malformed input yields `false`.
pub fn verify_slack_signature(
    signature: &str,
    timestamp: &str,
    body: &[u8],
    secret: &[u8],
    version: &str,
) -> bool {
    let Some(expected) = compute_signature(secret, version, timestamp, body) else {
        warn!(body_length = body.len(), "slack_signature_body_not_utf8");
        return false;
    };

    let valid: bool = expected.as_bytes().ct_eq(signature.as_bytes()).into();

    if !valid {
        warn!(
            expected_length = expected.len(),
            actual_length = signature.len(),
            "slack_signature_mismatch"
        );
    }

    valid
}
