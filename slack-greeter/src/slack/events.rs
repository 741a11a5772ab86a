//! Slack Events API payload types.
//!
//! Envelopes are decoded in two steps: the `type` tag first, then the
//! variant it names. Anything unrecognized becomes an [`EventError`] instead
//! of failing somewhere deeper in the handlers.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

pub const URL_VERIFICATION: &str = "url_verification";
pub const EVENT_CALLBACK: &str = "event_callback";
pub const APP_MENTION: &str = "app_mention";

/// A request body that cannot be turned into a [`SlackEvent`].
#[derive(Debug, Error)]
pub enum EventError {
    #[error("Invalid event payload: {0}")]
    Malformed(#[source] serde_json::Error),

    #[error("Missing event type")]
    MissingType,

    #[error("Unhandled event type: {0}")]
    UnhandledType(String),

    #[error("Missing challenge in url_verification event")]
    MissingChallenge,

    #[error("Invalid {kind} event: {source}")]
    InvalidPayload {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Outer envelope exactly as Slack sends it.
///
/// `token`, `team_id` and `api_app_id` are carried along but never drive control flow.
#[derive(Debug, Clone, Deserialize)]
struct RawEnvelope {
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    team_id: Option<String>,
    #[serde(default)]
    api_app_id: Option<String>,
    #[serde(default)]
    challenge: Option<String>,
    #[serde(default)]
    event: Option<Value>,
}

/// Optional pass-through fields from the outer envelope.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvelopeMeta {
    pub token: Option<String>,
    pub team_id: Option<String>,
    pub api_app_id: Option<String>,
}

/// A decoded, recognized Slack event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlackEvent {
    /// One-time endpoint ownership check
    UrlVerification { challenge: String },
    /// Envelope carrying a business event
    EventCallback {
        meta: EnvelopeMeta,
        event: CallbackEvent,
    },
}

/// Inner events handled inside an `event_callback` envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackEvent {
    AppMention(AppMention),
}

/// Someone mentioned the app in a channel.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AppMention {
    pub user: String,
    pub channel: String,
    pub ts: String,
    #[serde(default)]
    pub text: Option<String>,
}

/// Decode a raw request body into a [`SlackEvent`].
pub fn parse_event(body: &[u8]) -> Result<SlackEvent, EventError> {
    let envelope: RawEnvelope = serde_json::from_slice(body).map_err(EventError::Malformed)?;

    let kind = envelope.kind.clone().ok_or(EventError::MissingType)?;

    match kind.as_str() {
        URL_VERIFICATION => {
            let challenge = nested_challenge(envelope.event.as_ref())
                .or(envelope.challenge)
                .ok_or(EventError::MissingChallenge)?;
            Ok(SlackEvent::UrlVerification { challenge })
        }
        EVENT_CALLBACK => {
            let meta = EnvelopeMeta {
                token: envelope.token,
                team_id: envelope.team_id,
                api_app_id: envelope.api_app_id,
            };
            let event = parse_callback(envelope.event.ok_or(EventError::MissingType)?)?;
            Ok(SlackEvent::EventCallback { meta, event })
        }
        _ => Err(EventError::UnhandledType(kind)),
    }
}

/// Decode the nested `event` object of an `event_callback` envelope.
fn parse_callback(event: Value) -> Result<CallbackEvent, EventError> {
    let kind = event
        .get("type")
        .and_then(Value::as_str)
        .ok_or(EventError::MissingType)?
        .to_string();

    match kind.as_str() {
        APP_MENTION => serde_json::from_value(event)
            .map(CallbackEvent::AppMention)
            .map_err(|source| EventError::InvalidPayload {
                kind: APP_MENTION,
                source,
            }),
        _ => Err(EventError::UnhandledType(kind)),
    }
}

fn nested_challenge(event: Option<&Value>) -> Option<String> {
    event?
        .get("challenge")
        .and_then(Value::as_str)
        .map(str::to_string)
}
