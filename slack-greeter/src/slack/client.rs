//! Outbound calls to Slack: the Web API and per-channel incoming webhooks.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use thiserror::Error;
use tracing::{error, info};
use url::Url;

use crate::config::{Config, WEBHOOK_PREFIX};

const USERS_INFO: &str = "users.info";
const INCOMING_WEBHOOK: &str = "incoming_webhook";

/// A failed outbound call. Never retried.
#[derive(Debug, Error)]
pub enum SlackError {
    #[error("{method} request failed: {source}")]
    Transport {
        method: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{method} returned HTTP {status}: {body}")]
    Status {
        method: &'static str,
        status: u16,
        body: String,
    },

    #[error("{method} returned error: {error}")]
    Api { method: &'static str, error: String },

    #[error("invalid URL for {method}: {source}")]
    Url {
        method: &'static str,
        #[source]
        source: url::ParseError,
    },

    #[error("No known webhook for channel {channel}, set SLACK_WEBHOOK_{channel}")]
    UnknownChannel { channel: String },
}

/// A Slack user as returned by `users.info`.
#[derive(Debug, Clone, Deserialize)]
pub struct SlackUser {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub profile: UserProfile,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub real_name: String,
}

#[derive(Debug, Deserialize)]
struct UsersInfoResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    user: Option<SlackUser>,
}

/// The Slack operations event handlers depend on.
#[async_trait]
pub trait SlackApi: Send + Sync {
    /// Look up a user by id.
    async fn users_info(&self, user_id: &str) -> Result<SlackUser, SlackError>;

    /// Post `text` to the incoming webhook configured for `channel`.
    async fn send_message(&self, channel: &str, text: &str) -> Result<(), SlackError>;
}

/// `reqwest`-backed Slack client.
#[derive(Clone)]
pub struct SlackClient {
    http: Client,
    token: String,
    api_base_url: Url,
    webhooks: HashMap<String, Url>,
}

impl SlackClient {
    /// Build a client from configuration, with the configured request timeout.
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let http = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;

        Ok(Self {
            http,
            token: config.slack_token.clone(),
            api_base_url: config.slack_api_base_url.clone(),
            webhooks: config.webhooks.clone(),
        })
    }
}

#[async_trait]
impl SlackApi for SlackClient {
    async fn users_info(&self, user_id: &str) -> Result<SlackUser, SlackError> {
        info!(user = %user_id, "slack_users_info_starting");

        let url = self
            .api_base_url
            .join(USERS_INFO)
            .map_err(|source| SlackError::Url {
                method: USERS_INFO,
                source,
            })?;

        let response = self
            .http
            .post(url)
            .bearer_auth(&self.token)
            .form(&[("user", user_id), ("include_locale", "false")])
            .send()
            .await
            .map_err(|e| transport_error(USERS_INFO, e))?;

        let response = check_status(USERS_INFO, response).await?;

        let payload: UsersInfoResponse = response
            .json()
            .await
            .map_err(|e| transport_error(USERS_INFO, e))?;

        if !payload.ok {
            let err = payload.error.unwrap_or_else(|| "unknown_error".to_string());
            error!(method = USERS_INFO, error = %err, "slack_api_error");
            return Err(SlackError::Api {
                method: USERS_INFO,
                error: err,
            });
        }

        let user = payload.user.ok_or_else(|| SlackError::Api {
            method: USERS_INFO,
            error: "response missing user".to_string(),
        })?;

        info!(
            user = %user_id,
            display_name = %user.profile.display_name,
            "slack_users_info_complete"
        );

        Ok(user)
    }

    async fn send_message(&self, channel: &str, text: &str) -> Result<(), SlackError> {
        let Some(url) = self.webhooks.get(channel) else {
            error!(
                channel = %channel,
                env_var = %format!("{}{}", WEBHOOK_PREFIX, channel),
                "slack_webhook_unknown_channel"
            );
            return Err(SlackError::UnknownChannel {
                channel: channel.to_string(),
            });
        };

        info!(channel = %channel, text_length = text.len(), "slack_send_message_starting");

        let response = self
            .http
            .post(url.clone())
            .json(&serde_json::json!({ "text": text }))
            .send()
            .await
            .map_err(|e| transport_error(INCOMING_WEBHOOK, e))?;

        check_status(INCOMING_WEBHOOK, response).await?;

        info!(channel = %channel, "slack_send_message_complete");

        Ok(())
    }
}

/// Pass 2xx responses through; log and convert anything else.
async fn check_status(method: &'static str, response: Response) -> Result<Response, SlackError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    error!(
        method = method,
        status_code = status.as_u16(),
        body = %body,
        "slack_api_bad_status"
    );

    Err(SlackError::Status {
        method,
        status: status.as_u16(),
        body,
    })
}

fn transport_error(method: &'static str, e: reqwest::Error) -> SlackError {
    if e.is_timeout() {
        error!(method = method, error = %e, "slack_request_timeout");
    } else if e.is_decode() {
        error!(method = method, error = %e, "slack_response_decode_error");
    } else {
        error!(method = method, error = %e, "slack_request_error");
    }
    SlackError::Transport { method, source: e }
}
