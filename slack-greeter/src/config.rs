//! Configuration module for environment variable parsing.
//!
//! All configuration is read once at startup into an immutable [`Config`].
//! Request handling code never touches the environment directly.

use std::collections::HashMap;
use std::env;
use std::fmt;

use thiserror::Error;
use tracing::warn;
use url::Url;

use crate::web::signature::SigningContext;

/// Prefix for per-channel incoming webhook URLs, e.g. `SLACK_WEBHOOK_C0123`.
pub const WEBHOOK_PREFIX: &str = "SLACK_WEBHOOK_";

const DEFAULT_API_BASE_URL: &str = "https://slack.com/api/";

/// Fatal startup error raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: String, reason: String },
}

/// Application configuration loaded from environment variables.
#[derive(Clone)]
pub struct Config {
    /// Port for the web server to listen on
    pub port: u16,

    /// Slack signing secret and version tag used to verify inbound requests
    pub signing: SigningContext,

    /// Bot token sent as a bearer credential on Web API calls
    pub slack_token: String,

    /// Base URL of the Slack Web API, always ending in `/`
    pub slack_api_base_url: Url,

    /// Incoming webhook URL per channel id
    pub webhooks: HashMap<String, Url>,

    /// HTTP request timeout in milliseconds for outbound calls
    pub request_timeout_ms: u64,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(env::vars())
    }

    /// Load configuration from an explicit set of `(name, value)` pairs.
    pub fn from_vars<I>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let vars: HashMap<String, String> = vars.into_iter().collect();

        let signing_secret = required(&vars, "SLACK_SIGNING_SECRET")?;
        let slack_token = required(&vars, "SLACK_TOKEN")?;

        let slack_api_base_url = match vars.get("SLACK_API_BASE_URL") {
            Some(raw) if !raw.trim().is_empty() => parse_base_url("SLACK_API_BASE_URL", raw)?,
            _ => parse_base_url("SLACK_API_BASE_URL", DEFAULT_API_BASE_URL)?,
        };

        Ok(Config {
            port: parse_or(&vars, "PORT", 8080),
            signing: SigningContext::new(signing_secret.into_bytes()),
            slack_token,
            slack_api_base_url,
            webhooks: parse_webhooks(&vars)?,
            request_timeout_ms: parse_or(&vars, "REQUEST_TIMEOUT_MS", 8000),
        })
    }

    /// Webhook URL configured for `channel`, if any.
    pub fn webhook_for(&self, channel: &str) -> Option<&Url> {
        self.webhooks.get(channel)
    }
}

// Secrets stay out of logs.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut channels: Vec<&str> = self.webhooks.keys().map(String::as_str).collect();
        channels.sort_unstable();

        f.debug_struct("Config")
            .field("port", &self.port)
            .field("signing", &self.signing)
            .field("slack_token", &"<redacted>")
            .field("slack_api_base_url", &self.slack_api_base_url.as_str())
            .field("webhook_channels", &channels)
            .field("request_timeout_ms", &self.request_timeout_ms)
            .finish()
    }
}

/// Fetch a required variable, treating blank values as absent.
fn required(vars: &HashMap<String, String>, name: &'static str) -> Result<String, ConfigError> {
    match vars.get(name) {
        Some(v) if !v.trim().is_empty() => Ok(v.clone()),
        _ => Err(ConfigError::Missing(name)),
    }
}

/// Parse an optional variable, falling back to `default` when absent or invalid.
fn parse_or<T>(vars: &HashMap<String, String>, name: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    let Some(raw) = vars.get(name) else {
        return default;
    };

    match raw.trim().parse() {
        Ok(v) => v,
        Err(_) => {
            warn!(env_var = name, value = %raw, "Invalid value, using default");
            default
        }
    }
}

fn parse_base_url(name: &str, raw: &str) -> Result<Url, ConfigError> {
    let mut raw = raw.trim().to_string();
    if !raw.ends_with('/') {
        raw.push('/');
    }
    parse_url(name, &raw)
}

fn parse_url(name: &str, raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw.trim()).map_err(|e| ConfigError::Invalid {
        name: name.to_string(),
        reason: e.to_string(),
    })
}

/// Collect every `SLACK_WEBHOOK_<channel>` variable into a channel map.
fn parse_webhooks(vars: &HashMap<String, String>) -> Result<HashMap<String, Url>, ConfigError> {
    let mut webhooks = HashMap::new();

    for (name, value) in vars {
        let Some(channel) = name.strip_prefix(WEBHOOK_PREFIX) else {
            continue;
        };

        if channel.is_empty() || value.trim().is_empty() {
            warn!(env_var = %name, "Ignoring empty webhook entry");
            continue;
        }

        webhooks.insert(channel.to_string(), parse_url(name, value)?);
    }

    Ok(webhooks)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn base() -> Vec<(String, String)> {
        vars(&[("SLACK_SIGNING_SECRET", "shh"), ("SLACK_TOKEN", "xoxb-1")])
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_vars(base()).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.request_timeout_ms, 8000);
        assert_eq!(config.slack_api_base_url.as_str(), "https://slack.com/api/");
        assert_eq!(config.signing.secret(), b"shh");
        assert!(config.webhooks.is_empty());
    }

    #[test]
    fn test_missing_signing_secret() {
        let err = Config::from_vars(vars(&[("SLACK_TOKEN", "xoxb-1")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("SLACK_SIGNING_SECRET")));
    }

    #[test]
    fn test_blank_token_is_missing() {
        let err = Config::from_vars(vars(&[
            ("SLACK_SIGNING_SECRET", "shh"),
            ("SLACK_TOKEN", "   "),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Missing("SLACK_TOKEN")));
    }

    #[test]
    fn test_webhooks_collected_by_channel() {
        let mut v = base();
        v.extend(vars(&[
            ("SLACK_WEBHOOK_C1", "https://hooks.slack.com/services/T/B/1"),
            ("SLACK_WEBHOOK_C2", "https://hooks.slack.com/services/T/B/2"),
            ("SLACK_WEBHOOK_", "https://ignored.example.com"),
            ("OTHER", "x"),
        ]));

        let config = Config::from_vars(v).unwrap();
        assert_eq!(config.webhooks.len(), 2);
        assert_eq!(
            config.webhook_for("C1").map(Url::as_str),
            Some("https://hooks.slack.com/services/T/B/1")
        );
        assert!(config.webhook_for("C3").is_none());
    }

    #[test]
    fn test_invalid_webhook_url_is_fatal() {
        let mut v = base();
        v.extend(vars(&[("SLACK_WEBHOOK_C1", "not a url")]));

        let err = Config::from_vars(v).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref name, .. } if name == "SLACK_WEBHOOK_C1"));
    }

    #[test]
    fn test_api_base_url_gets_trailing_slash() {
        let mut v = base();
        v.extend(vars(&[("SLACK_API_BASE_URL", "http://127.0.0.1:9000/api")]));

        let config = Config::from_vars(v).unwrap();
        assert_eq!(config.slack_api_base_url.as_str(), "http://127.0.0.1:9000/api/");
    }

    #[test]
    fn test_invalid_port_uses_default() {
        let mut v = base();
        v.extend(vars(&[("PORT", "eighty"), ("REQUEST_TIMEOUT_MS", "2500")]));

        let config = Config::from_vars(v).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.request_timeout_ms, 2500);
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = Config::from_vars(base()).unwrap();
        let printed = format!("{:?}", config);
        assert!(!printed.contains("shh"));
        assert!(!printed.contains("xoxb-1"));
    }
}
