//! Slack Greeter - Slack Events API receiver.
//!
//! Verifies that inbound requests really come from Slack, then greets users
//! who mention the app by posting to the channel's incoming webhook.
//!
//! ## Architecture
//!
//! ```text
//! Slack → verify_slack_request → slack_events → dispatch → users.info + webhook
//! ```

pub mod config;
pub mod slack;
pub mod web;

// Re-export commonly used types
pub use config::{Config, ConfigError};
pub use slack::{SlackApi, SlackClient, SlackError, SlackEvent};
pub use web::{router, AppState};
