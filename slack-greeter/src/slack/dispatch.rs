//! Routing of decoded Slack events to their handlers.
//!
//! ```text
//! SlackEvent → dispatch() → Outcome
//! ```

use tracing::info;

use super::client::{SlackApi, SlackError};
use super::events::{AppMention, CallbackEvent, SlackEvent};

/// What the HTTP layer should report back to Slack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Echo the url_verification challenge
    Challenge(String),
    /// The event was fully handled
    Handled,
}

/// Route a decoded event to its handler.
pub async fn dispatch(slack: &dyn SlackApi, event: SlackEvent) -> Result<Outcome, SlackError> {
    match event {
        SlackEvent::UrlVerification { challenge } => {
            info!(event_type = "url_verification", "slack_event_routing");
            Ok(Outcome::Challenge(challenge))
        }
        SlackEvent::EventCallback { meta, event } => {
            info!(
                event_type = "event_callback",
                team_id = ?meta.team_id,
                api_app_id = ?meta.api_app_id,
                "slack_event_routing"
            );
            match event {
                CallbackEvent::AppMention(mention) => handle_app_mention(slack, &mention).await?,
            }
            Ok(Outcome::Handled)
        }
    }
}

/// Greet whoever mentioned the app, in the channel they mentioned it from.
pub async fn handle_app_mention(slack: &dyn SlackApi, mention: &AppMention) -> Result<(), SlackError> {
    info!(
        user = %mention.user,
        channel = %mention.channel,
        ts = %mention.ts,
        "app_mention_received"
    );

    let user = slack.users_info(&mention.user).await?;
    let greeting = format!("Hello @{}", user.profile.display_name);
    slack.send_message(&mention.channel, &greeting).await?;

    info!(user = %mention.user, channel = %mention.channel, "app_mention_handled");

    Ok(())
}
