//! Slack module: event payloads, dispatch, and outbound API calls.
//!
//! ## Flow
//!
//! ```text
//! raw body → parse_event() → dispatch() → users_info() + send_message()
//! ```

pub mod client;
pub mod dispatch;
pub mod events;

pub use client::{SlackApi, SlackClient, SlackError, SlackUser, UserProfile};
pub use dispatch::{dispatch, handle_app_mention, Outcome};
pub use events::{parse_event, AppMention, CallbackEvent, EnvelopeMeta, EventError, SlackEvent};
