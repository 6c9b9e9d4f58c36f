use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use shared::protocol::PushPayload;
use tokio::sync::mpsc;
use url::Url;

/// One-way message from the notification task to the app: "navigate here".
/// Mirrors the `{type: "NAVIGATE", to}` shape posted to window clients;
/// anything else under the `type` tag is rejected on decode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "WireMessage", into = "WireMessage")]
pub struct NavigateMessage {
    pub to: String,
}

// Serde only validates the tag value when it selects an enum variant, so
// the wire shape lives on a one-variant enum.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
enum WireMessage {
    #[serde(rename = "NAVIGATE")]
    Navigate { to: String },
}

impl From<WireMessage> for NavigateMessage {
    fn from(message: WireMessage) -> Self {
        let WireMessage::Navigate { to } = message;
        Self { to }
    }
}

impl From<NavigateMessage> for WireMessage {
    fn from(message: NavigateMessage) -> Self {
        WireMessage::Navigate { to: message.to }
    }
}

/// What clicking a rendered notification should do, given whether a window
/// client already exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    /// Focus the existing client and post it a navigate message.
    FocusExisting(NavigateMessage),
    /// No client to reuse; open a new window at the resolved target.
    OpenWindow(Url),
}

pub fn resolve_notification_click(
    payload: &PushPayload,
    origin: &Url,
    has_open_client: bool,
) -> Result<ClickOutcome> {
    if has_open_client {
        return Ok(ClickOutcome::FocusExisting(NavigateMessage {
            to: payload.url.clone(),
        }));
    }

    let target = origin
        .join(&payload.url)
        .with_context(|| format!("invalid notification target: {}", payload.url))?;
    Ok(ClickOutcome::OpenWindow(target))
}

pub type NavigationSender = mpsc::Sender<NavigateMessage>;
pub type NavigationReceiver = mpsc::Receiver<NavigateMessage>;

/// Single-producer/single-consumer channel between the notification task
/// and the app task. The consumer applies messages idempotently (see
/// [`crate::router::AppRouter::apply_navigate_message`]).
pub fn navigation_channel(capacity: usize) -> (NavigationSender, NavigationReceiver) {
    mpsc::channel(capacity)
}

#[cfg(test)]
#[path = "tests/push_tests.rs"]
mod tests;
