//! Typed subscriptions to server-pushed events.

use serde_json::Value;
use tracing::warn;

use dart_duel_protocol::Message;
use dart_duel_types::EventKind;

use crate::registry::SubscriptionId;
use crate::session::Session;

impl Session {
    /// Call `handler` with the body of every event tagged `kind`.
    pub fn on_event<F>(&self, kind: EventKind, handler: F) -> SubscriptionId
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.subscribe(
            move |message: &Message| message.is_event(kind),
            move |message: &Message| {
                if let Some(event) = message.as_event() {
                    handler(&event.body);
                }
            },
        )
    }

    /// Call `handler` with the username of every player who comes online.
    pub fn on_new_user_online<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.on_username_event(EventKind::NewUserOnline, handler)
    }

    /// Call `handler` with the username of every player who goes offline.
    pub fn on_user_offline<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.on_username_event(EventKind::UserOffline, handler)
    }

    fn on_username_event<F>(&self, kind: EventKind, handler: F) -> SubscriptionId
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.on_event(kind, move |body: &Value| match body.as_str() {
            Some(username) => handler(username),
            None => warn!(event = kind.as_str(), %body, "expected a username"),
        })
    }
}

/// Username carried by a presence event, if `message` is one.
pub fn presence_username(message: &Message) -> Option<(EventKind, &str)> {
    let event = message.as_event()?;
    let kind = event.kind()?;
    match kind {
        EventKind::NewUserOnline | EventKind::UserOffline => Some((kind, event.body.as_str()?)),
        _ => None,
    }
}
