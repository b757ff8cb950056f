//! Channel abstraction for the chat transport boundary.
//!
//! The engine only sees [`InboundEvent`]s coming in and plain-text
//! [`OutgoingMessage`]s going out through a [`Messenger`].

pub mod cli;
pub mod webhook;

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::error::ChannelError;

pub use cli::{CliChannel, StdoutMessenger};
pub use webhook::WebhookMessenger;

/// What happened on the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A user joined a guild. Payload: display name (may be empty).
    MemberJoin,
    /// A user sent text. Payload: the message text.
    Command,
    /// A user reacted. Payload: the emoji.
    Reaction,
}

/// An event produced by the chat transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundEvent {
    pub kind: EventKind,
    pub user_id: String,
    pub guild_id: String,
    #[serde(default)]
    pub payload: String,
}

impl InboundEvent {
    pub fn new(kind: EventKind, user_id: &str, guild_id: &str, payload: &str) -> Self {
        Self {
            kind,
            user_id: user_id.to_string(),
            guild_id: guild_id.to_string(),
            payload: payload.to_string(),
        }
    }

    pub fn member_join(user_id: &str, guild_id: &str, name: &str) -> Self {
        Self::new(EventKind::MemberJoin, user_id, guild_id, name)
    }

    pub fn command(user_id: &str, guild_id: &str, text: &str) -> Self {
        Self::new(EventKind::Command, user_id, guild_id, text)
    }

    pub fn reaction(user_id: &str, guild_id: &str, emoji: &str) -> Self {
        Self::new(EventKind::Reaction, user_id, guild_id, emoji)
    }
}

/// A plain-text message the engine wants delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutgoingMessage {
    /// Private message to one user.
    Direct { user_id: String, text: String },
    /// Post in a guild's announcement channel.
    Channel { guild_id: String, text: String },
}

impl OutgoingMessage {
    pub fn direct(user_id: &str, text: impl Into<String>) -> Self {
        Self::Direct {
            user_id: user_id.to_string(),
            text: text.into(),
        }
    }

    pub fn channel(guild_id: &str, text: impl Into<String>) -> Self {
        Self::Channel {
            guild_id: guild_id.to_string(),
            text: text.into(),
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Self::Direct { text, .. } | Self::Channel { text, .. } => text,
        }
    }

    /// Send through a messenger.
    pub async fn deliver(&self, messenger: &dyn Messenger) -> Result<(), ChannelError> {
        match self {
            Self::Direct { user_id, text } => messenger.send_direct_message(user_id, text).await,
            Self::Channel { guild_id, text } => messenger.send_channel_message(guild_id, text).await,
        }
    }
}

/// Stream of inbound events from a transport.
pub type EventStream = Pin<Box<dyn Stream<Item = InboundEvent> + Send>>;

/// Outbound side of the chat transport.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    async fn send_direct_message(&self, user_id: &str, text: &str) -> Result<(), ChannelError>;

    async fn send_channel_message(&self, guild_id: &str, text: &str) -> Result<(), ChannelError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inbound_event_json() {
        let event: InboundEvent = serde_json::from_str(
            r#"{"kind":"member_join","user_id":"u1","guild_id":"g1"}"#,
        )
        .unwrap();
        assert_eq!(event, InboundEvent::member_join("u1", "g1", ""));
    }

    #[test]
    fn outgoing_message_json() {
        let json = serde_json::to_value(OutgoingMessage::channel("g1", "hi")).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "channel", "guild_id": "g1", "text": "hi"}));
    }
}
