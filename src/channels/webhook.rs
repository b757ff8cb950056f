//! Webhook messenger — POSTs outgoing messages to an HTTP endpoint.
//!
//! Body: `{"kind": "direct" | "channel", "target": "<id>", "text": "..."}`.
//! The receiving side is responsible for delivering it on the chat platform.

use async_trait::async_trait;
use serde::Serialize;

use crate::channels::Messenger;
use crate::error::ChannelError;

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    kind: &'a str,
    target: &'a str,
    text: &'a str,
}

pub struct WebhookMessenger {
    url: String,
    client: reqwest::Client,
}

impl WebhookMessenger {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::new(),
        }
    }

    async fn post(&self, kind: &str, target: &str, text: &str) -> Result<(), ChannelError> {
        let body = WebhookPayload { kind, target, text };
        let resp = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ChannelError::SendFailed {
                name: "webhook".into(),
                reason: e.to_string(),
            })?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            tracing::warn!(%status, kind, target, "Webhook delivery rejected");
            return Err(ChannelError::Http(format!("{status}: {detail}")));
        }
        Ok(())
    }
}

#[async_trait]
impl Messenger for WebhookMessenger {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn send_direct_message(&self, user_id: &str, text: &str) -> Result<(), ChannelError> {
        self.post("direct", user_id, text).await
    }

    async fn send_channel_message(&self, guild_id: &str, text: &str) -> Result<(), ChannelError> {
        self.post("channel", guild_id, text).await
    }
}
