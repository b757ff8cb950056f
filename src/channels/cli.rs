//! CLI channel — stdin events in, stdout messages out, for local runs.
//!
//! Each input line is one event, either a short form
//!
//! ```text
//! join <user> <guild> [display name]
//! cmd <user> <guild> <text>
//! react <user> <guild> <emoji>
//! ```
//!
//! or a JSON-encoded [`InboundEvent`].

use async_trait::async_trait;
use futures::stream;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::channels::{EventKind, EventStream, InboundEvent, Messenger};
use crate::error::ChannelError;

/// Reads events from stdin.
pub struct CliChannel;

impl CliChannel {
    pub fn new() -> Self {
        Self
    }

    /// Start reading stdin. The stream ends at EOF.
    pub fn start(&self) -> EventStream {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();

        tokio::spawn(async move {
            let stdin = tokio::io::stdin();
            let reader = BufReader::new(stdin);
            let mut lines = reader.lines();

            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let line = line.trim();
                        if line.is_empty() {
                            continue;
                        }
                        match parse_line(line) {
                            Ok(event) => {
                                if tx.send(event).is_err() {
                                    break;
                                }
                            }
                            Err(e) => eprintln!("⚠️  {e}"),
                        }
                    }
                    Ok(None) => break, // EOF
                    Err(e) => {
                        tracing::error!("Error reading stdin: {}", e);
                        break;
                    }
                }
            }
        });

        let stream = stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|event| (event, rx))
        });

        Box::pin(stream)
    }
}

impl Default for CliChannel {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse one input line into an event.
pub fn parse_line(line: &str) -> Result<InboundEvent, ChannelError> {
    let line = line.trim();
    if line.starts_with('{') {
        return serde_json::from_str(line)
            .map_err(|e| ChannelError::InvalidEvent(format!("bad JSON event: {e}")));
    }

    let mut parts = line.splitn(4, char::is_whitespace);
    let verb = parts.next().unwrap_or_default();
    let kind = match verb.to_lowercase().as_str() {
        "join" => EventKind::MemberJoin,
        "cmd" => EventKind::Command,
        "react" => EventKind::Reaction,
        other => {
            return Err(ChannelError::InvalidEvent(format!(
                "unknown event '{other}', expected join, cmd or react"
            )));
        }
    };

    let (Some(user_id), Some(guild_id)) = (parts.next(), parts.next()) else {
        return Err(ChannelError::InvalidEvent(format!(
            "usage: {verb} <user> <guild> ..."
        )));
    };
    let payload = parts.next().unwrap_or_default().trim();

    if kind != EventKind::MemberJoin && payload.is_empty() {
        return Err(ChannelError::InvalidEvent(format!("{verb} needs a payload")));
    }

    Ok(InboundEvent::new(kind, user_id, guild_id, payload))
}

/// Prints outgoing messages to stdout.
pub struct StdoutMessenger;

#[async_trait]
impl Messenger for StdoutMessenger {
    fn name(&self) -> &str {
        "stdout"
    }

    async fn send_direct_message(&self, user_id: &str, text: &str) -> Result<(), ChannelError> {
        println!("\n[dm → {user_id}]\n{text}\n");
        Ok(())
    }

    async fn send_channel_message(&self, guild_id: &str, text: &str) -> Result<(), ChannelError> {
        println!("\n[#{guild_id}]\n{text}\n");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_forms() {
        assert_eq!(
            parse_line("join u1 g1 Alice Smith").unwrap(),
            InboundEvent::member_join("u1", "g1", "Alice Smith")
        );
        assert_eq!(
            parse_line("join u1 g1").unwrap(),
            InboundEvent::member_join("u1", "g1", "")
        );
        assert_eq!(
            parse_line("cmd u1 g1 feedback 1 5").unwrap(),
            InboundEvent::command("u1", "g1", "feedback 1 5")
        );
        assert_eq!(
            parse_line("react u1 g1 🎓").unwrap(),
            InboundEvent::reaction("u1", "g1", "🎓")
        );
    }

    #[test]
    fn json_form() {
        let event =
            parse_line(r#"{"kind":"command","user_id":"u2","guild_id":"g9","payload":"next"}"#)
                .unwrap();
        assert_eq!(event, InboundEvent::command("u2", "g9", "next"));
    }

    #[test]
    fn rejects_malformed_lines() {
        for line in ["wave u1 g1", "cmd u1", "cmd u1 g1", "react u1 g1  ", "{not json"] {
            assert!(
                matches!(parse_line(line), Err(ChannelError::InvalidEvent(_))),
                "line: {line:?}"
            );
        }
    }
}
