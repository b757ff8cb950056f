//! CommandRouter — maps inbound events onto tracker operations.
//!
//! Holds no state of its own: everything lives in the tracker. The router
//! decides which operation an event means and which messages come back.

use tracing::{debug, error, warn};

use super::catalog::StepCatalog;
use super::commands::{CommandParser, TutorialCommand};
use super::messages::{self, START_EMOJI};
use super::model::ProgressRecord;
use super::stats::TutorialStats;
use super::tracker::ProgressTracker;
use crate::channels::{EventKind, InboundEvent, Messenger, OutgoingMessage};
use crate::error::TutorialError;

#[derive(Clone)]
pub struct CommandRouter {
    tracker: ProgressTracker,
    catalog: StepCatalog,
}

impl CommandRouter {
    pub fn new(tracker: ProgressTracker, catalog: StepCatalog) -> Self {
        Self { tracker, catalog }
    }

    pub fn tracker(&self) -> &ProgressTracker {
        &self.tracker
    }

    /// Handle one event and return the messages to send.
    ///
    /// Events that are not tutorial related (ordinary chat, other reactions)
    /// produce no messages.
    pub async fn handle_event(
        &self,
        event: &InboundEvent,
    ) -> Result<Vec<OutgoingMessage>, TutorialError> {
        match event.kind {
            EventKind::MemberJoin => self.on_member_join(event).await,
            EventKind::Reaction if event.payload.trim() == START_EMOJI => {
                self.start(&event.user_id, &event.guild_id, None).await
            }
            EventKind::Reaction => Ok(Vec::new()),
            EventKind::Command => match CommandParser::parse(&event.payload) {
                Some(command) => self.handle_command(event, command).await,
                None => Ok(Vec::new()),
            },
        }
    }

    /// Handle an event and deliver the result through `messenger`.
    ///
    /// Tutorial errors become a reply to the user. Only a stopped tracker is
    /// returned to the caller.
    pub async fn dispatch(
        &self,
        event: &InboundEvent,
        messenger: &dyn Messenger,
    ) -> Result<(), TutorialError> {
        let outgoing = match self.handle_event(event).await {
            Ok(outgoing) => outgoing,
            Err(TutorialError::TrackerUnavailable) => return Err(TutorialError::TrackerUnavailable),
            Err(e) => {
                if e.is_user_facing() {
                    debug!(user_id = %event.user_id, error = %e, "Tutorial command rejected");
                } else {
                    error!(user_id = %event.user_id, error = %e, "Tutorial command failed");
                }
                vec![OutgoingMessage::direct(&event.user_id, messages::error(&e))]
            }
        };

        for message in &outgoing {
            if let Err(e) = message.deliver(messenger).await {
                warn!(
                    user_id = %event.user_id,
                    channel = messenger.name(),
                    error = %e,
                    "Failed to deliver tutorial message"
                );
            }
        }
        Ok(())
    }

    async fn on_member_join(
        &self,
        event: &InboundEvent,
    ) -> Result<Vec<OutgoingMessage>, TutorialError> {
        let name = event.payload.trim();
        let username = (!name.is_empty()).then_some(name);
        let update = self
            .tracker
            .start(&event.user_id, &event.guild_id, username)
            .await?;
        if !update.changed {
            debug!(user_id = %event.user_id, "Member rejoined, keeping existing progress");
            return Ok(Vec::new());
        }
        Ok(vec![
            OutgoingMessage::channel(
                &event.guild_id,
                messages::welcome(username.unwrap_or(&event.user_id)),
            ),
            OutgoingMessage::direct(&event.user_id, messages::greeting()),
        ])
    }

    async fn start(
        &self,
        user_id: &str,
        guild_id: &str,
        username: Option<&str>,
    ) -> Result<Vec<OutgoingMessage>, TutorialError> {
        let update = self.tracker.start(user_id, guild_id, username).await?;
        Ok(vec![OutgoingMessage::direct(
            user_id,
            messages::current_step(&update.record, &self.catalog),
        )])
    }

    async fn handle_command(
        &self,
        event: &InboundEvent,
        command: TutorialCommand,
    ) -> Result<Vec<OutgoingMessage>, TutorialError> {
        let user_id = event.user_id.as_str();
        let direct = |text: String| -> Result<Vec<OutgoingMessage>, TutorialError> {
            Ok(vec![OutgoingMessage::direct(user_id, text)])
        };

        match command {
            TutorialCommand::Start => self.start(user_id, &event.guild_id, None).await,
            TutorialCommand::Next | TutorialCommand::Skip => {
                let update = if command == TutorialCommand::Next {
                    self.tracker.advance(user_id).await?
                } else {
                    self.tracker.skip(user_id).await?
                };
                let record = update.record;
                if record.is_completed() {
                    Ok(vec![
                        OutgoingMessage::direct(
                            user_id,
                            messages::completion(&record, self.catalog.len()),
                        ),
                        OutgoingMessage::channel(
                            &record.guild_id,
                            messages::completion_announcement(&record),
                        ),
                    ])
                } else {
                    direct(messages::current_step(&record, &self.catalog))
                }
            }
            TutorialCommand::Pause => {
                let update = self.tracker.pause(user_id).await?;
                direct(if update.changed {
                    messages::paused()
                } else {
                    messages::already_paused()
                })
            }
            TutorialCommand::Resume => {
                let update = self.tracker.resume(user_id).await?;
                direct(messages::resumed(&update.record, &self.catalog))
            }
            TutorialCommand::Help => direct(messages::help()),
            TutorialCommand::Status => {
                let record = self.existing(user_id).await?;
                direct(messages::status(&record, &self.catalog))
            }
            TutorialCommand::Stats => {
                let snapshot = self.tracker.snapshot().await?;
                let stats = TutorialStats::compute(&snapshot, self.catalog.len());
                direct(messages::stats(&stats, &self.catalog))
            }
            TutorialCommand::FeedbackPrompt => {
                let record = self.existing(user_id).await?;
                direct(messages::feedback_prompt(&record, &self.catalog))
            }
            TutorialCommand::Feedback { step, score } => {
                let update = self.tracker.record_feedback(user_id, step, score).await?;
                let stored = update.record.feedback_scores.get(&step).copied().unwrap_or_default();
                direct(messages::feedback_thanks(self.catalog.get(step), stored))
            }
        }
    }

    async fn existing(&self, user_id: &str) -> Result<ProgressRecord, TutorialError> {
        self.tracker
            .get(user_id)
            .await?
            .ok_or_else(|| TutorialError::NoActiveTutorial {
                user_id: user_id.to_string(),
            })
    }
}
