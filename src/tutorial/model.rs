//! Progress record data model and its transitions.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::state::TutorialState;
use crate::error::TutorialError;

/// Lowest accepted feedback score.
pub const MIN_SCORE: i64 = 1;
/// Highest accepted feedback score.
pub const MAX_SCORE: i64 = 5;

/// The complete progress state for one user.
///
/// Persisted as one entry of the progress table, keyed by `user_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub user_id: String,
    pub guild_id: String,
    /// Display name captured when the record was created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Index into the catalog; equals the catalog length once finished.
    pub current_step: usize,
    /// Steps the user explicitly acknowledged (skipped steps are absent).
    pub completed_steps: BTreeSet<usize>,
    pub started_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
    /// Set exactly once, when the final step is left.
    pub completion_time: Option<DateTime<Utc>>,
    /// step index -> score (1-5). Last write wins.
    pub feedback_scores: BTreeMap<usize, u8>,
    pub reminder_count: u32,
    pub is_paused: bool,
}

/// Where an `advance`/`skip` left the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progression {
    /// Now on this step.
    NextStep(usize),
    /// Left the final step; the tutorial is complete.
    Finished,
}

impl ProgressRecord {
    /// A fresh record at step 0.
    pub fn new(user_id: &str, guild_id: &str, username: Option<&str>, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.to_string(),
            guild_id: guild_id.to_string(),
            username: username.map(String::from),
            current_step: 0,
            completed_steps: BTreeSet::new(),
            started_at: now,
            last_activity_at: now,
            completion_time: None,
            feedback_scores: BTreeMap::new(),
            reminder_count: 0,
            is_paused: false,
        }
    }

    pub fn state(&self, total_steps: usize) -> TutorialState {
        TutorialState::of(Some(self), total_steps)
    }

    pub fn is_completed(&self) -> bool {
        self.completion_time.is_some()
    }

    /// Bring a loaded record in line with a catalog of `total_steps` steps.
    ///
    /// After this, `completion_time.is_some()` holds exactly when
    /// `current_step == total_steps`. A record past the end of a shrunken
    /// catalog is finished as of its last activity; a finished record stays
    /// finished when the catalog grows. Returns whether anything changed.
    pub fn reconcile(&mut self, total_steps: usize) -> bool {
        let before = (self.current_step, self.completion_time);
        if self.current_step >= total_steps || self.completion_time.is_some() {
            self.current_step = total_steps;
            self.completion_time.get_or_insert(self.last_activity_at);
        }
        before != (self.current_step, self.completion_time)
    }

    /// Acknowledge the current step and move to the next one.
    pub fn advance(
        &mut self,
        total_steps: usize,
        now: DateTime<Utc>,
    ) -> Result<Progression, TutorialError> {
        self.require_in_progress(total_steps)?;
        self.completed_steps.insert(self.current_step);
        Ok(self.step_forward(total_steps, now))
    }

    /// Move past the current step without acknowledging it.
    pub fn skip(
        &mut self,
        total_steps: usize,
        now: DateTime<Utc>,
    ) -> Result<Progression, TutorialError> {
        self.require_in_progress(total_steps)?;
        Ok(self.step_forward(total_steps, now))
    }

    /// Set the paused flag. Returns whether anything changed.
    ///
    /// Completed tutorials cannot be paused or resumed.
    pub fn set_paused(
        &mut self,
        paused: bool,
        total_steps: usize,
        now: DateTime<Utc>,
    ) -> Result<bool, TutorialError> {
        if self.state(total_steps).is_terminal() {
            return Err(self.no_active());
        }
        if self.is_paused == paused {
            return Ok(false);
        }
        self.is_paused = paused;
        self.last_activity_at = now;
        Ok(true)
    }

    /// Record a feedback score that already passed [`validate_feedback`].
    pub fn set_feedback(&mut self, step: usize, score: u8, now: DateTime<Utc>) {
        self.feedback_scores.insert(step, score);
        self.last_activity_at = now;
    }

    /// Whether the reminder loop should nudge this user at `now`.
    ///
    /// Only in-progress records are eligible.
    pub fn is_due_for_reminder(
        &self,
        now: DateTime<Utc>,
        threshold: Duration,
        max_reminders: Option<u32>,
        total_steps: usize,
    ) -> bool {
        if self.state(total_steps) != TutorialState::InProgress {
            return false;
        }
        if max_reminders.is_some_and(|max| self.reminder_count >= max) {
            return false;
        }
        now - self.last_activity_at >= threshold
    }

    /// Mean of this user's feedback scores, if any.
    pub fn average_feedback(&self) -> Option<f64> {
        if self.feedback_scores.is_empty() {
            return None;
        }
        let sum: u32 = self.feedback_scores.values().map(|s| u32::from(*s)).sum();
        Some(f64::from(sum) / self.feedback_scores.len() as f64)
    }

    /// Hours from start to completion, if completed.
    pub fn completion_hours(&self) -> Option<f64> {
        self.completion_time
            .map(|done| (done - self.started_at).num_seconds() as f64 / 3600.0)
    }

    fn require_in_progress(&self, total_steps: usize) -> Result<(), TutorialError> {
        if self.state(total_steps).can_progress() {
            Ok(())
        } else {
            Err(self.no_active())
        }
    }

    fn step_forward(&mut self, total_steps: usize, now: DateTime<Utc>) -> Progression {
        self.current_step += 1;
        self.last_activity_at = now;
        if self.current_step >= total_steps {
            self.current_step = total_steps;
            self.completion_time = Some(now);
            Progression::Finished
        } else {
            Progression::NextStep(self.current_step)
        }
    }

    fn no_active(&self) -> TutorialError {
        TutorialError::NoActiveTutorial {
            user_id: self.user_id.clone(),
        }
    }
}

/// Check a feedback submission against the catalog size.
///
/// Score is checked first, then the step. Returns the score narrowed for storage.
pub fn validate_feedback(step: usize, score: i64, total_steps: usize) -> Result<u8, TutorialError> {
    if !(MIN_SCORE..=MAX_SCORE).contains(&score) {
        return Err(TutorialError::InvalidScore { score });
    }
    if step >= total_steps {
        return Err(TutorialError::InvalidStep {
            step,
            total: total_steps,
        });
    }
    // In range 1..=5 per the check above.
    Ok(score as u8)
}
