//! Tutorial state machine — which state a user's record is in.

use serde::Serialize;

use super::model::ProgressRecord;

/// The states of a user's tutorial.
///
/// NotStarted → InProgress ⇄ Paused, InProgress → Completed (terminal).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TutorialState {
    NotStarted,
    InProgress,
    Paused,
    Completed,
}

impl TutorialState {
    /// Derive the state of an optional record against a catalog of `total` steps.
    pub fn of(record: Option<&ProgressRecord>, total: usize) -> Self {
        match record {
            None => Self::NotStarted,
            Some(r) if r.current_step >= total || r.completion_time.is_some() => Self::Completed,
            Some(r) if r.is_paused => Self::Paused,
            Some(_) => Self::InProgress,
        }
    }

    /// Whether this state is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Whether `advance`/`skip` are allowed.
    pub fn can_progress(&self) -> bool {
        matches!(self, Self::InProgress)
    }
}

impl std::fmt::Display for TutorialState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::NotStarted => "not_started",
            Self::InProgress => "in_progress",
            Self::Paused => "paused",
            Self::Completed => "completed",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    #[test]
    fn derives_each_state() {
        let now = Utc::now();
        assert_eq!(TutorialState::of(None, 3), TutorialState::NotStarted);

        let mut record = ProgressRecord::new("u1", "g1", None, now);
        assert_eq!(TutorialState::of(Some(&record), 3), TutorialState::InProgress);

        record.is_paused = true;
        assert_eq!(TutorialState::of(Some(&record), 3), TutorialState::Paused);

        record.is_paused = false;
        record.current_step = 3;
        record.completion_time = Some(now);
        assert_eq!(TutorialState::of(Some(&record), 3), TutorialState::Completed);
    }

    #[test]
    fn only_in_progress_can_progress() {
        assert!(TutorialState::InProgress.can_progress());
        assert!(!TutorialState::Paused.can_progress());
        assert!(!TutorialState::Completed.can_progress());
        assert!(!TutorialState::NotStarted.can_progress());
        assert!(TutorialState::Completed.is_terminal());
    }

    #[test]
    fn display_matches_serde() {
        use TutorialState::*;
        for state in [NotStarted, InProgress, Paused, Completed] {
            let json = serde_json::to_string(&state).unwrap();
            assert_eq!(format!("\"{state}\""), json);
        }
    }
}
