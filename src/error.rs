//! Error types for the tutorial engine.

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),
}

/// Durable progress store errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Progress file {path} is corrupt: {reason}")]
    Corrupt { path: String, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Outbound/inbound transport errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Failed to send message on channel {name}: {reason}")]
    SendFailed { name: String, reason: String },

    #[error("Invalid inbound event: {0}")]
    InvalidEvent(String),

    #[error("HTTP error: {0}")]
    Http(String),
}

/// Tutorial state machine errors.
///
/// `NoActiveTutorial`, `InvalidStep` and `InvalidScore` never leave a partial
/// mutation behind. `Persistence` means the operation was not committed.
#[derive(Debug, thiserror::Error)]
pub enum TutorialError {
    #[error("No active tutorial for user {user_id}")]
    NoActiveTutorial { user_id: String },

    #[error("Step {step} is out of range (catalog has {total} steps)")]
    InvalidStep { step: usize, total: usize },

    #[error("Feedback score {score} is outside 1..=5")]
    InvalidScore { score: i64 },

    #[error("Persistence failure: {0}")]
    Persistence(#[from] StoreError),

    #[error("Tutorial catalog is empty")]
    CatalogEmpty,

    #[error("Progress tracker is not running")]
    TrackerUnavailable,
}

impl TutorialError {
    /// Whether the failure is the user's to fix (as opposed to an operator problem).
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Self::NoActiveTutorial { .. } | Self::InvalidStep { .. } | Self::InvalidScore { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_facing_classification() {
        assert!(TutorialError::InvalidScore { score: 0 }.is_user_facing());
        assert!(!TutorialError::CatalogEmpty.is_user_facing());
        let persistence = TutorialError::from(StoreError::Unavailable("disk full".into()));
        assert!(!persistence.is_user_facing());
    }
}
