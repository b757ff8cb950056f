//! Configuration types.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

/// Default location of the progress table.
pub const DEFAULT_STORE_PATH: &str = "./data/tutorial_progress.json";

/// Default operator-supplied steps file (allowed to be absent).
pub const DEFAULT_CUSTOM_STEPS_PATH: &str = "custom_tutorial_steps.json";

/// Tutorial engine configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct TutorialConfig {
    /// Where the progress table is persisted.
    pub store_path: PathBuf,
    /// Optional JSON file of extra steps appended after the base steps.
    pub custom_steps_path: Option<PathBuf>,
    /// Whether the built-in base steps are part of the catalog.
    pub include_base_steps: bool,
    pub reminder: ReminderConfig,
    /// Port for the status/stats HTTP server.
    pub http_port: u16,
    /// Relay endpoint for outbound messages. `None` prints to stdout.
    pub webhook_url: Option<String>,
}

/// Reminder scheduler configuration.
#[derive(Debug, Clone)]
pub struct ReminderConfig {
    /// How often the scheduler scans all records.
    pub interval: Duration,
    /// Inactivity after which an unfinished, unpaused user is reminded.
    pub threshold: Duration,
    /// Stop reminding a user once `reminder_count` reaches this. `None` is unlimited.
    pub max_reminders: Option<u32>,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3600),   // 1 hour
            threshold: Duration::from_secs(86_400), // 24 hours
            max_reminders: None,
        }
    }
}

impl Default for TutorialConfig {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
            custom_steps_path: Some(PathBuf::from(DEFAULT_CUSTOM_STEPS_PATH)),
            include_base_steps: true,
            reminder: ReminderConfig::default(),
            http_port: 8080,
            webhook_url: None,
        }
    }
}

impl TutorialConfig {
    /// Build config from `TUTORIAL_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let store_path = std::env::var("TUTORIAL_STORE_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.store_path);

        // An empty value disables the custom steps file entirely.
        let custom_steps_path = match std::env::var("TUTORIAL_CUSTOM_STEPS_PATH") {
            Ok(s) if s.trim().is_empty() => None,
            Ok(s) => Some(PathBuf::from(s)),
            Err(_) => defaults.custom_steps_path,
        };

        let include_base_steps =
            parse_env("TUTORIAL_INCLUDE_BASE_STEPS")?.unwrap_or(defaults.include_base_steps);

        let interval_secs: u64 = parse_env("TUTORIAL_REMINDER_INTERVAL_SECS")?
            .unwrap_or(defaults.reminder.interval.as_secs());
        if interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "TUTORIAL_REMINDER_INTERVAL_SECS".into(),
                message: "must be greater than zero".into(),
            });
        }
        let threshold_secs: u64 = parse_env("TUTORIAL_REMINDER_THRESHOLD_SECS")?
            .unwrap_or(defaults.reminder.threshold.as_secs());
        let max_reminders: Option<u32> = parse_env("TUTORIAL_REMINDER_MAX")?;

        let http_port = parse_env("TUTORIAL_HTTP_PORT")?.unwrap_or(defaults.http_port);

        let webhook_url = std::env::var("TUTORIAL_WEBHOOK_URL")
            .ok()
            .filter(|s| !s.trim().is_empty());

        Ok(Self {
            store_path,
            custom_steps_path,
            include_base_steps,
            reminder: ReminderConfig {
                interval: Duration::from_secs(interval_secs),
                threshold: Duration::from_secs(threshold_secs),
                max_reminders,
            },
            http_port,
            webhook_url,
        })
    }
}

/// Read and parse an optional environment variable.
///
/// Unset yields `Ok(None)`; set but unparsable is an error rather than a
/// silent fallback to the default.
fn parse_env<T>(key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("{raw:?}: {e}"),
            }),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(ConfigError::ParseError(format!("{key}: {e}"))),
    }
}
