//! Onboarding tutorial engine.
//!
//! Guides new members through a fixed sequence of steps: a catalog of
//! steps, a single-writer progress tracker, a reminder scheduler for stalled
//! users, aggregate statistics, and a command router that ties inbound chat
//! events to tracker operations.

pub mod catalog;
pub mod commands;
pub mod messages;
pub mod model;
pub mod reminder;
pub mod router;
pub mod routes;
pub mod state;
pub mod stats;
pub mod tracker;

pub use catalog::{StepCatalog, StepDefinition, TutorialStep};
pub use commands::{CommandParser, TutorialCommand};
pub use model::{ProgressRecord, Progression};
pub use reminder::{ReminderEvent, ReminderHandle, spawn_reminder_scheduler};
pub use router::CommandRouter;
pub use routes::{TutorialRouteState, tutorial_routes};
pub use state::TutorialState;
pub use stats::TutorialStats;
pub use tracker::{ProgressTracker, TrackerUpdate};
