//! Tutorial Engine — onboarding tutorials for chat communities.

pub mod channels;
pub mod config;
pub mod error;
pub mod store;
pub mod tutorial;
