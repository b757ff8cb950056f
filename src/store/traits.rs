//! `ProgressStore` trait — the single point of durability for tutorial progress.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::tutorial::model::ProgressRecord;

/// The whole progress table, keyed by user id.
pub type ProgressTable = HashMap<String, ProgressRecord>;

/// Backend-agnostic durable key-value store for progress records.
///
/// Both operations work on the entire table. Callers serialize access; the
/// store itself does not guard against concurrent `save_all` calls.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// Load the full table, or an empty one if nothing was saved yet.
    ///
    /// All-or-nothing: unreadable or corrupt state is an error, never a
    /// partial table.
    async fn load(&self) -> Result<ProgressTable, StoreError>;

    /// Persist the entire table atomically.
    async fn save_all(&self, records: &ProgressTable) -> Result<(), StoreError>;
}
