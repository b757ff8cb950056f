//! In-memory progress store for tests and ephemeral runs.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;

use super::traits::{ProgressStore, ProgressTable};
use crate::error::StoreError;

/// Keeps the last saved table in memory. Writes can be made to fail on demand.
#[derive(Default)]
pub struct MemoryStore {
    table: Mutex<ProgressTable>,
    fail_writes: AtomicBool,
    saves: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing table, as if it had been saved earlier.
    pub fn with_table(table: ProgressTable) -> Self {
        Self {
            table: Mutex::new(table),
            ..Self::default()
        }
    }

    /// Make subsequent `save_all` calls fail (or succeed again).
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful saves so far.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Copy of the last successfully saved table.
    pub fn saved(&self) -> Result<ProgressTable, StoreError> {
        self.table
            .lock()
            .map(|t| t.clone())
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".into()))
    }
}

#[async_trait]
impl ProgressStore for MemoryStore {
    async fn load(&self) -> Result<ProgressTable, StoreError> {
        self.saved()
    }

    async fn save_all(&self, records: &ProgressTable) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("writes disabled".into()));
        }
        let mut table = self
            .table
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".into()))?;
        *table = records.clone();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
