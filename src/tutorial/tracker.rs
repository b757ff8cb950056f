//! ProgressTracker — single-writer owner of the progress table.
//!
//! One task owns the table and the store. Callers hold a cloneable
//! [`ProgressTracker`] handle and send requests over a channel, so every
//! read-mutate-persist sequence runs to completion before the next one
//! starts, for all users. A failed save rolls the in-memory change back and
//! is reported to the caller as `Persistence`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::model::{ProgressRecord, Progression, validate_feedback};
use crate::error::TutorialError;
use crate::store::{ProgressStore, ProgressTable};

/// Pending request capacity before callers start waiting.
const REQUEST_QUEUE_CAPACITY: usize = 256;

/// Result of a tracker operation.
#[derive(Debug, Clone)]
pub struct TrackerUpdate {
    /// The record after the operation.
    pub record: ProgressRecord,
    /// False for no-ops (repeat `start`, pausing an already paused record, ...).
    pub changed: bool,
}

#[derive(Debug)]
enum Mutation {
    Start {
        guild_id: String,
        username: Option<String>,
    },
    Update(Update),
}

/// Mutations that require an existing record.
#[derive(Debug, Clone, Copy)]
enum Update {
    Advance,
    Skip,
    Pause,
    Resume,
    Feedback { step: usize, score: i64 },
    Reminder,
}

impl Mutation {
    fn name(&self) -> &'static str {
        match self {
            Self::Start { .. } => "start",
            Self::Update(Update::Advance) => "advance",
            Self::Update(Update::Skip) => "skip",
            Self::Update(Update::Pause) => "pause",
            Self::Update(Update::Resume) => "resume",
            Self::Update(Update::Feedback { .. }) => "feedback",
            Self::Update(Update::Reminder) => "reminder",
        }
    }
}

type Reply<T> = oneshot::Sender<T>;

enum Request {
    Mutate {
        user_id: String,
        mutation: Mutation,
        reply: Reply<Result<TrackerUpdate, TutorialError>>,
    },
    Get {
        user_id: String,
        reply: Reply<Option<ProgressRecord>>,
    },
    Snapshot {
        reply: Reply<Vec<ProgressRecord>>,
    },
}

/// Handle to the progress tracker task. Cheap to clone.
#[derive(Clone)]
pub struct ProgressTracker {
    tx: mpsc::Sender<Request>,
    total_steps: usize,
}

impl ProgressTracker {
    /// Load the table from `store` and spawn the owning task.
    ///
    /// Fails if the store cannot produce a complete table. The task exits once
    /// every handle has been dropped.
    pub async fn spawn(
        store: Arc<dyn ProgressStore>,
        total_steps: usize,
    ) -> Result<(Self, JoinHandle<()>), TutorialError> {
        if total_steps == 0 {
            return Err(TutorialError::CatalogEmpty);
        }
        let mut table = store.load().await?;
        reconcile_table(&mut table, store.as_ref(), total_steps).await?;
        info!(records = table.len(), total_steps, "Progress tracker starting");

        let (tx, rx) = mpsc::channel(REQUEST_QUEUE_CAPACITY);
        let actor = TrackerActor {
            table,
            store,
            total_steps,
        };
        let handle = tokio::spawn(actor.run(rx));

        Ok((Self { tx, total_steps }, handle))
    }

    /// Number of steps in the catalog this tracker was started with.
    pub fn total_steps(&self) -> usize {
        self.total_steps
    }

    /// Create a record at step 0, or return the existing one untouched.
    pub async fn start(
        &self,
        user_id: &str,
        guild_id: &str,
        username: Option<&str>,
    ) -> Result<TrackerUpdate, TutorialError> {
        self.mutate(
            user_id,
            Mutation::Start {
                guild_id: guild_id.to_string(),
                username: username.map(String::from),
            },
        )
        .await
    }

    /// Acknowledge the current step and move on.
    pub async fn advance(&self, user_id: &str) -> Result<TrackerUpdate, TutorialError> {
        self.mutate(user_id, Mutation::Update(Update::Advance)).await
    }

    /// Move past the current step without acknowledging it.
    pub async fn skip(&self, user_id: &str) -> Result<TrackerUpdate, TutorialError> {
        self.mutate(user_id, Mutation::Update(Update::Skip)).await
    }

    pub async fn pause(&self, user_id: &str) -> Result<TrackerUpdate, TutorialError> {
        self.mutate(user_id, Mutation::Update(Update::Pause)).await
    }

    pub async fn resume(&self, user_id: &str) -> Result<TrackerUpdate, TutorialError> {
        self.mutate(user_id, Mutation::Update(Update::Resume)).await
    }

    /// Store a 1-5 score for a 0-based step. Last write wins.
    pub async fn record_feedback(
        &self,
        user_id: &str,
        step: usize,
        score: i64,
    ) -> Result<TrackerUpdate, TutorialError> {
        self.mutate(user_id, Mutation::Update(Update::Feedback { step, score }))
            .await
    }

    /// Count one reminder for a user who is still eligible for reminders.
    ///
    /// Leaves `last_activity_at` alone.
    pub async fn record_reminder(&self, user_id: &str) -> Result<TrackerUpdate, TutorialError> {
        self.mutate(user_id, Mutation::Update(Update::Reminder)).await
    }

    /// Copy of one user's record.
    pub async fn get(&self, user_id: &str) -> Result<Option<ProgressRecord>, TutorialError> {
        let user_id = user_id.to_string();
        self.request(|reply| Request::Get { user_id, reply }).await
    }

    /// Copy of all records, ordered by user id.
    pub async fn snapshot(&self) -> Result<Vec<ProgressRecord>, TutorialError> {
        self.request(|reply| Request::Snapshot { reply }).await
    }

    async fn mutate(
        &self,
        user_id: &str,
        mutation: Mutation,
    ) -> Result<TrackerUpdate, TutorialError> {
        let user_id = user_id.to_string();
        self.request(|reply| Request::Mutate {
            user_id,
            mutation,
            reply,
        })
        .await?
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(Reply<T>) -> Request,
    ) -> Result<T, TutorialError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(build(reply_tx))
            .await
            .map_err(|_| TutorialError::TrackerUnavailable)?;
        reply_rx.await.map_err(|_| TutorialError::TrackerUnavailable)
    }
}

/// Align every loaded record with the current catalog and persist any fixes.
///
/// The catalog can shrink between runs (a custom steps file removed or
/// skipped), leaving records past the end without a completion time.
async fn reconcile_table(
    table: &mut ProgressTable,
    store: &dyn ProgressStore,
    total_steps: usize,
) -> Result<(), TutorialError> {
    let mut reconciled = 0usize;
    for record in table.values_mut() {
        if record.reconcile(total_steps) {
            warn!(
                user_id = %record.user_id,
                step = record.current_step,
                "Progress record did not match the step catalog, reconciled"
            );
            reconciled += 1;
        }
    }
    if reconciled > 0 {
        store.save_all(table).await?;
        info!(reconciled, total_steps, "Reconciled progress records saved");
    }
    Ok(())
}

/// The task that owns the table.
struct TrackerActor {
    table: ProgressTable,
    store: Arc<dyn ProgressStore>,
    total_steps: usize,
}

impl TrackerActor {
    async fn run(mut self, mut rx: mpsc::Receiver<Request>) {
        while let Some(request) = rx.recv().await {
            match request {
                Request::Mutate {
                    user_id,
                    mutation,
                    reply,
                } => {
                    let result = self.apply(&user_id, mutation).await;
                    // Caller may have gone away; the mutation stands either way.
                    let _ = reply.send(result);
                }
                Request::Get { user_id, reply } => {
                    let _ = reply.send(self.table.get(&user_id).cloned());
                }
                Request::Snapshot { reply } => {
                    let mut records: Vec<ProgressRecord> = self.table.values().cloned().collect();
                    records.sort_by(|a, b| a.user_id.cmp(&b.user_id));
                    let _ = reply.send(records);
                }
            }
        }
        info!("Progress tracker stopped");
    }

    async fn apply(
        &mut self,
        user_id: &str,
        mutation: Mutation,
    ) -> Result<TrackerUpdate, TutorialError> {
        let op = mutation.name();
        let now = Utc::now();
        let existing = self.table.get(user_id).cloned();

        let (record, changed) = match (mutation, existing) {
            (Mutation::Start { .. }, Some(record)) => (record, false),
            (Mutation::Start { guild_id, username }, None) => (
                ProgressRecord::new(user_id, &guild_id, username.as_deref(), now),
                true,
            ),
            (Mutation::Update(update), existing) => {
                // Arguments are checked before state so a bad score is
                // reported as such even for unknown users.
                if let Update::Feedback { step, score } = update {
                    validate_feedback(step, score, self.total_steps)?;
                }
                let mut record = existing.ok_or_else(|| TutorialError::NoActiveTutorial {
                    user_id: user_id.to_string(),
                })?;
                let changed = self.update_record(&mut record, update, now)?;
                (record, changed)
            }
        };

        if !changed {
            debug!(user_id = %user_id, op, "No-op tutorial operation");
            return Ok(TrackerUpdate {
                record,
                changed: false,
            });
        }

        let previous = self.table.insert(user_id.to_string(), record.clone());
        if let Err(e) = self.store.save_all(&self.table).await {
            match previous {
                Some(previous) => {
                    self.table.insert(user_id.to_string(), previous);
                }
                None => {
                    self.table.remove(user_id);
                }
            }
            error!(user_id = %user_id, op, error = %e, "Failed to persist progress, change rolled back");
            return Err(e.into());
        }

        info!(
            user_id = %user_id,
            op,
            step = record.current_step,
            state = %record.state(self.total_steps),
            "Tutorial progress updated"
        );
        Ok(TrackerUpdate {
            record,
            changed: true,
        })
    }

    /// Apply an update to a copy of the record. Returns whether it changed.
    fn update_record(
        &self,
        record: &mut ProgressRecord,
        update: Update,
        now: DateTime<Utc>,
    ) -> Result<bool, TutorialError> {
        match update {
            Update::Advance | Update::Skip => {
                let progression = if matches!(update, Update::Advance) {
                    record.advance(self.total_steps, now)?
                } else {
                    record.skip(self.total_steps, now)?
                };
                if progression == Progression::Finished {
                    info!(
                        user_id = %record.user_id,
                        completed = record.completed_steps.len(),
                        total_steps = self.total_steps,
                        "Tutorial completed"
                    );
                }
                Ok(true)
            }
            Update::Pause => record.set_paused(true, self.total_steps, now),
            Update::Resume => record.set_paused(false, self.total_steps, now),
            Update::Feedback { step, score } => {
                let score = validate_feedback(step, score, self.total_steps)?;
                record.set_feedback(step, score, now);
                Ok(true)
            }
            Update::Reminder => {
                if !record.state(self.total_steps).can_progress() {
                    return Err(TutorialError::NoActiveTutorial {
                        user_id: record.user_id.clone(),
                    });
                }
                record.reminder_count = record.reminder_count.saturating_add(1);
                Ok(true)
            }
        }
    }
}
