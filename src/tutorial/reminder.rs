//! Reminder scheduler — periodically nudges users who have gone quiet.
//!
//! One background task ticks every `interval`. Each tick snapshots the
//! tracker, picks the records that are due, counts a reminder for each and
//! emits a [`ReminderEvent`]. A user keeps being reminded on every tick until
//! they act, pause, or hit the optional cap.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::catalog::StepCatalog;
use super::messages;
use super::model::ProgressRecord;
use super::tracker::ProgressTracker;
use crate::channels::Messenger;
use crate::config::ReminderConfig;
use crate::error::TutorialError;

/// A user who should be sent a reminder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderEvent {
    pub user_id: String,
    pub guild_id: String,
    pub current_step: usize,
}

/// Records due for a reminder at `now`, against a catalog of `total_steps`.
pub fn due_for_reminder<'a>(
    records: &'a [ProgressRecord],
    now: DateTime<Utc>,
    config: &ReminderConfig,
    total_steps: usize,
) -> Vec<&'a ProgressRecord> {
    let threshold = chrono::Duration::from_std(config.threshold).unwrap_or(chrono::Duration::MAX);
    records
        .iter()
        .filter(|r| r.is_due_for_reminder(now, threshold, config.max_reminders, total_steps))
        .collect()
}

/// Run one scan. Returns the number of reminders emitted.
///
/// The reminder is counted before the event goes out, so a user is never
/// nudged without the count being persisted. Per-user failures are logged
/// and skipped; the only error returned is a stopped tracker.
pub async fn run_tick(
    tracker: &ProgressTracker,
    config: &ReminderConfig,
    events: &mpsc::Sender<ReminderEvent>,
) -> Result<usize, TutorialError> {
    let snapshot = tracker.snapshot().await?;
    let due = due_for_reminder(&snapshot, Utc::now(), config, tracker.total_steps());
    debug!(records = snapshot.len(), due = due.len(), "Reminder tick");

    let mut sent = 0;
    for record in due {
        match tracker.record_reminder(&record.user_id).await {
            Ok(update) => {
                let event = ReminderEvent {
                    user_id: update.record.user_id.clone(),
                    guild_id: update.record.guild_id.clone(),
                    current_step: update.record.current_step,
                };
                if events.send(event).await.is_err() {
                    warn!("Reminder receiver dropped, skipping remaining reminders");
                    break;
                }
                sent += 1;
            }
            // Paused or finished since the snapshot was taken.
            Err(TutorialError::NoActiveTutorial { .. }) => {
                debug!(user_id = %record.user_id, "User no longer eligible for reminder");
            }
            Err(e @ TutorialError::TrackerUnavailable) => return Err(e),
            Err(e) => {
                warn!(user_id = %record.user_id, error = %e, "Failed to record reminder");
            }
        }
    }
    Ok(sent)
}

/// Handle to a running reminder scheduler.
pub struct ReminderHandle {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl ReminderHandle {
    /// Stop the scheduler, waiting for an in-flight tick to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.handle.await {
            warn!(error = %e, "Reminder scheduler task ended abnormally");
        }
    }
}

/// Spawn the reminder loop. The first tick fires one `interval` after start.
pub fn spawn_reminder_scheduler(
    tracker: ProgressTracker,
    config: ReminderConfig,
    events: mpsc::Sender<ReminderEvent>,
) -> ReminderHandle {
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

    let handle = tokio::spawn(async move {
        info!(
            interval_secs = config.interval.as_secs(),
            threshold_secs = config.threshold.as_secs(),
            max_reminders = ?config.max_reminders,
            "Reminder scheduler started"
        );
        let mut ticker = tokio::time::interval(config.interval);
        // Skip immediate first tick
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown_rx.changed() => break,
            }
            // A tick is never interrupted once it has begun.
            match run_tick(&tracker, &config, &events).await {
                Ok(0) => {}
                Ok(sent) => info!(sent, "Reminders sent"),
                Err(e) => {
                    warn!(error = %e, "Progress tracker stopped, ending reminder scheduler");
                    break;
                }
            }
            if *shutdown_rx.borrow() {
                break;
            }
        }
        info!("Reminder scheduler stopped");
    });

    ReminderHandle {
        shutdown: shutdown_tx,
        handle,
    }
}

/// Turn reminder events into direct messages until the channel closes.
pub async fn dispatch_reminders(
    mut events: mpsc::Receiver<ReminderEvent>,
    tracker: ProgressTracker,
    catalog: StepCatalog,
    messenger: Arc<dyn Messenger>,
) {
    while let Some(event) = events.recv().await {
        let text = match tracker.get(&event.user_id).await {
            Ok(Some(record)) => messages::reminder(&record, &catalog),
            Ok(None) => continue,
            Err(e) => {
                warn!(user_id = %event.user_id, error = %e, "Could not load record for reminder");
                continue;
            }
        };
        if let Err(e) = messenger.send_direct_message(&event.user_id, &text).await {
            warn!(
                user_id = %event.user_id,
                channel = messenger.name(),
                error = %e,
                "Failed to deliver reminder"
            );
        }
    }
    debug!("Reminder dispatcher stopped");
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::error::ChannelError;
    use crate::store::{MemoryStore, ProgressTable};
    use crate::tutorial::catalog::base_steps;

    /// Records every direct message it is asked to send.
    #[derive(Default)]
    struct RecordingMessenger {
        direct: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl Messenger for RecordingMessenger {
        fn name(&self) -> &str {
            "recording"
        }

        async fn send_direct_message(&self, user_id: &str, text: &str) -> Result<(), ChannelError> {
            self.direct
                .lock()
                .unwrap()
                .push((user_id.to_string(), text.to_string()));
            Ok(())
        }

        async fn send_channel_message(&self, _guild_id: &str, _text: &str) -> Result<(), ChannelError> {
            Ok(())
        }
    }

    fn config(threshold: Duration, max_reminders: Option<u32>) -> ReminderConfig {
        ReminderConfig {
            interval: Duration::from_millis(20),
            threshold,
            max_reminders,
        }
    }

    fn stale_record(user: &str, hours: i64) -> ProgressRecord {
        let then = Utc::now() - chrono::Duration::hours(hours);
        ProgressRecord::new(user, "g1", None, then)
    }

    #[test]
    fn stale_unpaused_record_is_due() {
        let day = config(Duration::from_secs(86_400), None);
        let mut paused = stale_record("paused", 25);
        paused.is_paused = true;
        let records = vec![stale_record("stale", 25), stale_record("fresh", 1), paused];

        let due = due_for_reminder(&records, Utc::now(), &day, 3);
        let ids: Vec<&str> = due.iter().map(|r| r.user_id.as_str()).collect();
        assert_eq!(ids, vec!["stale"]);
    }

    #[test]
    fn completed_and_capped_records_are_not_due() {
        let cfg = config(Duration::from_secs(86_400), Some(2));
        let mut done = stale_record("done", 30);
        done.current_step = 3;
        done.completion_time = Some(Utc::now());
        let mut capped = stale_record("capped", 30);
        capped.reminder_count = 2;
        let mut below_cap = stale_record("below", 30);
        below_cap.reminder_count = 1;

        // Past the last step of a 3-step catalog but never marked complete.
        let mut stranded = stale_record("stranded", 30);
        stranded.current_step = 3;

        let records = vec![done, capped, below_cap, stranded];
        let due = due_for_reminder(&records, Utc::now(), &cfg, 3);
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].user_id, "below");
    }

    async fn tracker_with(records: Vec<ProgressRecord>) -> (ProgressTracker, Arc<MemoryStore>) {
        let table: ProgressTable = records
            .into_iter()
            .map(|r| (r.user_id.clone(), r))
            .collect();
        let store = Arc::new(MemoryStore::with_table(table));
        let (tracker, _handle) = ProgressTracker::spawn(store.clone(), 3).await.unwrap();
        (tracker, store)
    }

    #[tokio::test]
    async fn tick_counts_and_emits() {
        let mut paused = stale_record("paused", 25);
        paused.is_paused = true;
        let (tracker, store) = tracker_with(vec![stale_record("stale", 25), paused]).await;
        let (tx, mut rx) = mpsc::channel(8);
        let cfg = config(Duration::from_secs(86_400), None);

        assert_eq!(run_tick(&tracker, &cfg, &tx).await.unwrap(), 1);
        let event = rx.recv().await.unwrap();
        assert_eq!(
            event,
            ReminderEvent {
                user_id: "stale".into(),
                guild_id: "g1".into(),
                current_step: 0
            }
        );
        assert_eq!(store.saved().unwrap()["stale"].reminder_count, 1);

        // Still stale: reminded again on the next tick.
        assert_eq!(run_tick(&tracker, &cfg, &tx).await.unwrap(), 1);
        assert_eq!(store.saved().unwrap()["stale"].reminder_count, 2);
        assert_eq!(store.saved().unwrap()["paused"].reminder_count, 0);
    }

    #[tokio::test]
    async fn failed_save_emits_nothing() {
        let (tracker, store) = tracker_with(vec![stale_record("stale", 25)]).await;
        let (tx, mut rx) = mpsc::channel(8);
        store.set_fail_writes(true);

        let cfg = config(Duration::from_secs(86_400), None);
        assert_eq!(run_tick(&tracker, &cfg, &tx).await.unwrap(), 0);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn scheduler_emits_then_shuts_down() {
        let (tracker, _store) = tracker_with(vec![stale_record("stale", 2)]).await;
        let (tx, mut rx) = mpsc::channel(8);
        let handle = spawn_reminder_scheduler(
            tracker.clone(),
            config(Duration::from_secs(3600), Some(1)),
            tx,
        );

        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.user_id, "stale");

        handle.shutdown().await;
        // Sender dropped with the task: the channel drains and closes.
        while rx.recv().await.is_some() {}
        assert_eq!(tracker.get("stale").await.unwrap().unwrap().reminder_count, 1);
    }

    #[tokio::test]
    async fn shrunken_catalog_user_is_not_reminded() {
        let mut stranded = stale_record("stranded", 30);
        stranded.current_step = 5;
        let (tracker, store) = tracker_with(vec![stranded]).await;
        let (tx, mut rx) = mpsc::channel(8);
        let cfg = config(Duration::from_secs(86_400), None);

        for _ in 0..3 {
            assert_eq!(run_tick(&tracker, &cfg, &tx).await.unwrap(), 0);
        }
        assert!(rx.try_recv().is_err());
        let saved = &store.saved().unwrap()["stranded"];
        assert_eq!(saved.reminder_count, 0);
        assert!(saved.is_completed());
    }

    #[tokio::test]
    async fn dispatcher_sends_current_step_as_direct_message() {
        let catalog = StepCatalog::new(base_steps().into_iter().take(3).collect()).unwrap();
        let mut record = stale_record("stale", 25);
        record.username = Some("Dana".into());
        record.current_step = 1;
        let (tracker, _store) = tracker_with(vec![record]).await;
        let messenger = Arc::new(RecordingMessenger::default());

        let (tx, rx) = mpsc::channel(8);
        for user_id in ["ghost", "stale"] {
            tx.send(ReminderEvent {
                user_id: user_id.into(),
                guild_id: "g1".into(),
                current_step: 1,
            })
            .await
            .unwrap();
        }
        drop(tx);

        dispatch_reminders(rx, tracker, catalog.clone(), messenger.clone()).await;

        let sent = messenger.direct.lock().unwrap().clone();
        assert_eq!(sent.len(), 1, "unknown users get nothing");
        let (target, text) = &sent[0];
        assert_eq!(target, "stale");
        assert!(text.contains("Dana"));
        assert!(text.contains(&catalog.get(1).unwrap().title));
    }
}
