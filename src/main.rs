use std::sync::Arc;

use anyhow::Context;
use futures::StreamExt;
use tokio::sync::mpsc;

use tutorial_engine::channels::{CliChannel, Messenger, StdoutMessenger, WebhookMessenger};
use tutorial_engine::config::TutorialConfig;
use tutorial_engine::store::{JsonFileStore, ProgressStore};
use tutorial_engine::tutorial::reminder::{self, ReminderEvent};
use tutorial_engine::tutorial::{
    CommandRouter, ProgressTracker, StepCatalog, TutorialRouteState, tutorial_routes,
};

/// Pending reminder events before the scheduler waits on delivery.
const REMINDER_QUEUE_CAPACITY: usize = 64;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = TutorialConfig::from_env().context("invalid configuration")?;

    eprintln!("🎓 Tutorial Engine v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Store: {}", config.store_path.display());
    eprintln!("   HTTP: http://0.0.0.0:{}/health", config.http_port);

    // ── Catalog ─────────────────────────────────────────────────────────
    let catalog = StepCatalog::load(config.include_base_steps, config.custom_steps_path.as_deref())
        .await
        .context("no tutorial steps configured")?;
    eprintln!("   Steps: {}", catalog.len());

    // ── Progress tracker ────────────────────────────────────────────────
    let store: Arc<dyn ProgressStore> = Arc::new(JsonFileStore::new(config.store_path.clone()));
    let (tracker, _tracker_handle) = ProgressTracker::spawn(store, catalog.len())
        .await
        .with_context(|| format!("failed to load {}", config.store_path.display()))?;

    // ── Outbound messages ───────────────────────────────────────────────
    let messenger: Arc<dyn Messenger> = match &config.webhook_url {
        Some(url) => Arc::new(WebhookMessenger::new(url.clone())),
        None => Arc::new(StdoutMessenger),
    };
    eprintln!("   Delivery: {}", messenger.name());

    // ── Reminders ───────────────────────────────────────────────────────
    let (reminder_tx, reminder_rx) = mpsc::channel::<ReminderEvent>(REMINDER_QUEUE_CAPACITY);
    let scheduler =
        reminder::spawn_reminder_scheduler(tracker.clone(), config.reminder.clone(), reminder_tx);
    let dispatcher = tokio::spawn(reminder::dispatch_reminders(
        reminder_rx,
        tracker.clone(),
        catalog.clone(),
        Arc::clone(&messenger),
    ));

    // ── HTTP server ─────────────────────────────────────────────────────
    let app = tutorial_routes(TutorialRouteState {
        tracker: tracker.clone(),
        catalog: catalog.clone(),
    });
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.http_port))
        .await
        .with_context(|| format!("failed to bind HTTP port {}", config.http_port))?;
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "HTTP server stopped");
        }
    });

    // ── Event loop ──────────────────────────────────────────────────────
    eprintln!("   Events: join <user> <guild> [name] | cmd <user> <guild> <text> | react <user> <guild> <emoji>\n");
    let router = CommandRouter::new(tracker, catalog);
    let mut events = CliChannel::new().start();
    let interrupted = tokio::signal::ctrl_c();
    tokio::pin!(interrupted);

    loop {
        tokio::select! {
            event = events.next() => {
                let Some(event) = event else {
                    tracing::info!("Input closed, shutting down");
                    break;
                };
                if let Err(e) = router.dispatch(&event, messenger.as_ref()).await {
                    tracing::error!(error = %e, "Progress tracker unavailable, shutting down");
                    break;
                }
            }
            _ = &mut interrupted => {
                tracing::info!("Interrupted, shutting down");
                break;
            }
        }
    }

    // Scheduler first so no reminder is cut off mid-tick.
    scheduler.shutdown().await;
    dispatcher.await.ok();

    Ok(())
}
