//! Integration tests for the tutorial engine's HTTP surface.
//!
//! Each test spins up an Axum server on a random port backed by a real JSON
//! store in a temp dir, drives the engine through the command router, and
//! checks the REST contract with reqwest.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::net::TcpListener;
use tokio::time::timeout;

use tutorial_engine::channels::InboundEvent;
use tutorial_engine::store::{JsonFileStore, ProgressStore};
use tutorial_engine::tutorial::catalog::base_steps;
use tutorial_engine::tutorial::{
    CommandRouter, ProgressTracker, StepCatalog, TutorialRouteState, tutorial_routes,
};

/// Maximum time any test is allowed to run before we consider it hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Start an Axum server on a random port over the store at `path`.
async fn start_server(path: &Path) -> (u16, CommandRouter) {
    let catalog = StepCatalog::new(base_steps()).unwrap();
    let store: Arc<dyn ProgressStore> = Arc::new(JsonFileStore::new(path));
    let (tracker, _handle) = ProgressTracker::spawn(store, catalog.len()).await.unwrap();

    let app = tutorial_routes(TutorialRouteState {
        tracker: tracker.clone(),
        catalog: catalog.clone(),
    });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Give the server a moment to start accepting connections.
    tokio::time::sleep(Duration::from_millis(50)).await;

    (port, CommandRouter::new(tracker, catalog))
}

async fn get_json(port: u16, path: &str) -> (reqwest::StatusCode, Value) {
    let resp = reqwest::get(format!("http://127.0.0.1:{port}{path}"))
        .await
        .unwrap();
    let status = resp.status();
    (status, resp.json().await.unwrap())
}

async fn send(router: &CommandRouter, user: &str, text: &str) {
    router
        .handle_event(&InboundEvent::command(user, "g1", text))
        .await
        .unwrap();
}

#[tokio::test]
async fn health_endpoint() {
    timeout(TEST_TIMEOUT, async {
        let dir = tempfile::tempdir().unwrap();
        let (port, _router) = start_server(&dir.path().join("progress.json")).await;

        let (status, json) = get_json(port, "/health").await;
        assert_eq!(status, 200);
        assert_eq!(json["status"], "ok");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn steps_endpoint_lists_catalog() {
    timeout(TEST_TIMEOUT, async {
        let dir = tempfile::tempdir().unwrap();
        let (port, _router) = start_server(&dir.path().join("progress.json")).await;

        let (status, json) = get_json(port, "/api/tutorial/steps").await;
        assert_eq!(status, 200);
        let steps = json.as_array().unwrap();
        assert_eq!(steps.len(), base_steps().len());
        assert_eq!(steps[0]["index"], 0);
        assert_eq!(steps[0]["title"], "Welcome!");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn progress_unknown_user_is_404() {
    timeout(TEST_TIMEOUT, async {
        let dir = tempfile::tempdir().unwrap();
        let (port, _router) = start_server(&dir.path().join("progress.json")).await;

        let (status, json) = get_json(port, "/api/tutorial/progress/nobody").await;
        assert_eq!(status, 404);
        assert!(json["error"].is_string());
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn progress_and_stats_follow_commands() {
    timeout(TEST_TIMEOUT, async {
        let dir = tempfile::tempdir().unwrap();
        let (port, router) = start_server(&dir.path().join("progress.json")).await;

        router
            .handle_event(&InboundEvent::member_join("alice", "g1", "Alice"))
            .await
            .unwrap();
        send(&router, "alice", "next").await;
        send(&router, "alice", "1 5").await;

        router
            .handle_event(&InboundEvent::member_join("bob", "g1", "Bob"))
            .await
            .unwrap();
        send(&router, "bob", "skip").await;
        send(&router, "bob", "pause").await;

        let (status, json) = get_json(port, "/api/tutorial/progress/alice").await;
        assert_eq!(status, 200);
        assert_eq!(json["state"], "in_progress");
        assert_eq!(json["record"]["current_step"], 1);
        assert_eq!(json["record"]["completed_steps"], serde_json::json!([0]));
        assert_eq!(json["record"]["feedback_scores"]["0"], 5);

        let (_, json) = get_json(port, "/api/tutorial/progress/bob").await;
        assert_eq!(json["state"], "paused");

        let (status, json) = get_json(port, "/api/tutorial/stats").await;
        assert_eq!(status, 200);
        assert_eq!(json["total_users"], 2);
        assert_eq!(json["completed_users"], 0);
        assert_eq!(json["completion_rate"], 0.0);
        assert_eq!(json["step_abandonment_rate"]["0"], 0.5);
        assert_eq!(json["average_feedback_score"]["0"], 5.0);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn progress_survives_restart() {
    timeout(TEST_TIMEOUT, async {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("progress.json");

        {
            let (_port, router) = start_server(&path).await;
            send(&router, "carol", "start").await;
            send(&router, "carol", "done").await;
            send(&router, "carol", "done").await;
        }

        let (port, _router) = start_server(&path).await;
        let (status, json) = get_json(port, "/api/tutorial/progress/carol").await;
        assert_eq!(status, 200);
        assert_eq!(json["record"]["current_step"], 2);
        assert_eq!(json["record"]["completed_steps"], serde_json::json!([0, 1]));
    })
    .await
    .expect("test timed out");
}
