//! REST endpoints for tutorial health, progress and statistics.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use tracing::warn;

use super::catalog::StepCatalog;
use super::stats::TutorialStats;
use super::tracker::ProgressTracker;
use crate::error::TutorialError;

/// Shared state for tutorial routes.
#[derive(Clone)]
pub struct TutorialRouteState {
    pub tracker: ProgressTracker,
    pub catalog: StepCatalog,
}

/// Build the tutorial REST routes.
pub fn tutorial_routes(state: TutorialRouteState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/tutorial/stats", get(get_stats))
        .route("/api/tutorial/steps", get(get_steps))
        .route("/api/tutorial/progress/{user_id}", get(get_progress))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "tutorial-engine"
    }))
}

fn unavailable(err: &TutorialError) -> axum::response::Response {
    warn!(error = %err, "Tutorial API request failed");
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(serde_json::json!({"error": err.to_string()})),
    )
        .into_response()
}

/// GET /api/tutorial/stats
async fn get_stats(State(state): State<TutorialRouteState>) -> impl IntoResponse {
    match state.tracker.snapshot().await {
        Ok(snapshot) => {
            Json(TutorialStats::compute(&snapshot, state.catalog.len())).into_response()
        }
        Err(e) => unavailable(&e),
    }
}

/// GET /api/tutorial/steps
async fn get_steps(State(state): State<TutorialRouteState>) -> impl IntoResponse {
    Json(state.catalog.steps().to_vec())
}

/// GET /api/tutorial/progress/{user_id}
///
/// The user's record plus its derived state, or 404 if the user never started.
async fn get_progress(
    State(state): State<TutorialRouteState>,
    Path(user_id): Path<String>,
) -> impl IntoResponse {
    match state.tracker.get(&user_id).await {
        Ok(Some(record)) => Json(serde_json::json!({
            "state": record.state(state.catalog.len()),
            "record": record,
        }))
        .into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({"error": "No tutorial progress for this user"})),
        )
            .into_response(),
        Err(e) => unavailable(&e),
    }
}
