//! Dashboard snapshot route.

use axum::{extract::State, Json};

use crate::app::AppState;
use domain::models::DashboardSnapshot;
use domain::services::ViewSynchronizer;

/// GET /api/v1/dashboard
///
/// The synchronized snapshot when realtime updates run, otherwise a one-off
/// load. Slices that failed to load are empty and flagged `failed`.
pub async fn get_dashboard(State(state): State<AppState>) -> Json<DashboardSnapshot> {
    if let Some(realtime) = &state.realtime {
        return Json(realtime.dashboard());
    }

    let sync = ViewSynchronizer::new(state.store.clone(), state.offset);
    sync.load_initial().await;
    Json(sync.snapshot())
}
