//! Timeline route.

use axum::{extract::State, Json};

use crate::app::AppState;
use crate::error::ApiError;
use domain::models::Timeline;
use domain::services::load_timeline;

/// GET /api/v1/timeline
///
/// Hour markers `00:00`..`23:00` and every incident as a colored event,
/// oldest first.
pub async fn get_timeline(State(state): State<AppState>) -> Result<Json<Timeline>, ApiError> {
    let timeline = load_timeline(state.store.as_ref(), state.offset).await?;
    Ok(Json(timeline))
}
