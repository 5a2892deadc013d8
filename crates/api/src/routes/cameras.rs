//! Camera routes.

use axum::{extract::State, Json};

use crate::app::AppState;
use crate::error::ApiError;
use domain::models::Camera;

/// GET /api/v1/cameras
pub async fn list_cameras(State(state): State<AppState>) -> Result<Json<Vec<Camera>>, ApiError> {
    let cameras = state.store.list_cameras().await?;
    Ok(Json(cameras))
}
