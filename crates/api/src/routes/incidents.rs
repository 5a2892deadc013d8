//! Incident listing, lookup and resolution routes.

use axum::{
    extract::{rejection::PathRejection, rejection::QueryRejection, Path, Query, State},
    Json,
};
use tracing::info;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::metrics::record_incident_resolved;
use domain::models::{IncidentWithCamera, ListIncidentsQuery};
use domain::services::{resolve_incident as toggle_resolution, ResolveOutcome};

/// GET /api/v1/incidents
///
/// Incidents joined with their camera, most recent first. `?resolved=false`
/// restricts the listing to open incidents; any other value lists all.
pub async fn list_incidents(
    State(state): State<AppState>,
    query: Result<Query<ListIncidentsQuery>, QueryRejection>,
) -> Result<Json<Vec<IncidentWithCamera>>, ApiError> {
    let Query(query) = query?;
    let incidents = state.store.list_incidents(query.into()).await?;
    Ok(Json(incidents))
}

/// GET /api/v1/incidents/:id
pub async fn get_incident(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<IncidentWithCamera>, ApiError> {
    let Path(id) = id?;
    let incident = state.store.get_incident(id).await?;
    Ok(Json(incident))
}

/// PATCH /api/v1/incidents/:id/resolve
///
/// Toggles the resolved flag. When the write succeeded but the follow-up
/// read did not, the body is `{id, resolved, degraded: true}`.
pub async fn resolve_incident(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<ResolveOutcome>, ApiError> {
    let Path(id) = id?;
    let outcome = toggle_resolution(state.store.as_ref(), id).await?;

    record_incident_resolved(outcome.resolved(), outcome.is_degraded());
    info!(
        incident_id = outcome.id(),
        resolved = outcome.resolved(),
        degraded = outcome.is_degraded(),
        "Resolve request handled"
    );

    Ok(Json(outcome))
}
