//! PostgreSQL implementation of the domain incident store.

use sqlx::PgPool;
use tracing::error;

use crate::repositories::{CameraRepository, IncidentRepository};
use domain::models::{Camera, Incident, IncidentFilter, IncidentWithCamera};
use domain::services::IncidentStore;
use domain::DomainError;

/// Maps a driver error onto the domain taxonomy, logging the detail.
fn query_error(operation: &'static str, err: sqlx::Error) -> DomainError {
    error!(operation, error = %err, "Database query failed");
    DomainError::Query(err.to_string())
}

/// Incident store backed by the `cameras` and `incidents` tables.
#[derive(Clone)]
pub struct PgIncidentStore {
    pool: PgPool,
    incidents: IncidentRepository,
    cameras: CameraRepository,
}

impl PgIncidentStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            incidents: IncidentRepository::new(pool.clone()),
            cameras: CameraRepository::new(pool.clone()),
            pool,
        }
    }
}

#[async_trait::async_trait]
impl IncidentStore for PgIncidentStore {
    async fn list_incidents(
        &self,
        filter: IncidentFilter,
    ) -> Result<Vec<IncidentWithCamera>, DomainError> {
        let rows = self
            .incidents
            .find_all_with_camera(filter.resolved)
            .await
            .map_err(|e| query_error("list_incidents", e))?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn get_incident(&self, id: i64) -> Result<IncidentWithCamera, DomainError> {
        self.incidents
            .find_with_camera(id)
            .await
            .map_err(|e| query_error("get_incident", e))?
            .map(Into::into)
            .ok_or_else(|| DomainError::incident_not_found(id))
    }

    async fn get_resolved(&self, id: i64) -> Result<bool, DomainError> {
        self.incidents
            .find_resolved(id)
            .await
            .map_err(|e| query_error("get_resolved", e))?
            .ok_or_else(|| DomainError::incident_not_found(id))
    }

    async fn set_resolved(&self, id: i64, resolved: bool) -> Result<(), DomainError> {
        let updated = self
            .incidents
            .update_resolved(id, resolved)
            .await
            .map_err(|e| query_error("set_resolved", e))?;
        if updated == 0 {
            return Err(DomainError::incident_not_found(id));
        }
        Ok(())
    }

    async fn list_cameras(&self) -> Result<Vec<Camera>, DomainError> {
        let rows = self
            .cameras
            .find_all()
            .await
            .map_err(|e| query_error("list_cameras", e))?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn list_timeline_incidents(&self) -> Result<Vec<Incident>, DomainError> {
        let rows = self
            .incidents
            .find_all_ascending()
            .await
            .map_err(|e| query_error("list_timeline_incidents", e))?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn ping(&self) -> Result<(), DomainError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(|e| query_error("ping", e))
    }
}
