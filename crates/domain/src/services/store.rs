//! Data access seam for cameras and incidents.

use std::sync::Arc;

use chrono::FixedOffset;

use crate::error::DomainError;
use crate::models::{Camera, Incident, IncidentFilter, IncidentWithCamera, Timeline};

/// Read access to cameras and incidents plus the single mutation the
/// dashboard performs (the resolved flag).
#[async_trait::async_trait]
pub trait IncidentStore: Send + Sync {
    /// Incidents joined with their camera, newest first.
    async fn list_incidents(
        &self,
        filter: IncidentFilter,
    ) -> Result<Vec<IncidentWithCamera>, DomainError>;

    /// One incident joined with its camera, or `NotFound`.
    async fn get_incident(&self, id: i64) -> Result<IncidentWithCamera, DomainError>;

    /// Current resolved flag of an incident, or `NotFound`.
    async fn get_resolved(&self, id: i64) -> Result<bool, DomainError>;

    /// Overwrites the resolved flag. `NotFound` when no row was updated.
    async fn set_resolved(&self, id: i64, resolved: bool) -> Result<(), DomainError>;

    /// All cameras, in no particular order.
    async fn list_cameras(&self) -> Result<Vec<Camera>, DomainError>;

    /// All incidents without the camera join, oldest first.
    async fn list_timeline_incidents(&self) -> Result<Vec<Incident>, DomainError>;

    /// Cheap connectivity check used by health probes.
    async fn ping(&self) -> Result<(), DomainError>;
}

#[async_trait::async_trait]
impl<S: IncidentStore + ?Sized> IncidentStore for Arc<S> {
    async fn list_incidents(
        &self,
        filter: IncidentFilter,
    ) -> Result<Vec<IncidentWithCamera>, DomainError> {
        (**self).list_incidents(filter).await
    }

    async fn get_incident(&self, id: i64) -> Result<IncidentWithCamera, DomainError> {
        (**self).get_incident(id).await
    }

    async fn get_resolved(&self, id: i64) -> Result<bool, DomainError> {
        (**self).get_resolved(id).await
    }

    async fn set_resolved(&self, id: i64, resolved: bool) -> Result<(), DomainError> {
        (**self).set_resolved(id, resolved).await
    }

    async fn list_cameras(&self) -> Result<Vec<Camera>, DomainError> {
        (**self).list_cameras().await
    }

    async fn list_timeline_incidents(&self) -> Result<Vec<Incident>, DomainError> {
        (**self).list_timeline_incidents().await
    }

    async fn ping(&self) -> Result<(), DomainError> {
        (**self).ping().await
    }
}

/// Loads every incident and maps it onto the 24-hour timeline.
pub async fn load_timeline<S: IncidentStore + ?Sized>(
    store: &S,
    offset: FixedOffset,
) -> Result<Timeline, DomainError> {
    let incidents = store.list_timeline_incidents().await?;
    Ok(Timeline::build(incidents, offset))
}
