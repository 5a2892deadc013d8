//! Incident resolution: flip the resolved flag and return the fresh record.
//!
//! The read and the write are not wrapped in a transaction. Two concurrent
//! toggles of the same incident race on the read and the last write wins.
//! Resolution is operator-driven and low-stakes, so no version check is made.

use serde::Serialize;
use tracing::{error, info, warn};

use super::store::IncidentStore;
use crate::error::DomainError;
use crate::models::IncidentWithCamera;

/// Message reported when the flag could not be written.
pub const UPDATE_FAILED_MESSAGE: &str = "Failed to update incident";

/// Result of a successful toggle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ResolveOutcome {
    /// The toggle was persisted and the joined record re-fetched.
    Updated(IncidentWithCamera),
    /// The toggle was persisted but the re-fetch failed.
    Degraded {
        id: i64,
        resolved: bool,
        degraded: bool,
    },
}

impl ResolveOutcome {
    pub fn id(&self) -> i64 {
        match self {
            ResolveOutcome::Updated(record) => record.id(),
            ResolveOutcome::Degraded { id, .. } => *id,
        }
    }

    /// The resolved value now stored.
    pub fn resolved(&self) -> bool {
        match self {
            ResolveOutcome::Updated(record) => record.incident.resolved,
            ResolveOutcome::Degraded { resolved, .. } => *resolved,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, ResolveOutcome::Degraded { .. })
    }
}

/// Toggles the resolved flag of incident `id`.
///
/// Fails with `NotFound` before writing anything when the id is unknown.
/// A failed write leaves the record unchanged and is reported as a query
/// error carrying [`UPDATE_FAILED_MESSAGE`].
pub async fn resolve_incident<S: IncidentStore + ?Sized>(
    store: &S,
    id: i64,
) -> Result<ResolveOutcome, DomainError> {
    let current = store.get_resolved(id).await?;
    let resolved = !current;

    store
        .set_resolved(id, resolved)
        .await
        .map_err(|e| match e {
            DomainError::Query(detail) => {
                error!(incident_id = id, error = %detail, "Incident update failed");
                DomainError::Query(UPDATE_FAILED_MESSAGE.to_string())
            }
            other => other,
        })?;

    info!(incident_id = id, resolved, "Incident resolution toggled");

    match store.get_incident(id).await {
        Ok(record) => Ok(ResolveOutcome::Updated(record)),
        Err(e) => {
            warn!(
                incident_id = id,
                resolved,
                error = %e,
                "Re-fetch after resolution failed; reporting stored value"
            );
            Ok(ResolveOutcome::Degraded {
                id,
                resolved,
                degraded: true,
            })
        }
    }
}
