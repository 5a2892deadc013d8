//! Dashboard snapshot published by the view synchronizer.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{Camera, IncidentWithCamera, Timeline};

/// Outcome of the most recent fetch for one slice of the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum FetchStatus {
    /// Nothing fetched yet.
    Pending,
    Ok,
    /// The fetch failed; the slice holds an empty value.
    Failed { message: String },
}

impl FetchStatus {
    pub fn is_failed(&self) -> bool {
        matches!(self, FetchStatus::Failed { .. })
    }
}

/// Data for one slice together with how it was obtained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Slice<T> {
    pub data: T,
    pub status: FetchStatus,
}

impl<T: Default> Slice<T> {
    pub fn pending() -> Self {
        Self {
            data: T::default(),
            status: FetchStatus::Pending,
        }
    }

    pub fn ok(data: T) -> Self {
        Self {
            data,
            status: FetchStatus::Ok,
        }
    }

    /// An empty slice flagged as failed.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            data: T::default(),
            status: FetchStatus::Failed {
                message: message.into(),
            },
        }
    }
}

/// Everything the dashboard renders, as of the last refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardSnapshot {
    /// Bumped on every published change.
    pub version: u64,
    pub refreshed_at: Option<DateTime<Utc>>,
    pub incidents: Slice<Vec<IncidentWithCamera>>,
    pub cameras: Slice<Vec<Camera>>,
    pub timeline: Slice<Timeline>,
}

impl DashboardSnapshot {
    /// Number of incidents not yet resolved.
    pub fn unresolved_count(&self) -> usize {
        self.incidents
            .data
            .iter()
            .filter(|i| !i.incident.resolved)
            .count()
    }
}

impl Default for DashboardSnapshot {
    fn default() -> Self {
        Self {
            version: 0,
            refreshed_at: None,
            incidents: Slice::pending(),
            cameras: Slice::pending(),
            timeline: Slice::pending(),
        }
    }
}
