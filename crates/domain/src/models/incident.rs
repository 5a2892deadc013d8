//! Incident domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use super::camera::Camera;

/// Well-known incident type labels. The set is open-ended.
pub mod types {
    pub const UNAUTHORISED_ACCESS: &str = "Unauthorised Access";
    pub const GUN_THREAT: &str = "Gun Threat";
    pub const FACE_RECOGNISED: &str = "Face Recognised";
    pub const SUSPICIOUS_PACKAGE: &str = "Suspicious Package";
    pub const PERIMETER_BREACH: &str = "Perimeter Breach";
    pub const MULTIPLE_EVENTS: &str = "Multiple Events";

    /// Labels produced by the seeding process.
    pub const SEEDED: [&str; 5] = [
        UNAUTHORISED_ACCESS,
        GUN_THREAT,
        FACE_RECOGNISED,
        SUSPICIOUS_PACKAGE,
        PERIMETER_BREACH,
    ];
}

/// A detected security event tied to one camera.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Incident {
    pub id: i64,
    pub camera_id: i64,
    #[serde(rename = "type")]
    pub incident_type: String,
    pub t_start: DateTime<Utc>,
    pub t_end: DateTime<Utc>,
    pub thumbnail_url: String,
    pub resolved: bool,
    pub description: String,
}

/// An incident joined with the camera that captured it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentWithCamera {
    #[serde(flatten)]
    pub incident: Incident,
    pub camera: Camera,
}

impl IncidentWithCamera {
    pub fn id(&self) -> i64 {
        self.incident.id
    }
}

/// Row filter for incident listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IncidentFilter {
    /// `Some(false)` keeps unresolved incidents only, `None` keeps everything.
    pub resolved: Option<bool>,
}

impl IncidentFilter {
    pub fn all() -> Self {
        Self { resolved: None }
    }

    pub fn unresolved() -> Self {
        Self {
            resolved: Some(false),
        }
    }

    pub fn matches(&self, incident: &Incident) -> bool {
        self.resolved.map_or(true, |r| incident.resolved == r)
    }
}

/// Query parameters for `GET /incidents`.
///
/// Only the literal `resolved=false` narrows the listing. Any other value,
/// including `true` and the empty string, lists everything.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListIncidentsQuery {
    #[serde(default)]
    pub resolved: Option<String>,
}

impl From<ListIncidentsQuery> for IncidentFilter {
    fn from(query: ListIncidentsQuery) -> Self {
        match query.resolved.as_deref() {
            Some("false") => Self::unresolved(),
            _ => Self::all(),
        }
    }
}

/// Sorts incidents most recent first, ties broken by id.
pub fn sort_newest_first(incidents: &mut [IncidentWithCamera]) {
    incidents.sort_by(|a, b| {
        b.incident
            .t_start
            .cmp(&a.incident.t_start)
            .then_with(|| b.incident.id.cmp(&a.incident.id))
    });
}

/// Sorts incidents oldest first, ties broken by id.
pub fn sort_oldest_first(incidents: &mut [Incident]) {
    incidents.sort_by(|a, b| a.t_start.cmp(&b.t_start).then_with(|| a.id.cmp(&b.id)));
}

/// Payload for recording a new incident (seeding and ingestion).
#[derive(Debug, Clone, Deserialize, Validate)]
#[validate(schema(function = "validate_incident_window"))]
pub struct NewIncident {
    pub camera_id: i64,

    #[serde(rename = "type")]
    #[validate(length(min = 1, max = 100, message = "Type must be 1-100 characters"))]
    pub incident_type: String,

    pub t_start: DateTime<Utc>,

    pub t_end: DateTime<Utc>,

    #[validate(url(message = "Thumbnail must be a valid URL"))]
    pub thumbnail_url: String,

    #[serde(default)]
    pub resolved: bool,

    #[serde(default)]
    pub description: String,
}

fn validate_incident_window(incident: &NewIncident) -> Result<(), ValidationError> {
    shared::validation::validate_time_window(incident.t_start, incident.t_end)
}
