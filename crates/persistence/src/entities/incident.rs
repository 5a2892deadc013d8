//! Incident entities (database row mappings).

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use domain::models::{Camera, Incident, IncidentWithCamera};

/// Database row mapping for the incidents table.
#[derive(Debug, Clone, FromRow)]
pub struct IncidentEntity {
    pub id: i64,
    pub camera_id: i64,
    #[sqlx(rename = "type")]
    pub incident_type: String,
    pub t_start: DateTime<Utc>,
    pub t_end: DateTime<Utc>,
    pub thumbnail_url: String,
    pub resolved: bool,
    pub description: String,
}

/// An incident row joined with its camera columns.
#[derive(Debug, Clone, FromRow)]
pub struct IncidentWithCameraEntity {
    #[sqlx(flatten)]
    pub incident: IncidentEntity,
    pub camera_name: String,
    pub camera_location: String,
}

impl From<IncidentEntity> for Incident {
    fn from(entity: IncidentEntity) -> Self {
        Self {
            id: entity.id,
            camera_id: entity.camera_id,
            incident_type: entity.incident_type,
            t_start: entity.t_start,
            t_end: entity.t_end,
            thumbnail_url: entity.thumbnail_url,
            resolved: entity.resolved,
            description: entity.description,
        }
    }
}

impl From<IncidentWithCameraEntity> for IncidentWithCamera {
    fn from(entity: IncidentWithCameraEntity) -> Self {
        let camera = Camera {
            id: entity.incident.camera_id,
            name: entity.camera_name,
            location: entity.camera_location,
        };
        Self {
            incident: entity.incident.into(),
            camera,
        }
    }
}
