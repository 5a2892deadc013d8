//! Camera entity (database row mapping).

use sqlx::FromRow;

use domain::models::Camera;

/// Database row mapping for the cameras table.
#[derive(Debug, Clone, FromRow)]
pub struct CameraEntity {
    pub id: i64,
    pub name: String,
    pub location: String,
}

impl From<CameraEntity> for Camera {
    fn from(entity: CameraEntity) -> Self {
        Self {
            id: entity.id,
            name: entity.name,
            location: entity.location,
        }
    }
}
