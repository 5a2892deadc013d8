//! Incident repository for database operations.

use sqlx::PgPool;

use crate::entities::{IncidentEntity, IncidentWithCameraEntity};
use crate::metrics::QueryTimer;
use domain::models::NewIncident;

const SELECT_WITH_CAMERA: &str = r#"
    SELECT i.id, i.camera_id, i.type, i.t_start, i.t_end, i.thumbnail_url,
           i.resolved, i.description,
           c.name AS camera_name, c.location AS camera_location
    FROM incidents i
    JOIN cameras c ON c.id = i.camera_id
"#;

/// Repository for incident-related database operations.
#[derive(Clone)]
pub struct IncidentRepository {
    pool: PgPool,
}

impl IncidentRepository {
    /// Creates a new IncidentRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Incidents joined with their camera, newest first.
    /// `resolved` restricts the listing to that flag value when given.
    pub async fn find_all_with_camera(
        &self,
        resolved: Option<bool>,
    ) -> Result<Vec<IncidentWithCameraEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_incidents");
        let sql = format!(
            "{} WHERE ($1::BOOLEAN IS NULL OR i.resolved = $1) ORDER BY i.t_start DESC, i.id DESC",
            SELECT_WITH_CAMERA
        );
        let result = sqlx::query_as::<_, IncidentWithCameraEntity>(&sql)
            .bind(resolved)
            .fetch_all(&self.pool)
            .await;
        timer.record();
        result
    }

    /// Find one incident joined with its camera.
    pub async fn find_with_camera(
        &self,
        id: i64,
    ) -> Result<Option<IncidentWithCameraEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_incident_by_id");
        let sql = format!("{} WHERE i.id = $1", SELECT_WITH_CAMERA);
        let result = sqlx::query_as::<_, IncidentWithCameraEntity>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await;
        timer.record();
        result
    }

    /// Read only the resolved flag.
    pub async fn find_resolved(&self, id: i64) -> Result<Option<bool>, sqlx::Error> {
        let timer = QueryTimer::new("find_incident_resolved");
        let result: Result<Option<(bool,)>, sqlx::Error> = sqlx::query_as(
            r#"
            SELECT resolved FROM incidents WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result.map(|row| row.map(|(resolved,)| resolved))
    }

    /// Overwrite the resolved flag.
    /// Returns the number of rows updated (0 or 1).
    pub async fn update_resolved(&self, id: i64, resolved: bool) -> Result<u64, sqlx::Error> {
        let timer = QueryTimer::new("update_incident_resolved");
        let result = sqlx::query(
            r#"
            UPDATE incidents SET resolved = $2 WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(resolved)
        .execute(&self.pool)
        .await?;
        timer.record();
        Ok(result.rows_affected())
    }

    /// All incidents, oldest first.
    pub async fn find_all_ascending(&self) -> Result<Vec<IncidentEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_timeline_incidents");
        let result = sqlx::query_as::<_, IncidentEntity>(
            r#"
            SELECT id, camera_id, type, t_start, t_end, thumbnail_url, resolved, description
            FROM incidents
            ORDER BY t_start ASC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Insert an incident. The caller validates the payload.
    pub async fn create(&self, incident: &NewIncident) -> Result<IncidentEntity, sqlx::Error> {
        let timer = QueryTimer::new("create_incident");
        let result = sqlx::query_as::<_, IncidentEntity>(
            r#"
            INSERT INTO incidents (camera_id, type, t_start, t_end, thumbnail_url,
                                   resolved, description)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, camera_id, type, t_start, t_end, thumbnail_url, resolved, description
            "#,
        )
        .bind(incident.camera_id)
        .bind(&incident.incident_type)
        .bind(incident.t_start)
        .bind(incident.t_end)
        .bind(&incident.thumbnail_url)
        .bind(incident.resolved)
        .bind(&incident.description)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Count all incidents.
    pub async fn count(&self) -> Result<i64, sqlx::Error> {
        let timer = QueryTimer::new("count_incidents");
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM incidents")
            .fetch_one(&self.pool)
            .await?;
        timer.record();
        Ok(count.0)
    }

    /// Delete every incident.
    /// Returns the number of rows deleted.
    pub async fn delete_all(&self) -> Result<u64, sqlx::Error> {
        let timer = QueryTimer::new("delete_all_incidents");
        let result = sqlx::query("DELETE FROM incidents")
            .execute(&self.pool)
            .await?;
        timer.record();
        Ok(result.rows_affected())
    }
}
