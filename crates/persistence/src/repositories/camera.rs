//! Camera repository for database operations.

use sqlx::PgPool;

use crate::entities::CameraEntity;
use crate::metrics::QueryTimer;

/// Repository for camera-related database operations.
#[derive(Clone)]
pub struct CameraRepository {
    pool: PgPool,
}

impl CameraRepository {
    /// Creates a new CameraRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// List every camera.
    pub async fn find_all(&self) -> Result<Vec<CameraEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_cameras");
        let result = sqlx::query_as::<_, CameraEntity>(
            r#"
            SELECT id, name, location FROM cameras ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Insert a camera.
    pub async fn create(&self, name: &str, location: &str) -> Result<CameraEntity, sqlx::Error> {
        let timer = QueryTimer::new("create_camera");
        let result = sqlx::query_as::<_, CameraEntity>(
            r#"
            INSERT INTO cameras (name, location)
            VALUES ($1, $2)
            RETURNING id, name, location
            "#,
        )
        .bind(name)
        .bind(location)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Delete every camera (cascades to incidents).
    /// Returns the number of rows deleted.
    pub async fn delete_all(&self) -> Result<u64, sqlx::Error> {
        let timer = QueryTimer::new("delete_all_cameras");
        let result = sqlx::query("DELETE FROM cameras")
            .execute(&self.pool)
            .await?;
        timer.record();
        Ok(result.rows_affected())
    }
}
