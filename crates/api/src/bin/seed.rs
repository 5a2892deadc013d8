//! Replaces the contents of the database with sample cameras and incidents.

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::info;
use validator::Validate;

use persistence::repositories::{CameraRepository, IncidentRepository};
use sentinel_watch_api::{config::Config, middleware::logging::init_logging, seed};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::load()?;
    init_logging(&config.logging);

    let pool = persistence::db::create_pool(&config.database.pool_config()).await?;
    persistence::db::run_migrations(&pool).await?;

    let cameras = CameraRepository::new(pool.clone());
    let incidents = IncidentRepository::new(pool.clone());

    info!("Clearing existing data...");
    incidents.delete_all().await?;
    cameras.delete_all().await?;

    let mut camera_ids = Vec::new();
    for camera in seed::sample_cameras() {
        camera.validate()?;
        let created = cameras
            .create(&camera.name, &camera.location)
            .await
            .with_context(|| format!("inserting camera {}", camera.name))?;
        camera_ids.push(created.id);
    }
    info!(count = camera_ids.len(), "Inserted cameras");

    let generated = seed::sample_incidents(&mut rand::thread_rng(), &camera_ids, Utc::now());
    for incident in &generated {
        incident.validate()?;
        incidents.create(incident).await.context("inserting incident")?;
    }
    info!(count = generated.len(), "Inserted incidents");

    pool.close().await;
    info!("Database seeded");
    Ok(())
}
