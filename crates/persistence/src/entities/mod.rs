//! Database entity definitions.
//!
//! Entities are direct mappings to database rows.

pub mod camera;
pub mod incident;

pub use camera::CameraEntity;
pub use incident::{IncidentEntity, IncidentWithCameraEntity};
