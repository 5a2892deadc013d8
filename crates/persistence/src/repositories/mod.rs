//! Repository implementations for database operations.

pub mod camera;
pub mod incident;

pub use camera::CameraRepository;
pub use incident::IncidentRepository;
