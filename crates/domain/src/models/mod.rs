//! Domain models for Sentinel Watch.

pub mod camera;
pub mod dashboard;
pub mod incident;
pub mod timeline;

pub use camera::{Camera, NewCamera};
pub use dashboard::{DashboardSnapshot, FetchStatus, Slice};
pub use incident::{Incident, IncidentFilter, IncidentWithCamera, ListIncidentsQuery, NewIncident};
pub use timeline::{Timeline, TimelineEvent};
