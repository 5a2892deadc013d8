pub mod cameras;
pub mod dashboard;
pub mod events;
pub mod health;
pub mod incidents;
pub mod timeline;
