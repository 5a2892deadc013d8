//! Persistence layer for the Sentinel Watch backend.
//!
//! This crate contains:
//! - Database connection management
//! - Entity definitions (database row mappings)
//! - Repository implementations
//! - The PostgreSQL-backed incident store and change source

pub mod db;
pub mod entities;
pub mod listener;
pub mod metrics;
pub mod repositories;
pub mod store;

pub use listener::{PgChangeSource, INCIDENT_CHANGES_CHANNEL};
pub use store::PgIncidentStore;
