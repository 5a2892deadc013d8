//! Domain layer for the Sentinel Watch backend.
//!
//! This crate contains:
//! - Domain models (Camera, Incident, Timeline, DashboardSnapshot)
//! - The incident resolution workflow
//! - The incident change channel and the dashboard view synchronizer
//! - Domain error types

pub mod error;
pub mod models;
pub mod services;

pub use error::DomainError;
