//! Shared utilities and common types for the Sentinel Watch backend.
//!
//! This crate provides functionality used across the other crates:
//! - Time-of-day formatting and the hourly timeline axis
//! - Common validation logic

pub mod time;
pub mod validation;
