//! Domain error taxonomy.

use thiserror::Error;

/// Errors raised by data access, resolution and the change channel.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// The requested record does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The backing store failed to read or write.
    #[error("Query failed: {0}")]
    Query(String),

    /// The change notification channel failed to subscribe or deliver.
    #[error("Subscription failed: {0}")]
    Subscription(String),
}

impl DomainError {
    /// Shorthand for the not-found error of an incident id.
    pub fn incident_not_found(id: i64) -> Self {
        DomainError::NotFound(format!("Incident {} not found", id))
    }
}
