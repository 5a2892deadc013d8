//! Incident change source backed by PostgreSQL `LISTEN/NOTIFY`.
//!
//! The `incidents_notify_change` trigger publishes a JSON payload
//! `{"op": "INSERT", "id": 42}` on [`INCIDENT_CHANGES_CHANNEL`] for every
//! row-level mutation.

use serde::Deserialize;
use sqlx::postgres::PgListener;
use sqlx::PgPool;
use tracing::{debug, warn};

use domain::services::{ChangeKind, ChangeSource, ChangeStream, IncidentChange};
use domain::DomainError;

/// Notification channel the incidents trigger publishes on.
pub const INCIDENT_CHANGES_CHANNEL: &str = "incident_changes";

#[derive(Debug, Deserialize)]
struct NotifyPayload {
    op: String,
    id: i64,
}

/// Parses a trigger payload into a change.
pub fn parse_payload(payload: &str) -> Result<IncidentChange, DomainError> {
    let raw: NotifyPayload = serde_json::from_str(payload)
        .map_err(|e| DomainError::Subscription(format!("malformed notification: {}", e)))?;
    let kind = ChangeKind::from_operation(&raw.op).ok_or_else(|| {
        DomainError::Subscription(format!("unknown notification operation: {}", raw.op))
    })?;
    Ok(IncidentChange::new(kind, raw.id))
}

/// Opens a dedicated listener connection per subscription.
#[derive(Clone)]
pub struct PgChangeSource {
    pool: PgPool,
}

impl PgChangeSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ChangeSource for PgChangeSource {
    async fn subscribe(&self) -> Result<Box<dyn ChangeStream>, DomainError> {
        let mut listener = PgListener::connect_with(&self.pool)
            .await
            .map_err(|e| DomainError::Subscription(e.to_string()))?;
        listener
            .listen(INCIDENT_CHANGES_CHANNEL)
            .await
            .map_err(|e| DomainError::Subscription(e.to_string()))?;
        debug!(channel = INCIDENT_CHANGES_CHANNEL, "Listening for incident changes");
        Ok(Box::new(PgChangeStream { listener }))
    }
}

struct PgChangeStream {
    listener: PgListener,
}

#[async_trait::async_trait]
impl ChangeStream for PgChangeStream {
    async fn next_change(&mut self) -> Result<IncidentChange, DomainError> {
        loop {
            // try_recv reports a lost connection as Ok(None) instead of
            // silently reconnecting, so the channel can resync.
            let notification = self
                .listener
                .try_recv()
                .await
                .map_err(|e| DomainError::Subscription(e.to_string()))?
                .ok_or_else(|| {
                    DomainError::Subscription("listener connection lost".to_string())
                })?;

            match parse_payload(notification.payload()) {
                Ok(change) => return Ok(change),
                Err(e) => warn!(error = %e, "Ignoring incident notification"),
            }
        }
    }
}
