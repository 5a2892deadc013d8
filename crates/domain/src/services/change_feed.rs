//! Change notification channel for the incidents collection.
//!
//! A background task keeps one subscription to a [`ChangeSource`] open,
//! republishes every change on a broadcast channel and reports its
//! [`ChannelState`] on a watch channel. Delivery errors drop the channel to
//! `Disconnected` and a resubscription is scheduled per [`ReconnectPolicy`].

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::DomainError;

/// Kind of mutation observed on the incidents collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
    /// Emitted after a reconnect; changes may have been missed meanwhile.
    Resync,
}

impl ChangeKind {
    /// Parses a database trigger operation name (`INSERT`, `UPDATE`, `DELETE`).
    pub fn from_operation(op: &str) -> Option<Self> {
        match op.to_ascii_uppercase().as_str() {
            "INSERT" => Some(ChangeKind::Insert),
            "UPDATE" => Some(ChangeKind::Update),
            "DELETE" => Some(ChangeKind::Delete),
            _ => None,
        }
    }
}

/// A single change notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentChange {
    pub kind: ChangeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub incident_id: Option<i64>,
}

impl IncidentChange {
    pub fn new(kind: ChangeKind, incident_id: i64) -> Self {
        Self {
            kind,
            incident_id: Some(incident_id),
        }
    }

    pub fn resync() -> Self {
        Self {
            kind: ChangeKind::Resync,
            incident_id: None,
        }
    }
}

/// Lifecycle of the channel subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelState {
    Disconnected,
    Subscribing,
    Active,
    /// Reconnect attempts exhausted; the channel no longer retries.
    Failed,
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelState::Disconnected => write!(f, "disconnected"),
            ChannelState::Subscribing => write!(f, "subscribing"),
            ChannelState::Active => write!(f, "active"),
            ChannelState::Failed => write!(f, "failed"),
        }
    }
}

/// How the channel waits between resubscription attempts.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectPolicy {
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Growth factor applied per consecutive failure. 1.0 keeps the delay fixed.
    pub multiplier: f64,
    /// Upper bound for the delay.
    pub max_delay: Duration,
    /// Consecutive failures tolerated before giving up. 0 retries forever.
    pub max_attempts: u32,
}

impl ReconnectPolicy {
    /// Retries forever with a constant delay.
    pub fn fixed(delay: Duration) -> Self {
        Self {
            initial_delay: delay,
            multiplier: 1.0,
            max_delay: delay,
            max_attempts: 0,
        }
    }

    /// Delay before retry number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(32) as i32;
        let factor = self.multiplier.max(1.0).powi(exponent);
        let millis = self.initial_delay.as_millis() as f64 * factor;
        let capped = millis.min(self.max_delay.as_millis() as f64);
        Duration::from_millis(capped as u64)
    }

    /// Whether `failures` consecutive failures exhaust the policy.
    pub fn is_exhausted(&self, failures: u32) -> bool {
        self.max_attempts > 0 && failures > self.max_attempts
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(1000),
            multiplier: 2.0,
            max_delay: Duration::from_millis(30_000),
            max_attempts: 10,
        }
    }
}

/// Something that can open a stream of incident changes.
#[async_trait::async_trait]
pub trait ChangeSource: Send + Sync {
    async fn subscribe(&self) -> Result<Box<dyn ChangeStream>, DomainError>;
}

/// An open subscription. An error ends the stream.
#[async_trait::async_trait]
pub trait ChangeStream: Send {
    async fn next_change(&mut self) -> Result<IncidentChange, DomainError>;
}

/// What a subscriber receives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Change(IncidentChange),
    /// The subscriber fell behind and this many changes were dropped.
    Missed(u64),
}

/// A subscriber's handle on the channel. Dropping it unsubscribes.
pub struct Subscription {
    rx: broadcast::Receiver<IncidentChange>,
}

impl Subscription {
    pub fn new(rx: broadcast::Receiver<IncidentChange>) -> Self {
        Self { rx }
    }

    /// Waits for the next delivery. `None` once the channel is shut down.
    pub async fn next(&mut self) -> Option<Delivery> {
        match self.rx.recv().await {
            Ok(change) => Some(Delivery::Change(change)),
            Err(broadcast::error::RecvError::Lagged(n)) => Some(Delivery::Missed(n)),
            Err(broadcast::error::RecvError::Closed) => None,
        }
    }

    /// Discards everything already queued and returns how many deliveries
    /// were dropped.
    pub fn drain(&mut self) -> usize {
        let mut drained = 0;
        loop {
            match self.rx.try_recv() {
                Ok(_) | Err(broadcast::error::TryRecvError::Lagged(_)) => drained += 1,
                Err(_) => return drained,
            }
        }
    }
}

/// Entry point for starting the channel task.
pub struct ChangeChannel;

impl ChangeChannel {
    /// Spawns the subscription loop. Must be called inside a tokio runtime.
    pub fn start(
        source: Arc<dyn ChangeSource>,
        policy: ReconnectPolicy,
        capacity: usize,
    ) -> ChangeChannelHandle {
        let (events_tx, _) = broadcast::channel(capacity.max(1));
        let (state_tx, state_rx) = watch::channel(ChannelState::Disconnected);
        let cancel = CancellationToken::new();

        let task = tokio::spawn(run_channel(
            source,
            policy,
            events_tx.clone(),
            state_tx,
            cancel.clone(),
        ));

        ChangeChannelHandle {
            events: events_tx,
            state: state_rx,
            cancel,
            task: Some(task),
        }
    }
}

/// Owner of a running channel. Dropping it stops the subscription loop.
pub struct ChangeChannelHandle {
    events: broadcast::Sender<IncidentChange>,
    state: watch::Receiver<ChannelState>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl ChangeChannelHandle {
    /// Registers a new subscriber.
    pub fn subscribe(&self) -> Subscription {
        Subscription::new(self.events.subscribe())
    }

    /// Sender side, for components that hand out their own subscriptions.
    pub fn sender(&self) -> broadcast::Sender<IncidentChange> {
        self.events.clone()
    }

    pub fn state(&self) -> ChannelState {
        *self.state.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<ChannelState> {
        self.state.clone()
    }

    /// Stops the subscription loop and waits for it to finish.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("Change channel task panicked: {}", e);
            }
        }
        info!("Change channel shut down");
    }
}

impl Drop for ChangeChannelHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run_channel(
    source: Arc<dyn ChangeSource>,
    policy: ReconnectPolicy,
    events: broadcast::Sender<IncidentChange>,
    state: watch::Sender<ChannelState>,
    cancel: CancellationToken,
) {
    let mut failures: u32 = 0;
    let mut connected_before = false;

    loop {
        state.send_replace(ChannelState::Subscribing);

        let subscribed = tokio::select! {
            _ = cancel.cancelled() => break,
            result = source.subscribe() => result,
        };

        match subscribed {
            Ok(mut stream) => {
                failures = 0;
                state.send_replace(ChannelState::Active);
                info!("Incident change channel active");

                if connected_before {
                    let _ = events.send(IncidentChange::resync());
                }
                connected_before = true;

                loop {
                    let next = tokio::select! {
                        _ = cancel.cancelled() => {
                            state.send_replace(ChannelState::Disconnected);
                            return;
                        }
                        result = stream.next_change() => result,
                    };

                    match next {
                        Ok(change) => {
                            debug!(
                                kind = ?change.kind,
                                incident_id = ?change.incident_id,
                                "Incident change received"
                            );
                            // No receivers is fine; nobody is watching yet.
                            let _ = events.send(change);
                        }
                        Err(e) => {
                            warn!(error = %e, "Incident change delivery failed");
                            break;
                        }
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "Incident change subscription failed");
            }
        }

        failures += 1;
        state.send_replace(ChannelState::Disconnected);

        if policy.is_exhausted(failures) {
            error!(
                attempts = failures - 1,
                "Incident change channel giving up after repeated failures"
            );
            state.send_replace(ChannelState::Failed);
            return;
        }

        let delay = policy.delay_for(failures);
        info!(
            attempt = failures,
            delay_ms = delay.as_millis() as u64,
            "Scheduling incident change resubscription"
        );

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(delay) => {}
        }
    }

    state.send_replace(ChannelState::Disconnected);
}
