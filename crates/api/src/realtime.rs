//! Wiring of the change channel and the dashboard synchronizer.
//!
//! `Realtime` owns the long-lived background tasks. Handlers only see the
//! cloneable `RealtimeState` it hands out.

use std::sync::Arc;

use chrono::FixedOffset;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};
use tracing::{info, warn};

use domain::models::DashboardSnapshot;
use domain::services::{
    ChangeChannel, ChangeChannelHandle, ChangeSource, ChannelState, IncidentChange,
    IncidentStore, MountedView, Subscription, ViewSynchronizer,
};

use crate::config::RealtimeConfig;
use crate::middleware::metrics::{record_channel_reconnect, record_channel_state};

/// Read side of the realtime components, shared with handlers.
#[derive(Clone)]
pub struct RealtimeState {
    events: broadcast::Sender<IncidentChange>,
    channel_state: watch::Receiver<ChannelState>,
    dashboard: watch::Receiver<DashboardSnapshot>,
    closing: CancellationToken,
}

impl RealtimeState {
    pub fn subscribe(&self) -> Subscription {
        Subscription::new(self.events.subscribe())
    }

    pub fn channel_state(&self) -> ChannelState {
        *self.channel_state.borrow()
    }

    pub fn dashboard(&self) -> DashboardSnapshot {
        self.dashboard.borrow().clone()
    }

    /// Resolves once long-lived client streams should end.
    pub fn closing(&self) -> WaitForCancellationFutureOwned {
        self.closing.clone().cancelled_owned()
    }

    /// Ends open client event streams so the server can drain.
    pub fn close_streams(&self) {
        self.closing.cancel();
    }
}

/// Running change channel, mounted dashboard view and state monitor.
pub struct Realtime {
    channel: ChangeChannelHandle,
    view: MountedView,
    monitor: JoinHandle<()>,
    closing: CancellationToken,
}

impl Realtime {
    /// Starts the channel, then mounts the dashboard view on it.
    pub async fn start(
        source: Arc<dyn ChangeSource>,
        store: Arc<dyn IncidentStore>,
        offset: FixedOffset,
        config: &RealtimeConfig,
    ) -> Self {
        let channel = ChangeChannel::start(source, config.reconnect_policy(), config.event_buffer);
        let monitor = tokio::spawn(monitor_channel(channel.watch_state()));
        let view = ViewSynchronizer::new(store, offset).mount(&channel).await;

        info!(
            max_attempts = config.reconnect_max_attempts,
            "Realtime incident updates started"
        );

        Self {
            channel,
            view,
            monitor,
            closing: CancellationToken::new(),
        }
    }

    pub fn state(&self) -> RealtimeState {
        RealtimeState {
            events: self.channel.sender(),
            channel_state: self.channel.watch_state(),
            dashboard: self.view.watch(),
            closing: self.closing.clone(),
        }
    }

    /// Unmounts the view, then stops the channel.
    pub async fn shutdown(self) {
        self.closing.cancel();
        self.view.unmount().await;
        self.channel.shutdown().await;
        if let Err(e) = self.monitor.await {
            warn!("Channel monitor task failed: {}", e);
        }
    }
}

/// Mirrors channel state transitions into metrics until the channel stops.
async fn monitor_channel(mut state: watch::Receiver<ChannelState>) {
    let mut subscribed_before = false;
    loop {
        let current = *state.borrow_and_update();
        record_channel_state(current);
        match current {
            ChannelState::Subscribing if subscribed_before => record_channel_reconnect(),
            ChannelState::Subscribing => subscribed_before = true,
            ChannelState::Failed => warn!("Change channel gave up; dashboard updates stopped"),
            _ => {}
        }
        if state.changed().await.is_err() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Offset;
    use domain::services::{ChangeKind, InMemoryChangeSource, InMemoryIncidentStore};
    use std::time::Duration;

    async fn wait_until<F: Fn(&RealtimeState) -> bool>(state: &RealtimeState, check: F) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while !check(state) {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("condition not reached");
    }

    #[tokio::test]
    async fn test_realtime_start_and_shutdown() {
        let source = InMemoryChangeSource::new();
        let store = Arc::new(InMemoryIncidentStore::with_changes(source.clone()));
        let config = RealtimeConfig {
            reconnect_initial_delay_ms: 10,
            reconnect_max_delay_ms: 10,
            ..RealtimeConfig::default()
        };

        let realtime = Realtime::start(
            Arc::new(source.clone()),
            store,
            chrono::Utc.fix(),
            &config,
        )
        .await;
        let state = realtime.state();

        wait_until(&state, |s| s.channel_state() == ChannelState::Active).await;
        assert_eq!(state.dashboard().version, 1);

        let mut sub = state.subscribe();
        source.publish(IncidentChange::new(ChangeKind::Insert, 1));
        let delivered = tokio::time::timeout(Duration::from_secs(5), sub.next())
            .await
            .unwrap();
        assert!(delivered.is_some());

        realtime.shutdown().await;
    }
}
