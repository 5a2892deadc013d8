//! Keeps a dashboard snapshot consistent with the incident store.
//!
//! On mount the synchronizer subscribes to the change channel, fetches the
//! three slices (incidents, cameras, timeline) concurrently, and from then on
//! re-fetches incidents and timeline after each notification. Cameras are
//! static for the life of a view and are not re-fetched.

use std::future::Future;
use std::sync::Arc;

use chrono::{FixedOffset, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::change_feed::{ChangeChannelHandle, Delivery, Subscription};
use super::store::{load_timeline, IncidentStore};
use crate::error::DomainError;
use crate::models::{DashboardSnapshot, IncidentFilter, Slice};

/// Fetches dashboard slices and publishes them on a watch channel.
pub struct ViewSynchronizer {
    store: Arc<dyn IncidentStore>,
    offset: FixedOffset,
    snapshot: watch::Sender<DashboardSnapshot>,
}

impl ViewSynchronizer {
    pub fn new(store: Arc<dyn IncidentStore>, offset: FixedOffset) -> Self {
        let (snapshot, _) = watch::channel(DashboardSnapshot::default());
        Self {
            store,
            offset,
            snapshot,
        }
    }

    pub fn watch(&self) -> watch::Receiver<DashboardSnapshot> {
        self.snapshot.subscribe()
    }

    pub fn snapshot(&self) -> DashboardSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Fetches all three slices concurrently. A failing slice degrades to an
    /// empty, failed-flagged value and never holds back the others.
    pub async fn load_initial(&self) {
        let (incidents, cameras, timeline) = tokio::join!(
            fetch_slice("incidents", self.store.list_incidents(IncidentFilter::all())),
            fetch_slice("cameras", self.store.list_cameras()),
            fetch_slice("timeline", load_timeline(self.store.as_ref(), self.offset)),
        );

        self.snapshot.send_modify(|s| {
            s.incidents = incidents;
            s.cameras = cameras;
            s.timeline = timeline;
            s.version += 1;
            s.refreshed_at = Some(Utc::now());
        });
    }

    /// Re-fetches incidents and timeline.
    pub async fn refresh(&self) {
        let (incidents, timeline) = tokio::join!(
            fetch_slice("incidents", self.store.list_incidents(IncidentFilter::all())),
            fetch_slice("timeline", load_timeline(self.store.as_ref(), self.offset)),
        );

        self.snapshot.send_modify(|s| {
            s.incidents = incidents;
            s.timeline = timeline;
            s.version += 1;
            s.refreshed_at = Some(Utc::now());
        });
    }

    /// Loads the initial snapshot, then follows `channel` until unmounted.
    pub async fn mount(self, channel: &ChangeChannelHandle) -> MountedView {
        let sync = Arc::new(self);

        // Subscribe first so a change committed during the load is not lost.
        let mut subscription = channel.subscribe();
        sync.load_initial().await;

        let queued = subscription.drain();
        if queued > 0 {
            debug!(queued, "Changes arrived during initial load; refreshing");
            sync.refresh().await;
        }

        let cancel = CancellationToken::new();
        let task = tokio::spawn(follow_changes(sync.clone(), subscription, cancel.clone()));

        info!("Dashboard view mounted");

        MountedView {
            sync,
            cancel,
            task: Some(task),
        }
    }
}

async fn fetch_slice<T, F>(label: &'static str, fetch: F) -> Slice<T>
where
    T: Default,
    F: Future<Output = Result<T, DomainError>>,
{
    match fetch.await {
        Ok(data) => Slice::ok(data),
        Err(e) => {
            warn!(slice = label, error = %e, "Dashboard fetch failed; serving empty slice");
            Slice::failed(e.to_string())
        }
    }
}

/// Runs one refresh per burst of notifications: whatever queued up while
/// the previous refresh was in flight is folded into the next one.
async fn follow_changes(
    sync: Arc<ViewSynchronizer>,
    mut subscription: Subscription,
    cancel: CancellationToken,
) {
    loop {
        let delivery = tokio::select! {
            _ = cancel.cancelled() => break,
            delivery = subscription.next() => delivery,
        };

        match delivery {
            Some(Delivery::Change(change)) => {
                let coalesced = subscription.drain();
                debug!(kind = ?change.kind, coalesced, "Refreshing dashboard after change");
            }
            Some(Delivery::Missed(n)) => {
                let coalesced = subscription.drain();
                debug!(missed = n, coalesced, "Refreshing dashboard after missed changes");
            }
            None => {
                debug!("Change channel closed; dashboard stops following");
                break;
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = sync.refresh() => {}
        }
    }
}

/// A mounted dashboard view. Unmounting (or dropping) releases the
/// subscription and stops background refreshes.
pub struct MountedView {
    sync: Arc<ViewSynchronizer>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl MountedView {
    pub fn watch(&self) -> watch::Receiver<DashboardSnapshot> {
        self.sync.watch()
    }

    pub fn snapshot(&self) -> DashboardSnapshot {
        self.sync.snapshot()
    }

    pub fn is_following(&self) -> bool {
        self.task.as_ref().map_or(false, |t| !t.is_finished())
    }

    pub async fn unmount(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("Dashboard refresh task panicked: {}", e);
            }
        }
        info!("Dashboard view unmounted");
    }
}

impl Drop for MountedView {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::incident::types;
    use crate::models::{FetchStatus, NewCamera, NewIncident};
    use crate::services::change_feed::{ChangeChannel, ChannelState, ReconnectPolicy};
    use crate::services::memory::{InMemoryChangeSource, InMemoryIncidentStore, StoreOp};
    use crate::services::resolution::resolve_incident;
    use chrono::Duration;
    use std::sync::atomic::{AtomicBool, Ordering};
    use fake::faker::lorem::en::Sentence;
    use fake::Fake;

    fn utc() -> FixedOffset {
        shared::time::offset_from_minutes(0).unwrap()
    }

    fn new_incident(camera_id: i64, minutes_ago: i64) -> NewIncident {
        let start = Utc::now() - Duration::minutes(minutes_ago);
        NewIncident {
            camera_id,
            incident_type: types::FACE_RECOGNISED.to_string(),
            t_start: start,
            t_end: start + Duration::minutes(3),
            thumbnail_url: "https://picsum.photos/seed/9/300/200".to_string(),
            resolved: false,
            description: Sentence(3..6).fake(),
        }
    }

    async fn wait_until<F>(rx: &mut watch::Receiver<DashboardSnapshot>, mut pred: F)
    where
        F: FnMut(&DashboardSnapshot) -> bool,
    {
        tokio::time::timeout(std::time::Duration::from_secs(2), async {
            loop {
                if pred(&rx.borrow_and_update()) {
                    return;
                }
                rx.changed().await.unwrap();
            }
        })
        .await
        .expect("snapshot never satisfied condition");
    }

    async fn active_channel(source: &InMemoryChangeSource) -> ChangeChannelHandle {
        let policy = ReconnectPolicy::fixed(std::time::Duration::from_millis(5));
        let handle = ChangeChannel::start(Arc::new(source.clone()), policy, 64);
        let mut state = handle.watch_state();
        tokio::time::timeout(std::time::Duration::from_secs(2), async {
            while *state.borrow_and_update() != ChannelState::Active {
                state.changed().await.unwrap();
            }
        })
        .await
        .unwrap();
        handle
    }

    #[tokio::test]
    async fn test_load_initial_fills_all_slices() {
        let store = InMemoryIncidentStore::new();
        let camera = store.insert_camera(NewCamera::new("Vault", "Basement Level")).await;
        store.insert_incident(new_incident(camera.id, 20)).await.unwrap();
        store.insert_incident(new_incident(camera.id, 10)).await.unwrap();

        let sync = ViewSynchronizer::new(Arc::new(store), utc());
        sync.load_initial().await;
        let snapshot = sync.snapshot();

        assert_eq!(snapshot.version, 1);
        assert_eq!(snapshot.incidents.status, FetchStatus::Ok);
        assert_eq!(snapshot.incidents.data.len(), 2);
        assert_eq!(snapshot.cameras.data.len(), 1);
        assert_eq!(snapshot.timeline.data.events.len(), 2);
        assert_eq!(snapshot.unresolved_count(), 2);
        assert!(snapshot.refreshed_at.is_some());
    }

    #[tokio::test]
    async fn test_failed_slice_does_not_block_others() {
        let store = InMemoryIncidentStore::new();
        let camera = store.insert_camera(NewCamera::new("Vault", "Basement Level")).await;
        store.insert_incident(new_incident(camera.id, 5)).await.unwrap();
        store.set_failing(StoreOp::ListCameras, true);

        let sync = ViewSynchronizer::new(Arc::new(store), utc());
        sync.load_initial().await;
        let snapshot = sync.snapshot();

        assert!(snapshot.cameras.status.is_failed());
        assert!(snapshot.cameras.data.is_empty());
        assert_eq!(snapshot.incidents.status, FetchStatus::Ok);
        assert_eq!(snapshot.incidents.data.len(), 1);
        assert_eq!(snapshot.timeline.status, FetchStatus::Ok);
    }

    #[tokio::test]
    async fn test_refresh_leaves_cameras_untouched() {
        let store = InMemoryIncidentStore::new();
        store.insert_camera(NewCamera::new("Vault", "Basement Level")).await;

        let sync = ViewSynchronizer::new(Arc::new(store.clone()), utc());
        sync.load_initial().await;

        store.set_failing(StoreOp::ListCameras, true);
        store.set_failing(StoreOp::ListTimeline, true);
        sync.refresh().await;
        let snapshot = sync.snapshot();

        assert_eq!(snapshot.version, 2);
        assert_eq!(snapshot.cameras.status, FetchStatus::Ok);
        assert_eq!(snapshot.cameras.data.len(), 1);
        assert!(snapshot.timeline.status.is_failed());
        assert_eq!(snapshot.timeline.data.markers.len(), 24);
    }

    #[tokio::test]
    async fn test_external_insert_reaches_mounted_view() {
        let source = InMemoryChangeSource::new();
        let store = InMemoryIncidentStore::with_changes(source.clone());
        let camera = store.insert_camera(NewCamera::new("Main Entrance", "Ground Floor, Front")).await;
        store.insert_incident(new_incident(camera.id, 30)).await.unwrap();

        let channel = active_channel(&source).await;
        let view = ViewSynchronizer::new(Arc::new(store.clone()), utc())
            .mount(&channel)
            .await;
        assert_eq!(view.snapshot().incidents.data.len(), 1);
        assert!(view.is_following());

        let c = store.insert_incident(new_incident(camera.id, 1)).await.unwrap();

        let mut rx = view.watch();
        wait_until(&mut rx, |s| s.incidents.data.iter().any(|i| i.id() == c.id)).await;
        let snapshot = view.snapshot();
        assert_eq!(snapshot.incidents.data[0].id(), c.id);
        assert!(snapshot.timeline.data.events.iter().any(|e| e.id == c.id));

        view.unmount().await;
        channel.shutdown().await;
    }

    /// Inserts one incident the first time the timeline is read, after the
    /// incidents slice has already been fetched.
    struct InsertDuringTimeline {
        inner: InMemoryIncidentStore,
        camera_id: i64,
        fired: AtomicBool,
    }

    #[async_trait::async_trait]
    impl IncidentStore for InsertDuringTimeline {
        async fn list_incidents(
            &self,
            filter: IncidentFilter,
        ) -> Result<Vec<crate::models::IncidentWithCamera>, DomainError> {
            self.inner.list_incidents(filter).await
        }

        async fn get_incident(
            &self,
            id: i64,
        ) -> Result<crate::models::IncidentWithCamera, DomainError> {
            self.inner.get_incident(id).await
        }

        async fn get_resolved(&self, id: i64) -> Result<bool, DomainError> {
            self.inner.get_resolved(id).await
        }

        async fn set_resolved(&self, id: i64, resolved: bool) -> Result<(), DomainError> {
            self.inner.set_resolved(id, resolved).await
        }

        async fn list_cameras(&self) -> Result<Vec<crate::models::Camera>, DomainError> {
            self.inner.list_cameras().await
        }

        async fn list_timeline_incidents(
            &self,
        ) -> Result<Vec<crate::models::Incident>, DomainError> {
            if !self.fired.swap(true, Ordering::SeqCst) {
                self.inner.insert_incident(new_incident(self.camera_id, 1)).await?;
                tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            }
            self.inner.list_timeline_incidents().await
        }

        async fn ping(&self) -> Result<(), DomainError> {
            self.inner.ping().await
        }
    }

    #[tokio::test]
    async fn test_change_during_initial_load_is_not_lost() {
        let source = InMemoryChangeSource::new();
        let store = InMemoryIncidentStore::with_changes(source.clone());
        let camera = store.insert_camera(NewCamera::new("Vault", "Basement Level")).await;

        let channel = active_channel(&source).await;
        let racing = InsertDuringTimeline {
            inner: store.clone(),
            camera_id: camera.id,
            fired: AtomicBool::new(false),
        };
        let view = ViewSynchronizer::new(Arc::new(racing), utc())
            .mount(&channel)
            .await;

        let mut rx = view.watch();
        wait_until(&mut rx, |s| s.incidents.data.len() == 1).await;
        assert_eq!(store.incident_count().await, 1);
        assert_eq!(view.snapshot().timeline.data.events.len(), 1);

        view.unmount().await;
        channel.shutdown().await;
    }

    #[tokio::test]
    async fn test_resolution_is_observed_through_channel() {
        let source = InMemoryChangeSource::new();
        let store = InMemoryIncidentStore::with_changes(source.clone());
        let camera = store.insert_camera(NewCamera::new("Parking Lot", "Outdoor, East Side")).await;
        let a = store.insert_incident(new_incident(camera.id, 3)).await.unwrap();

        let channel = active_channel(&source).await;
        let view = ViewSynchronizer::new(Arc::new(store.clone()), utc())
            .mount(&channel)
            .await;
        assert_eq!(view.snapshot().unresolved_count(), 1);

        resolve_incident(&store, a.id).await.unwrap();

        let mut rx = view.watch();
        wait_until(&mut rx, |s| s.unresolved_count() == 0).await;

        view.unmount().await;
        channel.shutdown().await;
    }

    #[tokio::test]
    async fn test_unmount_stops_following() {
        let source = InMemoryChangeSource::new();
        let store = InMemoryIncidentStore::with_changes(source.clone());
        let camera = store.insert_camera(NewCamera::new("Vault", "Basement Level")).await;

        let channel = active_channel(&source).await;
        let view = ViewSynchronizer::new(Arc::new(store.clone()), utc())
            .mount(&channel)
            .await;
        let rx = view.watch();
        let version = rx.borrow().version;
        view.unmount().await;

        store.insert_incident(new_incident(camera.id, 1)).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        assert_eq!(rx.borrow().version, version);
        channel.shutdown().await;
    }
}
