//! In-memory store and change source for development and testing.
//!
//! Both support failure injection so degraded paths can be exercised
//! without a database.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::{broadcast, RwLock};

use super::change_feed::{ChangeKind, ChangeSource, ChangeStream, IncidentChange};
use super::store::IncidentStore;
use crate::error::DomainError;
use crate::models::incident::{sort_newest_first, sort_oldest_first};
use crate::models::{Camera, Incident, IncidentFilter, IncidentWithCamera, NewCamera, NewIncident};

/// Store operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    ListIncidents,
    GetIncident,
    GetResolved,
    SetResolved,
    ListCameras,
    ListTimeline,
    Ping,
}

#[derive(Default)]
struct Tables {
    cameras: BTreeMap<i64, Camera>,
    incidents: BTreeMap<i64, Incident>,
    next_camera_id: i64,
    next_incident_id: i64,
}

/// Incident store held entirely in memory.
#[derive(Clone, Default)]
pub struct InMemoryIncidentStore {
    tables: Arc<RwLock<Tables>>,
    failing: Arc<Mutex<HashSet<StoreOp>>>,
    changes: Option<InMemoryChangeSource>,
}

impl InMemoryIncidentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that publishes every incident mutation to `source`.
    pub fn with_changes(source: InMemoryChangeSource) -> Self {
        Self {
            changes: Some(source),
            ..Self::default()
        }
    }

    /// Makes `op` fail with a query error until cleared.
    pub fn set_failing(&self, op: StoreOp, failing: bool) {
        let mut set = self.failing.lock().unwrap_or_else(|e| e.into_inner());
        if failing {
            set.insert(op);
        } else {
            set.remove(&op);
        }
    }

    fn check(&self, op: StoreOp) -> Result<(), DomainError> {
        let set = self.failing.lock().unwrap_or_else(|e| e.into_inner());
        if set.contains(&op) {
            Err(DomainError::Query(format!("simulated {:?} failure", op)))
        } else {
            Ok(())
        }
    }

    fn publish(&self, kind: ChangeKind, id: i64) {
        if let Some(source) = &self.changes {
            source.publish(IncidentChange::new(kind, id));
        }
    }

    pub async fn insert_camera(&self, camera: NewCamera) -> Camera {
        let mut tables = self.tables.write().await;
        tables.next_camera_id += 1;
        let camera = Camera {
            id: tables.next_camera_id,
            name: camera.name,
            location: camera.location,
        };
        tables.cameras.insert(camera.id, camera.clone());
        camera
    }

    /// Inserts an incident. Fails with `NotFound` when the camera is unknown.
    pub async fn insert_incident(&self, new: NewIncident) -> Result<Incident, DomainError> {
        let incident = {
            let mut tables = self.tables.write().await;
            if !tables.cameras.contains_key(&new.camera_id) {
                return Err(DomainError::NotFound(format!(
                    "Camera {} not found",
                    new.camera_id
                )));
            }
            tables.next_incident_id += 1;
            let incident = Incident {
                id: tables.next_incident_id,
                camera_id: new.camera_id,
                incident_type: new.incident_type,
                t_start: new.t_start,
                t_end: new.t_end,
                thumbnail_url: new.thumbnail_url,
                resolved: new.resolved,
                description: new.description,
            };
            tables.incidents.insert(incident.id, incident.clone());
            incident
        };
        self.publish(ChangeKind::Insert, incident.id);
        Ok(incident)
    }

    pub async fn delete_incident(&self, id: i64) -> bool {
        let removed = self.tables.write().await.incidents.remove(&id).is_some();
        if removed {
            self.publish(ChangeKind::Delete, id);
        }
        removed
    }

    pub async fn incident_count(&self) -> usize {
        self.tables.read().await.incidents.len()
    }

    /// Raw incident rows ordered by id.
    pub async fn incidents(&self) -> Vec<Incident> {
        self.tables.read().await.incidents.values().cloned().collect()
    }

    fn join(tables: &Tables, incident: &Incident) -> Result<IncidentWithCamera, DomainError> {
        let camera = tables.cameras.get(&incident.camera_id).ok_or_else(|| {
            DomainError::Query(format!(
                "Incident {} references missing camera {}",
                incident.id, incident.camera_id
            ))
        })?;
        Ok(IncidentWithCamera {
            incident: incident.clone(),
            camera: camera.clone(),
        })
    }
}

#[async_trait::async_trait]
impl IncidentStore for InMemoryIncidentStore {
    async fn list_incidents(
        &self,
        filter: IncidentFilter,
    ) -> Result<Vec<IncidentWithCamera>, DomainError> {
        self.check(StoreOp::ListIncidents)?;
        let tables = self.tables.read().await;
        let mut list = tables
            .incidents
            .values()
            .filter(|i| filter.matches(i))
            .map(|i| Self::join(&tables, i))
            .collect::<Result<Vec<_>, _>>()?;
        sort_newest_first(&mut list);
        Ok(list)
    }

    async fn get_incident(&self, id: i64) -> Result<IncidentWithCamera, DomainError> {
        self.check(StoreOp::GetIncident)?;
        let tables = self.tables.read().await;
        let incident = tables
            .incidents
            .get(&id)
            .ok_or_else(|| DomainError::incident_not_found(id))?;
        Self::join(&tables, incident)
    }

    async fn get_resolved(&self, id: i64) -> Result<bool, DomainError> {
        self.check(StoreOp::GetResolved)?;
        self.tables
            .read()
            .await
            .incidents
            .get(&id)
            .map(|i| i.resolved)
            .ok_or_else(|| DomainError::incident_not_found(id))
    }

    async fn set_resolved(&self, id: i64, resolved: bool) -> Result<(), DomainError> {
        self.check(StoreOp::SetResolved)?;
        {
            let mut tables = self.tables.write().await;
            let incident = tables
                .incidents
                .get_mut(&id)
                .ok_or_else(|| DomainError::incident_not_found(id))?;
            incident.resolved = resolved;
        }
        self.publish(ChangeKind::Update, id);
        Ok(())
    }

    async fn list_cameras(&self) -> Result<Vec<Camera>, DomainError> {
        self.check(StoreOp::ListCameras)?;
        Ok(self.tables.read().await.cameras.values().cloned().collect())
    }

    async fn list_timeline_incidents(&self) -> Result<Vec<Incident>, DomainError> {
        self.check(StoreOp::ListTimeline)?;
        let mut list: Vec<Incident> =
            self.tables.read().await.incidents.values().cloned().collect();
        sort_oldest_first(&mut list);
        Ok(list)
    }

    async fn ping(&self) -> Result<(), DomainError> {
        self.check(StoreOp::Ping)
    }
}

#[derive(Debug, Clone)]
enum SourceMessage {
    Change(IncidentChange),
    Break(String),
}

struct SourceInner {
    tx: broadcast::Sender<SourceMessage>,
    failing_subscriptions: AtomicU32,
    subscribes: AtomicU32,
}

/// Change source fed by [`InMemoryIncidentStore`] or by tests directly.
#[derive(Clone)]
pub struct InMemoryChangeSource {
    inner: Arc<SourceInner>,
}

impl InMemoryChangeSource {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(256);
        Self {
            inner: Arc::new(SourceInner {
                tx,
                failing_subscriptions: AtomicU32::new(0),
                subscribes: AtomicU32::new(0),
            }),
        }
    }

    /// Delivers a change to every open stream.
    pub fn publish(&self, change: IncidentChange) {
        let _ = self.inner.tx.send(SourceMessage::Change(change));
    }

    /// Ends every open stream with a subscription error.
    pub fn break_streams(&self, reason: &str) {
        let _ = self.inner.tx.send(SourceMessage::Break(reason.to_string()));
    }

    /// Makes the next `n` subscribe calls fail.
    pub fn fail_next_subscriptions(&self, n: u32) {
        self.inner.failing_subscriptions.store(n, Ordering::SeqCst);
    }

    /// Number of subscribe calls made so far, failed ones included.
    pub fn subscribe_count(&self) -> u32 {
        self.inner.subscribes.load(Ordering::SeqCst)
    }
}

impl Default for InMemoryChangeSource {
    fn default() -> Self {
        Self::new()
    }
}

struct InMemoryChangeStream {
    rx: broadcast::Receiver<SourceMessage>,
}

#[async_trait::async_trait]
impl ChangeSource for InMemoryChangeSource {
    async fn subscribe(&self) -> Result<Box<dyn ChangeStream>, DomainError> {
        self.inner.subscribes.fetch_add(1, Ordering::SeqCst);
        let should_fail = self
            .inner
            .failing_subscriptions
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(DomainError::Subscription(
                "simulated subscribe failure".to_string(),
            ));
        }
        Ok(Box::new(InMemoryChangeStream {
            rx: self.inner.tx.subscribe(),
        }))
    }
}

#[async_trait::async_trait]
impl ChangeStream for InMemoryChangeStream {
    async fn next_change(&mut self) -> Result<IncidentChange, DomainError> {
        match self.rx.recv().await {
            Ok(SourceMessage::Change(change)) => Ok(change),
            Ok(SourceMessage::Break(reason)) => Err(DomainError::Subscription(reason)),
            Err(broadcast::error::RecvError::Lagged(n)) => Err(DomainError::Subscription(
                format!("stream lagged by {} messages", n),
            )),
            Err(broadcast::error::RecvError::Closed) => {
                Err(DomainError::Subscription("source closed".to_string()))
            }
        }
    }
}
