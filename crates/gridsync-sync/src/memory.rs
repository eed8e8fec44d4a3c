use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{SyncError, SyncResult};
use crate::transport::{CollabTransport, InboundHandler};
use crate::types::{Inbound, OutgoingChange, PropertyEntry};

/// A change as ordered and fanned out by the hub.
#[derive(Clone, Debug)]
struct Confirmation {
    origin: Uuid,
    key: String,
    data: Vec<u8>,
}

struct HostedObject {
    properties: BTreeMap<String, Vec<u8>>,
    feed: broadcast::Sender<Confirmation>,
    changes: u64,
}

impl HostedObject {
    fn new(capacity: usize) -> Self {
        let (feed, _) = broadcast::channel(capacity);
        Self {
            properties: BTreeMap::new(),
            feed,
            changes: 0,
        }
    }
}

/// In-process collaboration server.
///
/// Holds the authoritative properties of each object. Changes are ordered by
/// the hub lock: each is applied to the object and fanned out to every
/// registered client in the same critical section, so all clients observe
/// the same order.
pub struct InMemoryHub {
    objects: Mutex<HashMap<String, HostedObject>>,
    capacity: usize,
}

impl InMemoryHub {
    pub const DEFAULT_CAPACITY: usize = 4096;

    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// A hub whose per-client confirmation backlog holds `capacity` changes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            objects: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    fn subscribe(&self, object_id: &str) -> broadcast::Receiver<Confirmation> {
        let mut objects = self.objects.lock().expect("hub lock poisoned");
        objects
            .entry(object_id.to_string())
            .or_insert_with(|| HostedObject::new(self.capacity))
            .feed
            .subscribe()
    }

    fn apply(&self, origin: Uuid, change: &OutgoingChange) {
        let mut objects = self.objects.lock().expect("hub lock poisoned");
        let object = objects
            .entry(change.object_id.clone())
            .or_insert_with(|| HostedObject::new(self.capacity));
        object.properties.insert(change.key.clone(), change.data.clone());
        object.changes += 1;
        // No receivers is fine: nobody is listening yet.
        let _ = object.feed.send(Confirmation {
            origin,
            key: change.key.clone(),
            data: change.data.clone(),
        });
    }

    /// Write a property on behalf of the server itself.
    pub fn put(&self, object_id: &str, key: impl Into<String>, data: impl Into<Vec<u8>>) {
        let change = OutgoingChange {
            object_id: object_id.to_string(),
            key: key.into(),
            data: data.into(),
        };
        self.apply(Uuid::nil(), &change);
    }

    /// Authoritative properties of an object, ordered by key.
    pub fn properties(&self, object_id: &str) -> SyncResult<Vec<PropertyEntry>> {
        let objects = self.objects.lock().expect("hub lock poisoned");
        let object = objects
            .get(object_id)
            .ok_or_else(|| SyncError::UnknownObject(object_id.to_string()))?;
        Ok(object
            .properties
            .iter()
            .map(|(k, v)| PropertyEntry::new(k.clone(), v.clone()))
            .collect())
    }

    /// Changes applied to an object since it was created.
    pub fn change_count(&self, object_id: &str) -> u64 {
        let objects = self.objects.lock().expect("hub lock poisoned");
        objects.get(object_id).map_or(0, |o| o.changes)
    }

    /// Hang up on every client listening to `object_id`.
    ///
    /// Already issued confirmations are still delivered before each listen
    /// returns. Clients must register again to receive further changes.
    pub fn disconnect(&self, object_id: &str) {
        let mut objects = self.objects.lock().expect("hub lock poisoned");
        if let Some(object) = objects.get_mut(object_id) {
            let (feed, _) = broadcast::channel(self.capacity);
            object.feed = feed;
            debug!(object_id, "hub disconnected listeners");
        }
    }
}

impl Default for InMemoryHub {
    fn default() -> Self {
        Self::new()
    }
}

/// One client's connection to an [`InMemoryHub`].
///
/// A conflict is counted when a confirmation from another client arrives
/// for a key on which one of this client's edits is still in flight.
pub struct InMemoryTransport {
    id: Uuid,
    hub: Arc<InMemoryHub>,
    offline: AtomicBool,
    connected: AtomicBool,
    subscription: Mutex<Option<broadcast::Receiver<Confirmation>>>,
    unconfirmed: Mutex<HashMap<String, u32>>,
    conflicts: AtomicU64,
    changes: AtomicU64,
}

impl InMemoryTransport {
    pub fn new(hub: Arc<InMemoryHub>) -> Self {
        Self {
            id: Uuid::now_v7(),
            hub,
            offline: AtomicBool::new(false),
            connected: AtomicBool::new(false),
            subscription: Mutex::new(None),
            unconfirmed: Mutex::new(HashMap::new()),
            conflicts: AtomicU64::new(0),
            changes: AtomicU64::new(0),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Simulate the server being unreachable. Also drops the current
    /// connection for sends.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
        if offline {
            self.connected.store(false, Ordering::SeqCst);
        }
    }

    fn track_confirmation(&self, confirmation: &Confirmation) {
        let mut unconfirmed = self.unconfirmed.lock().expect("transport lock poisoned");
        let Some(outstanding) = unconfirmed.get_mut(&confirmation.key) else {
            return;
        };
        if confirmation.origin == self.id {
            *outstanding -= 1;
            if *outstanding == 0 {
                unconfirmed.remove(&confirmation.key);
            }
        } else {
            self.conflicts.fetch_add(1, Ordering::Relaxed);
        }
    }
}

#[async_trait]
impl CollabTransport for InMemoryTransport {
    async fn connect(&self) -> SyncResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(SyncError::Connect("hub unreachable".into()));
        }
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn register_to_object(&self, object_id: &str) -> SyncResult<()> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(SyncError::Register {
                object_id: object_id.to_string(),
                reason: "not connected".into(),
            });
        }
        let rx = self.hub.subscribe(object_id);
        *self.subscription.lock().expect("transport lock poisoned") = Some(rx);
        // Confirmations of earlier edits went to the old subscription.
        self.unconfirmed.lock().expect("transport lock poisoned").clear();
        debug!(client = %self.id, object_id, "registered");
        Ok(())
    }

    async fn listen(&self, handler: Arc<dyn InboundHandler>) -> SyncResult<()> {
        let mut rx = self
            .subscription
            .lock()
            .expect("transport lock poisoned")
            .take()
            .ok_or(SyncError::NotRegistered)?;
        loop {
            match rx.recv().await {
                Ok(confirmation) => {
                    self.track_confirmation(&confirmation);
                    self.changes.fetch_add(1, Ordering::Relaxed);
                    // The handler counts and logs rejected updates itself.
                    let _ = handler.on_inbound(Inbound::Property {
                        key: confirmation.key,
                        data: confirmation.data,
                    });
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(client = %self.id, skipped, "confirmation backlog overflowed");
                    self.connected.store(false, Ordering::SeqCst);
                    return Err(SyncError::Disconnected(format!("lagged by {skipped} changes")));
                }
                Err(broadcast::error::RecvError::Closed) => {
                    self.connected.store(false, Ordering::SeqCst);
                    return Ok(());
                }
            }
        }
    }

    async fn get_object(&self, object_id: &str) -> SyncResult<Vec<PropertyEntry>> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(SyncError::Fetch("not connected".into()));
        }
        match self.hub.properties(object_id) {
            Err(SyncError::UnknownObject(_)) => Ok(Vec::new()),
            other => other,
        }
    }

    async fn send_change(&self, change: &OutgoingChange) -> SyncResult<()> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(SyncError::Send("not connected".into()));
        }
        *self
            .unconfirmed
            .lock()
            .expect("transport lock poisoned")
            .entry(change.key.clone())
            .or_insert(0) += 1;
        self.hub.apply(self.id, change);
        Ok(())
    }

    fn conflicts_count(&self) -> u64 {
        self.conflicts.load(Ordering::Relaxed)
    }

    fn change_count(&self) -> u64 {
        self.changes.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridsync_types::Cell;
    use std::time::Duration;

    /// Records every inbound delivery.
    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<Inbound>>,
    }

    impl InboundHandler for Recorder {
        fn on_inbound(&self, inbound: Inbound) -> SyncResult<()> {
            self.seen.lock().unwrap().push(inbound);
            Ok(())
        }
    }

    fn change(key: &str, red: u8) -> OutgoingChange {
        OutgoingChange {
            object_id: "obj".into(),
            key: key.into(),
            data: Cell::rgb(red, 0, 0).to_bytes().to_vec(),
        }
    }

    async fn registered(hub: &Arc<InMemoryHub>) -> InMemoryTransport {
        let t = InMemoryTransport::new(Arc::clone(hub));
        t.connect().await.unwrap();
        t.register_to_object("obj").await.unwrap();
        t
    }

    #[tokio::test]
    async fn put_is_visible_in_baseline() {
        let hub = Arc::new(InMemoryHub::new());
        hub.put("obj", "1-2", Cell::BLACK.to_bytes());
        let t = registered(&hub).await;
        let baseline = t.get_object("obj").await.unwrap();
        assert_eq!(baseline, vec![PropertyEntry::new("1-2", vec![0, 0, 0, 255])]);
        assert_eq!(hub.change_count("obj"), 1);
    }

    #[tokio::test]
    async fn unknown_object_has_empty_baseline() {
        let hub = Arc::new(InMemoryHub::new());
        let t = InMemoryTransport::new(Arc::clone(&hub));
        t.connect().await.unwrap();
        assert!(t.get_object("nothing").await.unwrap().is_empty());
        assert!(matches!(hub.properties("nothing"), Err(SyncError::UnknownObject(_))));
    }

    #[tokio::test]
    async fn offline_transport_cannot_connect_or_send() {
        let hub = Arc::new(InMemoryHub::new());
        let t = InMemoryTransport::new(hub);
        t.set_offline(true);
        assert!(matches!(t.connect().await, Err(SyncError::Connect(_))));
        assert!(matches!(t.send_change(&change("0-0", 1)).await, Err(SyncError::Send(_))));
        assert!(t.register_to_object("obj").await.is_err());
    }

    #[tokio::test]
    async fn listen_requires_registration() {
        let hub = Arc::new(InMemoryHub::new());
        let t = InMemoryTransport::new(hub);
        t.connect().await.unwrap();
        let err = t.listen(Arc::new(Recorder::default())).await.unwrap_err();
        assert!(matches!(err, SyncError::NotRegistered));
    }

    #[tokio::test]
    async fn changes_queued_after_register_are_delivered_in_order() {
        let hub = Arc::new(InMemoryHub::new());
        let a = registered(&hub).await;
        let b = registered(&hub).await;
        a.send_change(&change("0-0", 1)).await.unwrap();
        b.send_change(&change("0-0", 2)).await.unwrap();
        hub.disconnect("obj");

        let rec = Arc::new(Recorder::default());
        a.listen(rec.clone()).await.unwrap();
        let seen = rec.seen.lock().unwrap().clone();
        assert_eq!(seen.len(), 2);
        assert_eq!(
            seen[1],
            Inbound::Property { key: "0-0".into(), data: vec![2, 0, 0, 255] }
        );
        assert_eq!(a.change_count(), 2);
    }

    #[tokio::test]
    async fn own_edit_confirmed_first_is_not_a_conflict() {
        let hub = Arc::new(InMemoryHub::new());
        let a = registered(&hub).await;
        let b = registered(&hub).await;
        a.send_change(&change("3-3", 5)).await.unwrap();
        b.send_change(&change("3-3", 9)).await.unwrap();
        hub.disconnect("obj");

        a.listen(Arc::new(Recorder::default())).await.unwrap();
        assert_eq!(a.conflicts_count(), 0);
        assert!(a.unconfirmed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn foreign_edit_while_own_in_flight_is_a_conflict() {
        let hub = Arc::new(InMemoryHub::new());
        let a = registered(&hub).await;
        let b = registered(&hub).await;
        b.send_change(&change("4-4", 9)).await.unwrap();
        a.send_change(&change("4-4", 5)).await.unwrap();
        hub.disconnect("obj");

        a.listen(Arc::new(Recorder::default())).await.unwrap();
        assert_eq!(a.conflicts_count(), 1);
        assert_eq!(b.conflicts_count(), 0);
        assert!(a.unconfirmed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn registering_again_forgets_edits_confirmed_to_the_old_subscription() {
        let hub = Arc::new(InMemoryHub::new());
        let a = registered(&hub).await;
        let b = registered(&hub).await;
        a.send_change(&change("4-4", 5)).await.unwrap();

        a.register_to_object("obj").await.unwrap();
        assert!(a.unconfirmed.lock().unwrap().is_empty());
        b.send_change(&change("4-4", 9)).await.unwrap();
        hub.disconnect("obj");

        a.listen(Arc::new(Recorder::default())).await.unwrap();
        assert_eq!(a.conflicts_count(), 0);
        assert_eq!(a.change_count(), 1);
    }

    #[tokio::test]
    async fn disconnect_ends_listen() {
        let hub = Arc::new(InMemoryHub::new());
        hub.put("obj", "0-0", vec![0, 0, 0, 255]);
        let t = Arc::new(registered(&hub).await);
        let listener = {
            let t = Arc::clone(&t);
            tokio::spawn(async move { t.listen(Arc::new(Recorder::default())).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        hub.disconnect("obj");
        let ended = tokio::time::timeout(Duration::from_secs(2), listener).await;
        assert!(ended.expect("listen did not end").unwrap().is_ok());
        assert!(matches!(t.send_change(&change("0-0", 1)).await, Err(SyncError::Send(_))));
    }

    #[tokio::test]
    async fn lagging_listener_is_disconnected() {
        let hub = Arc::new(InMemoryHub::with_capacity(2));
        let t = registered(&hub).await;
        for i in 0..5u8 {
            hub.put("obj", format!("{i}-0"), vec![i, 0, 0, 255]);
        }
        let err = t.listen(Arc::new(Recorder::default())).await.unwrap_err();
        assert!(matches!(err, SyncError::Disconnected(_)));
    }
}
