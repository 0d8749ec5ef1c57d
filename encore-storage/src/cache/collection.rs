//! Per-kind snapshot store with change fan-out.

use encore_core::{CacheConfig, Record, RecordId, ResourceKind};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::broadcast;
use tracing::debug;

use super::snapshot::CollectionSnapshot;

/// What happened to a kind's snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheChange {
    /// The snapshot was swapped for one holding `len` records.
    Replaced { len: usize },
    /// The snapshot was marked stale (or dropped on sign-out).
    Invalidated,
}

/// Notification sent to every subscriber of a kind.
///
/// `version` increases by one per write to that kind, so a reader can tell
/// the order writes were applied in and whether it missed any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheEvent {
    pub kind: ResourceKind,
    pub version: u64,
    pub change: CacheChange,
}

#[derive(Debug, Default)]
struct SlotState {
    snapshot: CollectionSnapshot,
    version: u64,
    loaded: bool,
    stale: bool,
}

#[derive(Debug)]
struct KindSlot {
    state: RwLock<SlotState>,
    tx: broadcast::Sender<CacheEvent>,
}

impl KindSlot {
    fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self {
            state: RwLock::new(SlotState::default()),
            tx,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, SlotState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, SlotState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Local collection cache: one snapshot per resource kind.
///
/// Kinds are independent; each has its own lock and its own broadcast
/// channel. Writes to one kind are serialized and their events are sent
/// while the write lock is held, so subscribers observe them in call order.
/// Locks are never held across an `.await`.
#[derive(Debug)]
pub struct CollectionCache {
    slots: [KindSlot; 4],
}

impl CollectionCache {
    /// Create a cache buffering up to `capacity` events per kind.
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: ResourceKind::ALL.map(|_| KindSlot::new(capacity)),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.broadcast_capacity)
    }

    fn slot(&self, kind: ResourceKind) -> &KindSlot {
        &self.slots[kind.index()]
    }

    /// Current snapshot of `kind`.
    pub fn get(&self, kind: ResourceKind) -> CollectionSnapshot {
        self.slot(kind).read().snapshot.clone()
    }

    /// Replace the snapshot of `kind` and notify subscribers.
    ///
    /// Returns the new version.
    pub fn set(&self, kind: ResourceKind, snapshot: CollectionSnapshot) -> u64 {
        self.apply(kind, |_| snapshot)
    }

    /// Replace the snapshot of `kind` with `f(current)` under one write lock.
    ///
    /// Use this when the new snapshot is derived from the current one, so no
    /// other write can slip in between the read and the swap.
    pub fn apply<F>(&self, kind: ResourceKind, f: F) -> u64
    where
        F: FnOnce(&CollectionSnapshot) -> CollectionSnapshot,
    {
        let slot = self.slot(kind);
        let mut state = slot.write();
        state.snapshot = f(&state.snapshot);
        state.version += 1;
        state.loaded = true;
        state.stale = false;
        let event = CacheEvent {
            kind,
            version: state.version,
            change: CacheChange::Replaced {
                len: state.snapshot.len(),
            },
        };
        Self::broadcast(slot, event);
        event.version
    }

    /// Mark `kind` stale so the next load refetches it.
    pub fn invalidate(&self, kind: ResourceKind) -> u64 {
        let slot = self.slot(kind);
        let mut state = slot.write();
        state.version += 1;
        state.stale = true;
        let event = CacheEvent {
            kind,
            version: state.version,
            change: CacheChange::Invalidated,
        };
        Self::broadcast(slot, event);
        event.version
    }

    /// Drop every snapshot (sign-out). Each kind becomes unloaded and stale.
    pub fn clear(&self) {
        for kind in ResourceKind::ALL {
            let slot = self.slot(kind);
            let mut state = slot.write();
            state.snapshot = CollectionSnapshot::default();
            state.version += 1;
            state.loaded = false;
            state.stale = true;
            Self::broadcast(
                slot,
                CacheEvent {
                    kind,
                    version: state.version,
                    change: CacheChange::Invalidated,
                },
            );
        }
    }

    fn broadcast(slot: &KindSlot, event: CacheEvent) {
        match slot.tx.send(event) {
            Ok(receivers) => {
                debug!(
                    kind = %event.kind,
                    version = event.version,
                    change = ?event.change,
                    receivers = receivers,
                    "Cache change broadcast"
                );
            }
            Err(_) => {
                debug!(kind = %event.kind, version = event.version, "No readers for cache change");
            }
        }
    }

    /// Receive every future change of `kind`.
    pub fn subscribe(&self, kind: ResourceKind) -> broadcast::Receiver<CacheEvent> {
        self.slot(kind).tx.subscribe()
    }

    pub fn is_stale(&self, kind: ResourceKind) -> bool {
        self.slot(kind).read().stale
    }

    /// Whether `kind` has been written since creation or the last clear.
    pub fn is_loaded(&self, kind: ResourceKind) -> bool {
        self.slot(kind).read().loaded
    }

    pub fn version(&self, kind: ResourceKind) -> u64 {
        self.slot(kind).read().version
    }

    pub fn len(&self, kind: ResourceKind) -> usize {
        self.slot(kind).read().snapshot.len()
    }

    pub fn find(&self, kind: ResourceKind, id: &RecordId) -> Option<Record> {
        self.slot(kind).read().snapshot.find(id).cloned()
    }
}

impl Default for CollectionCache {
    fn default() -> Self {
        Self::from_config(&CacheConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use encore_core::{EventFields, EventType, OwnerId, ResourceBody, SyncState};
    use std::sync::Arc;

    fn gig(id: &str) -> Record {
        Record {
            id: RecordId::remote(id),
            owner_id: OwnerId::new_v7(),
            body: ResourceBody::Event(EventFields {
                title: format!("Gig {}", id),
                event_type: EventType::Gig,
                venue: None,
                starts_at: Utc::now(),
                ends_at: None,
                fee_cents: None,
                notes: None,
            }),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            sync_state: SyncState::Confirmed,
        }
    }

    #[test]
    fn test_new_cache_is_empty_and_unloaded() {
        let cache = CollectionCache::default();
        for kind in ResourceKind::ALL {
            assert!(cache.get(kind).is_empty());
            assert!(!cache.is_loaded(kind));
            assert!(!cache.is_stale(kind));
            assert_eq!(cache.version(kind), 0);
        }
    }

    #[test]
    fn test_set_replaces_whole_snapshot() {
        let cache = CollectionCache::default();
        cache.set(
            ResourceKind::Event,
            CollectionSnapshot::new(vec![gig("srv-1"), gig("srv-2")]),
        );
        cache.set(ResourceKind::Event, CollectionSnapshot::new(vec![gig("srv-3")]));
        assert_eq!(cache.get(ResourceKind::Event).ids(), vec![RecordId::remote("srv-3")]);
        assert!(cache.is_loaded(ResourceKind::Event));
        assert_eq!(cache.version(ResourceKind::Event), 2);
    }

    #[test]
    fn test_kinds_are_independent() {
        let cache = CollectionCache::default();
        let mut contacts = cache.subscribe(ResourceKind::NetworkingContact);
        cache.set(ResourceKind::Event, CollectionSnapshot::new(vec![gig("srv-1")]));
        assert!(cache.get(ResourceKind::NetworkingContact).is_empty());
        assert_eq!(cache.version(ResourceKind::NetworkingContact), 0);
        assert!(contacts.try_recv().is_err());
    }

    #[test]
    fn test_every_write_notifies_in_order() {
        let cache = CollectionCache::default();
        let mut first = cache.subscribe(ResourceKind::Event);
        let mut second = cache.subscribe(ResourceKind::Event);

        cache.set(ResourceKind::Event, CollectionSnapshot::new(vec![gig("srv-1")]));
        cache.invalidate(ResourceKind::Event);
        cache.apply(ResourceKind::Event, |s| s.prepend(gig("srv-2")));

        for rx in [&mut first, &mut second] {
            let events: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
            assert_eq!(
                events,
                vec![
                    CacheEvent {
                        kind: ResourceKind::Event,
                        version: 1,
                        change: CacheChange::Replaced { len: 1 },
                    },
                    CacheEvent {
                        kind: ResourceKind::Event,
                        version: 2,
                        change: CacheChange::Invalidated,
                    },
                    CacheEvent {
                        kind: ResourceKind::Event,
                        version: 3,
                        change: CacheChange::Replaced { len: 2 },
                    },
                ]
            );
        }
    }

    #[test]
    fn test_invalidate_keeps_data_but_marks_stale() {
        let cache = CollectionCache::default();
        cache.set(ResourceKind::Event, CollectionSnapshot::new(vec![gig("srv-1")]));
        cache.invalidate(ResourceKind::Event);
        assert!(cache.is_stale(ResourceKind::Event));
        assert_eq!(cache.len(ResourceKind::Event), 1);

        cache.set(ResourceKind::Event, cache.get(ResourceKind::Event));
        assert!(!cache.is_stale(ResourceKind::Event));
    }

    #[test]
    fn test_clear_drops_everything() {
        let cache = CollectionCache::default();
        cache.set(ResourceKind::Event, CollectionSnapshot::new(vec![gig("srv-1")]));
        cache.clear();
        assert!(cache.get(ResourceKind::Event).is_empty());
        assert!(!cache.is_loaded(ResourceKind::Event));
        assert!(cache.is_stale(ResourceKind::Event));
        assert!(cache.find(ResourceKind::Event, &RecordId::remote("srv-1")).is_none());
    }

    #[test]
    fn test_poisoned_lock_is_recovered() {
        let cache = Arc::new(CollectionCache::default());
        cache.set(ResourceKind::Event, CollectionSnapshot::new(vec![gig("srv-1")]));

        let poisoner = cache.clone();
        let result = std::thread::spawn(move || {
            poisoner.apply(ResourceKind::Event, |_| panic!("writer panicked"));
        })
        .join();
        assert!(result.is_err());

        assert_eq!(cache.len(ResourceKind::Event), 1);
        cache.set(ResourceKind::Event, CollectionSnapshot::default());
        assert!(cache.get(ResourceKind::Event).is_empty());
    }

    #[test]
    fn test_lagging_reader_is_told_how_much_it_missed() {
        let cache = CollectionCache::new(2);
        let mut rx = cache.subscribe(ResourceKind::Event);
        for _ in 0..5 {
            cache.invalidate(ResourceKind::Event);
        }
        assert!(matches!(
            rx.try_recv(),
            Err(broadcast::error::TryRecvError::Lagged(3))
        ));
    }
}
