//! Read side: collection views and (re)fetching from the remote store.

use encore_core::{OwnerId, Record, ResourceKind, StorageError};
use encore_storage::{CacheEvent, CollectionCache, CollectionSnapshot, RemoteStore};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// What a list screen renders for one kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionView {
    pub items: Vec<Record>,
    /// A fetch of this kind is in flight.
    pub is_loading: bool,
    /// The items are not known to match the remote store.
    pub is_stale: bool,
}

/// Query side of the collection cache for one owner.
pub struct Collections {
    store: Arc<dyn RemoteStore>,
    cache: Arc<CollectionCache>,
    owner_id: OwnerId,
    loading: [AtomicBool; 4],
}

impl Collections {
    pub fn new(store: Arc<dyn RemoteStore>, cache: Arc<CollectionCache>, owner_id: OwnerId) -> Self {
        Self {
            store,
            cache,
            owner_id,
            loading: ResourceKind::ALL.map(|_| AtomicBool::new(false)),
        }
    }

    /// Current view of `kind` straight from the cache. Never fetches.
    pub fn use_collection(&self, kind: ResourceKind) -> CollectionView {
        CollectionView {
            items: self.cache.get(kind).into_records(),
            is_loading: self.loading[kind.index()].load(Ordering::Acquire),
            is_stale: self.cache.is_stale(kind) || !self.cache.is_loaded(kind),
        }
    }

    /// Serve `kind` from the cache, fetching first if it was never loaded or
    /// has been invalidated.
    pub async fn load(&self, kind: ResourceKind) -> Result<CollectionView, StorageError> {
        if self.cache.is_loaded(kind) && !self.cache.is_stale(kind) {
            return Ok(self.use_collection(kind));
        }
        self.refetch(kind).await
    }

    /// Fetch `kind` from the remote store and replace the cached snapshot.
    ///
    /// Pending records of in-flight creates stay on top of the fetched list.
    /// Contacts come back with their social links joined. On failure the
    /// cache is left as it was.
    pub async fn refetch(&self, kind: ResourceKind) -> Result<CollectionView, StorageError> {
        let flag = &self.loading[kind.index()];
        flag.store(true, Ordering::Release);
        let fetched = self.fetch(kind).await;
        flag.store(false, Ordering::Release);

        let records = match fetched {
            Ok(records) => records,
            Err(err) => {
                warn!(kind = %kind, error = %err, "Collection fetch failed");
                return Err(err);
            }
        };

        let count = records.len();
        self.cache.apply(kind, |current| {
            let mut merged: Vec<Record> = current.pending().cloned().collect();
            merged.extend(records);
            CollectionSnapshot::new(merged)
        });
        debug!(kind = %kind, count, "Collection refetched");
        Ok(self.use_collection(kind))
    }

    async fn fetch(&self, kind: ResourceKind) -> Result<Vec<Record>, StorageError> {
        let mut records = self.store.list(self.owner_id, kind).await?;
        if kind.spec().has_children {
            for record in &mut records {
                let links = self.store.list_children(&record.id).await?;
                record.body.set_social_links(links);
            }
        }
        Ok(records)
    }

    /// Mark `kind` stale so the next [`load`](Self::load) refetches.
    pub fn invalidate(&self, kind: ResourceKind) {
        self.cache.invalidate(kind);
    }

    pub fn subscribe(&self, kind: ResourceKind) -> broadcast::Receiver<CacheEvent> {
        self.cache.subscribe(kind)
    }

    /// Drop every cached collection.
    pub fn sign_out(&self) {
        self.cache.clear();
    }
}

impl std::fmt::Debug for Collections {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collections")
            .field("owner_id", &self.owner_id)
            .finish_non_exhaustive()
    }
}
