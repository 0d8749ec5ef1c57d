//! Shared helpers for encore-sync integration tests.

#![allow(dead_code)]

use encore_storage::{CollectionCache, CollectionSnapshot};
use encore_core::ResourceKind;
use tokio::sync::broadcast;
use tokio::time::{timeout, Duration};

pub fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("failed to build test runtime")
}

/// Wait for cache changes of `kind` until `pred` holds for the snapshot.
pub async fn wait_until<F>(
    cache: &CollectionCache,
    rx: &mut broadcast::Receiver<encore_storage::CacheEvent>,
    kind: ResourceKind,
    label: &str,
    pred: F,
) -> CollectionSnapshot
where
    F: Fn(&CollectionSnapshot) -> bool,
{
    loop {
        let snapshot = cache.get(kind);
        if pred(&snapshot) {
            return snapshot;
        }
        match timeout(Duration::from_millis(500), rx.recv()).await {
            Ok(Ok(_)) | Ok(Err(broadcast::error::RecvError::Lagged(_))) => continue,
            Ok(Err(err)) => panic!("Cache channel error while waiting for {}: {:?}", label, err),
            Err(_) => panic!("Timed out waiting for {}: {:?}", label, snapshot.ids()),
        }
    }
}
