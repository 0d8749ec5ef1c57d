//! Local collection cache.
//!
//! Holds the client's current belief about each collection as an immutable
//! [`CollectionSnapshot`] per resource kind. Writers swap whole snapshots;
//! readers get clones and can subscribe to a per-kind stream of
//! [`CacheEvent`]s to learn when to re-read.
//!
//! # Example
//!
//! ```ignore
//! let cache = CollectionCache::default();
//! let mut changes = cache.subscribe(ResourceKind::Event);
//!
//! cache.apply(ResourceKind::Event, |current| current.prepend(pending));
//! assert!(matches!(changes.try_recv()?.change, CacheChange::Replaced { .. }));
//! ```

pub mod collection;
pub mod snapshot;

pub use collection::{CacheChange, CacheEvent, CollectionCache};
pub use snapshot::CollectionSnapshot;
