//! Encore Storage
//!
//! The remote store contract, an in-memory implementation of it, and the
//! local collection cache the sync layer reads and writes.

pub mod cache;
pub mod memory;
pub mod remote;

pub use cache::{CacheChange, CacheEvent, CollectionCache, CollectionSnapshot};
pub use memory::{Gate, InMemoryRemoteStore, StoreOp};
pub use remote::{check_remote_record, LimitsSource, RemoteStore};
