//! Encore Core - Shared Types
//!
//! Records, identifiers, resource kinds, plan limits and the error taxonomy
//! used by every other Encore crate. Nothing in here performs I/O except
//! configuration loading and tracing setup.

pub mod config;
pub mod entities;
pub mod enums;
pub mod error;
pub mod identity;
pub mod limits;
pub mod telemetry;

pub use config::{
    CacheConfig, CoordinatorConfig, EncoreConfig, LimitsConfig, CONFIG_PATH_ENV,
};
pub use entities::{
    sort_records, ContactFields, ContactPatch, EventFields, EventPatch, Record,
    RepertoireFields, RepertoirePatch, ResourceBody, ResourcePatch, SocialMediaLink,
    TransactionFields, TransactionPatch,
};
pub use enums::{
    EventType, KindSpec, LimitCategory, PlanTier, RepertoireStatus, ResourceKind, SortKey,
    SyncState, TransactionDirection,
};
pub use error::{
    ConfigError, EncoreError, EncoreResult, LimitsError, MutationError, MutationOperation,
    StorageError, ValidationError,
};
pub use identity::{OwnerId, RecordId, TempIdGenerator, Timestamp, TEMP_ID_PREFIX};
pub use limits::{Ceiling, InvalidCeiling, LimitUsage, SubscriptionLimits, UNLIMITED_SENTINEL};
pub use telemetry::{init_tracing, LogFormat, TelemetryConfig};
