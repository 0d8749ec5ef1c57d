//! Encore Sync
//!
//! Keeps the local collection cache consistent with the remote store under
//! concurrent, fallible writes:
//!
//! - [`MutationCoordinator`] runs optimistic create/update/delete with
//!   rollback, gated by the owner's plan limits.
//! - [`SubscriptionSession`] caches those limits for the session.
//! - [`Collections`] serves list views and refetches them.
//! - [`NotificationSink`] receives the user-facing outcome of each mutation.

pub mod collections;
pub mod coordinator;
pub mod notify;
pub mod session;

pub use collections::{CollectionView, Collections};
pub use coordinator::{MutationCoordinator, MutationOutcome, MutationPhase, RollbackContext};
pub use notify::{
    Notification, NotificationAction, NotificationLevel, NotificationSink, TracingSink,
};
pub use session::SubscriptionSession;
