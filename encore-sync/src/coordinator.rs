//! Optimistic create/update/delete against the local cache and remote store.
//!
//! Every mutation follows the same shape: check preconditions, capture a
//! rollback context, write the optimistic result to the cache, await the
//! remote store, then either reconcile with the authoritative record or undo
//! the optimistic write. Cache writes happen between await points only, and
//! completions find their record by id, so concurrent mutations of the same
//! kind may confirm in any order.

use chrono::Utc;
use encore_core::{
    CoordinatorConfig, MutationError, MutationOperation, Record, RecordId, ResourceBody,
    ResourceKind, ResourcePatch, SocialMediaLink, StorageError, SyncState, TempIdGenerator,
    ValidationError,
};
use encore_storage::{check_remote_record, CollectionCache, CollectionSnapshot, RemoteStore};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::notify::{Notification, NotificationAction, NotificationLevel, NotificationSink};
use crate::session::SubscriptionSession;

/// Where a mutation is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationPhase {
    Idle,
    /// The optimistic result is in the cache; the remote call is outstanding.
    Optimistic,
    Confirmed,
    RolledBack,
}

impl fmt::Display for MutationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Optimistic => "optimistic",
            Self::Confirmed => "confirmed",
            Self::RolledBack => "rolled_back",
        };
        f.write_str(name)
    }
}

/// Result of a mutation that reached the remote store successfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationOutcome {
    /// The confirmed record (for deletes, the record as it was before removal).
    pub record: Option<Record>,
    pub phase: MutationPhase,
}

/// State captured before an optimistic write, enough to undo it.
///
/// Undoing touches only the record the mutation targeted, so creates,
/// refetches and other mutations that landed in the meantime survive.
#[derive(Debug, Clone)]
pub struct RollbackContext {
    kind: ResourceKind,
    snapshot: CollectionSnapshot,
    target: RecordId,
    pending: bool,
}

impl RollbackContext {
    /// Context for a create whose pending record will carry `temp_id`.
    pub fn for_create(cache: &CollectionCache, kind: ResourceKind, temp_id: RecordId) -> Self {
        Self {
            kind,
            snapshot: cache.get(kind),
            target: temp_id,
            pending: true,
        }
    }

    /// Context for an update or delete of the existing record `id`.
    pub fn for_record(cache: &CollectionCache, kind: ResourceKind, id: &RecordId) -> Self {
        Self {
            kind,
            snapshot: cache.get(kind),
            target: id.clone(),
            pending: false,
        }
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Snapshot as it was before the optimistic write.
    pub fn snapshot(&self) -> &CollectionSnapshot {
        &self.snapshot
    }

    pub fn target(&self) -> &RecordId {
        &self.target
    }

    pub fn pending_id(&self) -> Option<&RecordId> {
        self.pending.then_some(&self.target)
    }

    /// Undo the optimistic write.
    ///
    /// A create removes its own pending record. An update puts back the
    /// captured version of the record; a delete reinserts it at its captured
    /// position. With nothing interleaved the result equals the captured
    /// snapshot.
    pub fn roll_back(&self, cache: &CollectionCache) {
        let id = &self.target;
        if self.pending {
            cache.apply(self.kind, |current| current.remove(id));
            return;
        }
        // Nothing was written optimistically for a record that was not cached.
        let Some((index, record)) = self.snapshot.position(id).zip(self.snapshot.find(id)) else {
            return;
        };
        cache.apply(self.kind, |current| {
            if current.contains(id) {
                current.replace(id, record.clone())
            } else {
                current.insert(index, record.clone())
            }
        });
    }
}

/// Orchestrates optimistic mutations for every resource kind.
pub struct MutationCoordinator {
    store: Arc<dyn RemoteStore>,
    cache: Arc<CollectionCache>,
    session: Arc<SubscriptionSession>,
    sink: Arc<dyn NotificationSink>,
    temp_ids: TempIdGenerator,
    config: CoordinatorConfig,
}

impl MutationCoordinator {
    pub fn new(
        store: Arc<dyn RemoteStore>,
        cache: Arc<CollectionCache>,
        session: Arc<SubscriptionSession>,
        sink: Arc<dyn NotificationSink>,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            store,
            cache,
            session,
            sink,
            temp_ids: TempIdGenerator::new(),
            config,
        }
    }

    pub fn cache(&self) -> &Arc<CollectionCache> {
        &self.cache
    }

    pub fn session(&self) -> &Arc<SubscriptionSession> {
        &self.session
    }

    // ========================================================================
    // CREATE
    // ========================================================================

    /// Create a record of `kind`.
    ///
    /// The pending record is visible in the cache before the remote call is
    /// awaited. Contact social links are written after the contact itself,
    /// using its confirmed id.
    pub async fn create_item(
        &self,
        kind: ResourceKind,
        body: ResourceBody,
    ) -> Result<MutationOutcome, MutationError> {
        self.precheck(kind, body.expect_kind(kind).and_then(|()| body.validate()))?;

        let limits = self.session.ensure_loaded().await;
        let current = self.cache.get(kind);
        if let Err(err) = limits.check(kind, current.len() as i64) {
            warn!(kind = %kind, count = current.len(), "Create rejected by plan limit");
            self.sink.notify(
                Notification::error(err.user_message()).with_action(NotificationAction::UpgradePlan),
            );
            return Err(err);
        }

        let temp_id = self.temp_ids.next_id();
        let rollback = RollbackContext::for_create(&self.cache, kind, temp_id.clone());
        let pending = Record::pending(temp_id.clone(), self.session.owner_id(), body.clone(), Utc::now());
        self.cache.apply(kind, |current| current.prepend(pending));
        transition(kind, &temp_id, MutationPhase::Idle, MutationPhase::Optimistic);

        let created = self
            .store
            .create(self.session.owner_id(), kind, &body.without_children())
            .await
            .and_then(|record| check_remote_record(kind, record));

        let mut confirmed = match created {
            Ok(record) => record,
            Err(source) => {
                rollback.roll_back(&self.cache);
                transition(kind, &temp_id, MutationPhase::Optimistic, MutationPhase::RolledBack);
                return Err(self.remote_failure(kind, MutationOperation::Create, source));
            }
        };

        let links = body.social_links();
        confirmed.body.set_social_links(links.to_vec());
        self.swap_pending(kind, &temp_id, confirmed.clone());
        transition(kind, &confirmed.id, MutationPhase::Optimistic, MutationPhase::Confirmed);

        if kind.spec().has_children && !links.is_empty() {
            confirmed = self.persist_children(kind, confirmed, links).await?;
        }

        self.notify_success(kind, MutationOperation::Create);
        Ok(MutationOutcome {
            record: Some(confirmed),
            phase: MutationPhase::Confirmed,
        })
    }

    /// Replace the pending record, wherever it sits now, with the confirmed one.
    ///
    /// A refetch that ran after the server stored the record may already hold
    /// a copy under the confirmed id; that copy is dropped so the id appears
    /// once.
    fn swap_pending(&self, kind: ResourceKind, temp_id: &RecordId, confirmed: Record) {
        self.cache.apply(kind, |current| {
            if current.contains(temp_id) {
                if current.contains(&confirmed.id) {
                    debug!(kind = %kind, id = %confirmed.id, "Dropping fetched copy of confirmed record");
                }
                current.remove(&confirmed.id).replace(temp_id, confirmed)
            } else {
                debug!(kind = %kind, temp_id = %temp_id, "Pending record gone before confirmation");
                current.clone()
            }
        });
    }

    // ========================================================================
    // UPDATE
    // ========================================================================

    /// Apply `patch` to the record `id` of `kind`.
    ///
    /// The merged record is written to the cache before the remote call; on
    /// failure the record's captured version is put back.
    pub async fn update_item(
        &self,
        kind: ResourceKind,
        id: &RecordId,
        patch: ResourcePatch,
    ) -> Result<MutationOutcome, MutationError> {
        self.precheck(kind, patch.expect_kind(kind).and_then(|()| patch.validate()))?;
        self.ensure_confirmed(kind, id)?;

        let rollback = RollbackContext::for_record(&self.cache, kind, id);
        let phase = match rollback.snapshot().find(id) {
            Some(existing) => {
                let mut merged = existing.clone();
                merged.body.apply(&patch)?;
                merged.updated_at = Utc::now();
                self.cache.apply(kind, |current| current.replace(id, merged));
                transition(kind, id, MutationPhase::Idle, MutationPhase::Optimistic);
                MutationPhase::Optimistic
            }
            None => {
                debug!(kind = %kind, id = %id, "Record not cached, updating without optimistic write");
                MutationPhase::Idle
            }
        };

        let updated = self
            .store
            .update(kind, id, &patch.without_children())
            .await
            .and_then(|record| check_remote_record(kind, record));

        let mut confirmed = match updated {
            Ok(record) => record,
            Err(source) => {
                rollback.roll_back(&self.cache);
                transition(kind, id, phase, MutationPhase::RolledBack);
                return Err(self.remote_failure(kind, MutationOperation::Update, source));
            }
        };

        // The parent endpoint does not return children; carry over what the
        // client holds unless this patch replaces them.
        let links = match patch.social_links() {
            Some(links) => links.to_vec(),
            None => self
                .cache
                .find(kind, id)
                .map(|r| r.body.social_links().to_vec())
                .unwrap_or_default(),
        };
        confirmed.body.set_social_links(links);
        self.cache.apply(kind, |current| current.replace(id, confirmed.clone()));
        transition(kind, id, phase, MutationPhase::Confirmed);

        if let Some(links) = patch.social_links().filter(|_| kind.spec().has_children) {
            confirmed = self.persist_children(kind, confirmed, links).await?;
        }

        self.notify_success(kind, MutationOperation::Update);
        Ok(MutationOutcome {
            record: Some(confirmed),
            phase: MutationPhase::Confirmed,
        })
    }

    // ========================================================================
    // DELETE
    // ========================================================================

    /// Delete the record `id` of `kind`.
    pub async fn delete_item(
        &self,
        kind: ResourceKind,
        id: &RecordId,
    ) -> Result<MutationOutcome, MutationError> {
        self.ensure_confirmed(kind, id)?;

        let rollback = RollbackContext::for_record(&self.cache, kind, id);
        let removed = rollback.snapshot().find(id).cloned();
        let phase = if removed.is_some() {
            self.cache.apply(kind, |current| current.remove(id));
            transition(kind, id, MutationPhase::Idle, MutationPhase::Optimistic);
            MutationPhase::Optimistic
        } else {
            debug!(kind = %kind, id = %id, "Record not cached, deleting without optimistic write");
            MutationPhase::Idle
        };

        if let Err(source) = self.store.delete(kind, id).await {
            rollback.roll_back(&self.cache);
            transition(kind, id, phase, MutationPhase::RolledBack);
            return Err(self.remote_failure(kind, MutationOperation::Delete, source));
        }

        transition(kind, id, phase, MutationPhase::Confirmed);
        self.notify_success(kind, MutationOperation::Delete);
        Ok(MutationOutcome {
            record: removed,
            phase: MutationPhase::Confirmed,
        })
    }

    // ========================================================================
    // DEPENDENT CHILDREN
    // ========================================================================

    /// Retry writing the social links of a record left `Incomplete`.
    ///
    /// Writes the links the cached record carries. Records that are not
    /// incomplete are returned unchanged without a remote call.
    pub async fn retry_children(
        &self,
        kind: ResourceKind,
        id: &RecordId,
    ) -> Result<MutationOutcome, MutationError> {
        self.ensure_confirmed(kind, id)?;
        let record = self.cache.find(kind, id).ok_or_else(|| {
            self.remote_failure(
                kind,
                MutationOperation::ReplaceChildren,
                StorageError::NotFound {
                    kind,
                    id: id.clone(),
                },
            )
        })?;
        if record.sync_state != SyncState::Incomplete {
            return Ok(MutationOutcome {
                record: Some(record),
                phase: MutationPhase::Confirmed,
            });
        }

        let links = record.body.social_links().to_vec();
        let record = self.persist_children(kind, record, &links).await?;
        self.notify_success(kind, MutationOperation::ReplaceChildren);
        Ok(MutationOutcome {
            record: Some(record),
            phase: MutationPhase::Confirmed,
        })
    }

    /// Write `links` for an already confirmed parent, retrying per config.
    ///
    /// On success the cached parent carries the stored links and is
    /// `Confirmed`. On final failure the parent stays in the cache marked
    /// `Incomplete` and a partial failure is reported.
    async fn persist_children(
        &self,
        kind: ResourceKind,
        mut parent: Record,
        links: &[SocialMediaLink],
    ) -> Result<Record, MutationError> {
        let attempts = self.config.child_write_retries + 1;
        let mut last_error = None;

        for attempt in 1..=attempts {
            match self.store.replace_children(&parent.id, links).await {
                Ok(saved) => {
                    parent.body.set_social_links(saved);
                    parent.sync_state = SyncState::Confirmed;
                    self.cache
                        .apply(kind, |current| current.replace(&parent.id, parent.clone()));
                    debug!(kind = %kind, id = %parent.id, attempt, "Child records written");
                    return Ok(parent);
                }
                Err(err) => {
                    debug!(kind = %kind, id = %parent.id, attempt, error = %err, "Child write failed");
                    last_error = Some(err);
                }
            }
        }

        let reason = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "child write failed".to_string());
        parent.sync_state = SyncState::Incomplete;
        self.cache.apply(kind, |current| {
            current.update(&parent.id, |r| r.sync_state = SyncState::Incomplete)
        });
        warn!(kind = %kind, id = %parent.id, attempts, reason = %reason, "Record saved without its child records");

        let err = MutationError::PartialFailure {
            kind,
            id: parent.id.clone(),
            reason,
        };
        self.sink.notify(Notification::warning(err.user_message()).with_action(
            NotificationAction::RetryChildren {
                kind,
                id: parent.id.clone(),
            },
        ));
        Err(err)
    }

    // ========================================================================
    // HELPERS
    // ========================================================================

    fn precheck(
        &self,
        kind: ResourceKind,
        result: Result<(), ValidationError>,
    ) -> Result<(), MutationError> {
        result.map_err(|err| {
            debug!(kind = %kind, error = %err, "Mutation payload rejected");
            let err = MutationError::from(err);
            self.sink.notify(Notification::error(err.user_message()));
            err
        })
    }

    /// Reject mutations of records the remote store has not confirmed yet.
    fn ensure_confirmed(&self, kind: ResourceKind, id: &RecordId) -> Result<(), MutationError> {
        let pending = id.is_temporary()
            || self
                .cache
                .find(kind, id)
                .is_some_and(|r| r.sync_state == SyncState::Pending);
        if pending {
            let err = MutationError::NotConfirmed {
                kind,
                id: id.clone(),
            };
            debug!(kind = %kind, id = %id, "Mutation of unconfirmed record rejected");
            self.sink
                .notify(Notification::new(NotificationLevel::Info, err.user_message()));
            return Err(err);
        }
        Ok(())
    }

    fn remote_failure(
        &self,
        kind: ResourceKind,
        operation: MutationOperation,
        source: StorageError,
    ) -> MutationError {
        warn!(kind = %kind, operation = %operation, error = %source, "Remote mutation failed");
        let err = MutationError::RemoteFailure {
            kind,
            operation,
            source,
        };
        self.sink.notify(Notification::error(err.user_message()));
        err
    }

    fn notify_success(&self, kind: ResourceKind, operation: MutationOperation) {
        if !self.config.notify_success {
            return;
        }
        let message = match operation {
            MutationOperation::Create => format!("{} created.", capitalize(kind.label())),
            MutationOperation::Update => format!("{} updated.", capitalize(kind.label())),
            MutationOperation::Delete => format!("{} deleted.", capitalize(kind.label())),
            MutationOperation::ReplaceChildren => "Social links saved.".to_string(),
        };
        self.sink.notify(Notification::success(message));
    }
}

impl fmt::Debug for MutationCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutationCoordinator")
            .field("session", &self.session)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn transition(kind: ResourceKind, id: &RecordId, from: MutationPhase, to: MutationPhase) {
    match to {
        MutationPhase::RolledBack => {
            warn!(kind = %kind, id = %id, from = %from, to = %to, "Mutation phase")
        }
        MutationPhase::Confirmed => {
            info!(kind = %kind, id = %id, from = %from, to = %to, "Mutation phase")
        }
        _ => debug!(kind = %kind, id = %id, from = %from, to = %to, "Mutation phase"),
    }
}

fn capitalize(label: &str) -> String {
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
