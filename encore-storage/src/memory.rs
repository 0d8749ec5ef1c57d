//! In-memory implementation of the remote contracts.
//!
//! Behaves like the hosted platform from the caller's point of view: assigns
//! `srv-N` identifiers, stamps server timestamps, lists in each kind's sort
//! order and cascades contact link deletion. Tests can additionally inject
//! failures, hold individual calls open (before or after they take effect)
//! to control completion order, and count calls per operation.

use ::async_trait::async_trait;
use chrono::Utc;
use encore_core::{
    sort_records, LimitsError, OwnerId, Record, RecordId, ResourceBody, ResourceKind,
    ResourcePatch, SocialMediaLink, StorageError, SubscriptionLimits, SyncState,
};
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;
use tracing::debug;

use crate::remote::{LimitsSource, RemoteStore};

/// Remote operation, used to target injected failures, gates and counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    List,
    Create,
    Update,
    Delete,
    ListChildren,
    ReplaceChildren,
    FetchLimits,
}

/// Handle holding one call open until released.
///
/// Dropping the gate without calling [`release`](Gate::release) also lets the
/// call proceed.
#[derive(Debug)]
pub struct Gate {
    tx: oneshot::Sender<()>,
}

impl Gate {
    pub fn release(self) {
        let _ = self.tx.send(());
    }
}

#[derive(Debug, Default)]
struct StoreState {
    records: HashMap<ResourceKind, Vec<Record>>,
    children: HashMap<RecordId, Vec<SocialMediaLink>>,
    limits: HashMap<OwnerId, SubscriptionLimits>,
    next_id: u64,
    failures: HashMap<StoreOp, VecDeque<StorageError>>,
    gates: HashMap<StoreOp, VecDeque<oneshot::Receiver<()>>>,
    response_gates: HashMap<StoreOp, VecDeque<oneshot::Receiver<()>>>,
    calls: HashMap<StoreOp, usize>,
}

impl StoreState {
    fn assign_id(&mut self) -> RecordId {
        self.next_id += 1;
        RecordId::remote(format!("srv-{}", self.next_id))
    }

    fn insert(&mut self, owner_id: OwnerId, body: ResourceBody) -> Record {
        let now = Utc::now();
        let kind = body.kind();
        let record = Record {
            id: self.assign_id(),
            owner_id,
            body,
            created_at: now,
            updated_at: now,
            sync_state: SyncState::Confirmed,
        };
        let rows = self.records.entry(kind).or_default();
        rows.push(record.clone());
        sort_records(kind, rows);
        record
    }

    fn update(
        &mut self,
        kind: ResourceKind,
        id: &RecordId,
        patch: &ResourcePatch,
    ) -> Result<Record, StorageError> {
        let rows = self.records.entry(kind).or_default();
        let row = rows
            .iter_mut()
            .find(|r| &r.id == id)
            .ok_or_else(|| StorageError::NotFound {
                kind,
                id: id.clone(),
            })?;

        let mut body = row.body.clone();
        body.apply(&patch.without_children())
            .and_then(|()| body.validate())
            .map_err(|e| StorageError::UpdateFailed {
                kind,
                id: id.clone(),
                reason: e.to_string(),
            })?;
        row.body = body;
        row.updated_at = Utc::now();
        let updated = row.clone();
        sort_records(kind, rows);
        Ok(updated)
    }

    fn delete(&mut self, kind: ResourceKind, id: &RecordId) -> Result<(), StorageError> {
        let rows = self.records.entry(kind).or_default();
        let before = rows.len();
        rows.retain(|r| &r.id != id);
        if rows.len() == before {
            return Err(StorageError::NotFound {
                kind,
                id: id.clone(),
            });
        }
        if kind.spec().has_children {
            self.children.remove(id);
        }
        Ok(())
    }

    fn contact_exists(&self, id: &RecordId) -> bool {
        self.records
            .get(&ResourceKind::NetworkingContact)
            .is_some_and(|rows| rows.iter().any(|r| &r.id == id))
    }
}

/// Per-call controls popped when a call starts.
struct CallControl {
    failure: Option<StorageError>,
    gate: Option<oneshot::Receiver<()>>,
}

#[derive(Debug, Default)]
pub struct InMemoryRemoteStore {
    state: Mutex<StoreState>,
}

impl InMemoryRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make the next call of `op` fail with `error`. Queued failures are
    /// consumed in call order.
    pub fn fail_next(&self, op: StoreOp, error: StorageError) {
        self.state().failures.entry(op).or_default().push_back(error);
    }

    /// Hold the next call of `op` open until the returned gate is released.
    pub fn hold_next(&self, op: StoreOp) -> Gate {
        let (tx, rx) = oneshot::channel();
        self.state().gates.entry(op).or_default().push_back(rx);
        Gate { tx }
    }

    /// Let the next call of `op` take effect, then hold its response until
    /// the returned gate is released. Honored by create, update and delete.
    pub fn hold_response(&self, op: StoreOp) -> Gate {
        let (tx, rx) = oneshot::channel();
        self.state().response_gates.entry(op).or_default().push_back(rx);
        Gate { tx }
    }

    /// Number of calls of `op` made so far.
    pub fn calls(&self, op: StoreOp) -> usize {
        self.state().calls.get(&op).copied().unwrap_or(0)
    }

    /// Total number of calls across all operations.
    pub fn total_calls(&self) -> usize {
        self.state().calls.values().sum()
    }

    /// Insert a record directly, bypassing counters and injected behavior.
    pub fn seed(&self, owner_id: OwnerId, body: ResourceBody) -> Record {
        let mut state = self.state();
        let links = body.social_links().to_vec();
        let record = state.insert(owner_id, body.without_children());
        if !links.is_empty() {
            state.children.insert(record.id.clone(), links);
        }
        record
    }

    /// Make the next created record `srv-{next}`.
    pub fn set_next_id(&self, next: u64) {
        self.state().next_id = next.saturating_sub(1);
    }

    pub fn set_limits(&self, owner_id: OwnerId, limits: SubscriptionLimits) {
        self.state().limits.insert(owner_id, limits);
    }

    /// Stored records of one kind, in listing order.
    pub fn records(&self, kind: ResourceKind) -> Vec<Record> {
        self.state().records.get(&kind).cloned().unwrap_or_default()
    }

    /// Stored social links of one contact.
    pub fn children(&self, parent_id: &RecordId) -> Vec<SocialMediaLink> {
        self.state()
            .children
            .get(parent_id)
            .cloned()
            .unwrap_or_default()
    }

    fn begin(&self, op: StoreOp) -> CallControl {
        let mut state = self.state();
        *state.calls.entry(op).or_insert(0) += 1;
        let failure = state.failures.get_mut(&op).and_then(VecDeque::pop_front);
        let gate = state.gates.get_mut(&op).and_then(VecDeque::pop_front);
        debug!(
            op = ?op,
            injected_failure = failure.is_some(),
            held = gate.is_some(),
            "In-memory store call"
        );
        CallControl { failure, gate }
    }

    async fn enter(&self, op: StoreOp) -> Result<(), StorageError> {
        let control = self.begin(op);
        if let Some(gate) = control.gate {
            // A dropped gate counts as released.
            let _ = gate.await;
        }
        match control.failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn respond<T>(
        &self,
        op: StoreOp,
        result: Result<T, StorageError>,
    ) -> Result<T, StorageError> {
        let gate = self
            .state()
            .response_gates
            .get_mut(&op)
            .and_then(VecDeque::pop_front);
        if let Some(gate) = gate {
            debug!(op = ?op, "Holding in-memory store response");
            let _ = gate.await;
        }
        result
    }
}

#[async_trait]
impl RemoteStore for InMemoryRemoteStore {
    async fn list(
        &self,
        owner_id: OwnerId,
        kind: ResourceKind,
    ) -> Result<Vec<Record>, StorageError> {
        self.enter(StoreOp::List).await?;
        let state = self.state();
        Ok(state
            .records
            .get(&kind)
            .map(|rows| {
                rows.iter()
                    .filter(|r| r.owner_id == owner_id)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn create(
        &self,
        owner_id: OwnerId,
        kind: ResourceKind,
        body: &ResourceBody,
    ) -> Result<Record, StorageError> {
        self.enter(StoreOp::Create).await?;
        if body.kind() != kind {
            return Err(StorageError::InsertFailed {
                kind,
                reason: format!("payload is a {} record", body.kind()),
            });
        }
        body.validate().map_err(|e| StorageError::InsertFailed {
            kind,
            reason: e.to_string(),
        })?;
        let record = self.state().insert(owner_id, body.without_children());
        self.respond(StoreOp::Create, Ok(record)).await
    }

    async fn update(
        &self,
        kind: ResourceKind,
        id: &RecordId,
        patch: &ResourcePatch,
    ) -> Result<Record, StorageError> {
        self.enter(StoreOp::Update).await?;
        let result = self.state().update(kind, id, patch);
        self.respond(StoreOp::Update, result).await
    }

    async fn delete(&self, kind: ResourceKind, id: &RecordId) -> Result<(), StorageError> {
        self.enter(StoreOp::Delete).await?;
        let result = self.state().delete(kind, id);
        self.respond(StoreOp::Delete, result).await
    }

    async fn list_children(
        &self,
        parent_id: &RecordId,
    ) -> Result<Vec<SocialMediaLink>, StorageError> {
        self.enter(StoreOp::ListChildren).await?;
        let state = self.state();
        if !state.contact_exists(parent_id) {
            return Err(StorageError::NotFound {
                kind: ResourceKind::NetworkingContact,
                id: parent_id.clone(),
            });
        }
        Ok(state.children.get(parent_id).cloned().unwrap_or_default())
    }

    async fn replace_children(
        &self,
        parent_id: &RecordId,
        links: &[SocialMediaLink],
    ) -> Result<Vec<SocialMediaLink>, StorageError> {
        self.enter(StoreOp::ReplaceChildren).await?;
        let mut state = self.state();
        if !state.contact_exists(parent_id) {
            return Err(StorageError::ChildWriteFailed {
                parent_id: parent_id.clone(),
                reason: "parent contact does not exist".to_string(),
            });
        }
        if let Some(err) = links.iter().find_map(|l| l.validate().err()) {
            return Err(StorageError::ChildWriteFailed {
                parent_id: parent_id.clone(),
                reason: err.to_string(),
            });
        }
        if links.is_empty() {
            state.children.remove(parent_id);
        } else {
            state.children.insert(parent_id.clone(), links.to_vec());
        }
        Ok(links.to_vec())
    }
}

#[async_trait]
impl LimitsSource for InMemoryRemoteStore {
    async fn fetch_limits(&self, owner_id: OwnerId) -> Result<SubscriptionLimits, LimitsError> {
        self.enter(StoreOp::FetchLimits)
            .await
            .map_err(|e| LimitsError::Unavailable {
                reason: e.to_string(),
            })?;
        self.state()
            .limits
            .get(&owner_id)
            .copied()
            .ok_or_else(|| LimitsError::Unavailable {
                reason: format!("no subscription on record for {}", owner_id),
            })
    }
}
