//! Contracts for the hosted data platform.
//!
//! The sync layer only ever talks to the remote side through these two
//! traits: [`RemoteStore`] for per-kind CRUD and the contact link child
//! collection, and [`LimitsSource`] for an owner's plan ceilings.

use ::async_trait::async_trait;
use encore_core::{
    LimitsError, OwnerId, Record, RecordId, ResourceBody, ResourceKind, ResourcePatch,
    SocialMediaLink, StorageError, SubscriptionLimits,
};

/// Async CRUD contract against the remote collections.
///
/// Implementations must return records carrying identifiers assigned by the
/// remote side and never a `temp-N` identifier.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// List the owner's records of `kind` in that kind's listing order.
    ///
    /// Records come back without their dependent children.
    async fn list(&self, owner_id: OwnerId, kind: ResourceKind)
        -> Result<Vec<Record>, StorageError>;

    /// Insert a new record and return the authoritative copy.
    async fn create(
        &self,
        owner_id: OwnerId,
        kind: ResourceKind,
        body: &ResourceBody,
    ) -> Result<Record, StorageError>;

    /// Apply a partial update and return the authoritative copy.
    async fn update(
        &self,
        kind: ResourceKind,
        id: &RecordId,
        patch: &ResourcePatch,
    ) -> Result<Record, StorageError>;

    /// Delete a record. Dependent children go with it.
    async fn delete(&self, kind: ResourceKind, id: &RecordId) -> Result<(), StorageError>;

    /// Social links of one contact.
    async fn list_children(&self, parent_id: &RecordId)
        -> Result<Vec<SocialMediaLink>, StorageError>;

    /// Replace all social links of one contact (delete, then insert).
    async fn replace_children(
        &self,
        parent_id: &RecordId,
        links: &[SocialMediaLink],
    ) -> Result<Vec<SocialMediaLink>, StorageError>;
}

/// Source of per-owner plan ceilings.
#[async_trait]
pub trait LimitsSource: Send + Sync {
    async fn fetch_limits(&self, owner_id: OwnerId) -> Result<SubscriptionLimits, LimitsError>;
}

/// Reject a remote response that could be confused with local state.
///
/// A record of the wrong kind or one carrying a temporary identifier would
/// corrupt reconciliation, so both count as an invalid response.
pub fn check_remote_record(kind: ResourceKind, record: Record) -> Result<Record, StorageError> {
    if record.id.is_temporary() {
        return Err(StorageError::InvalidResponse {
            kind,
            reason: format!("remote returned reserved identifier {}", record.id),
        });
    }
    if record.kind() != kind {
        return Err(StorageError::InvalidResponse {
            kind,
            reason: format!("remote returned a {} record", record.kind()),
        });
    }
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use encore_core::{ContactFields, SyncState};

    fn contact_record(id: RecordId) -> Record {
        let now = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        Record {
            id,
            owner_id: OwnerId::new_v7(),
            body: ResourceBody::NetworkingContact(ContactFields {
                name: "Ada".to_string(),
                role: None,
                company: None,
                email: None,
                phone: None,
                notes: None,
                social_links: Vec::new(),
            }),
            created_at: now,
            updated_at: now,
            sync_state: SyncState::Confirmed,
        }
    }

    #[test]
    fn test_check_accepts_remote_ids() {
        let record = contact_record(RecordId::remote("srv-1"));
        assert!(check_remote_record(ResourceKind::NetworkingContact, record).is_ok());
    }

    #[test]
    fn test_check_rejects_temporary_ids() {
        let record = contact_record(RecordId::Temporary(4));
        let err = check_remote_record(ResourceKind::NetworkingContact, record).unwrap_err();
        assert!(matches!(err, StorageError::InvalidResponse { .. }));
        assert!(err.to_string().contains("temp-4"));
    }

    #[test]
    fn test_check_rejects_wrong_kind() {
        let record = contact_record(RecordId::remote("srv-1"));
        let err = check_remote_record(ResourceKind::Event, record).unwrap_err();
        assert!(matches!(
            err,
            StorageError::InvalidResponse {
                kind: ResourceKind::Event,
                ..
            }
        ));
    }
}
