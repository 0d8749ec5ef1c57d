//! Core record structures

use crate::{
    EventType, OwnerId, RecordId, RepertoireStatus, ResourceKind, SortKey, SyncState,
    Timestamp, TransactionDirection, ValidationError,
};
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use std::cmp::Ordering;

/// Distinguishes an absent patch field from an explicit `null`.
fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

fn require_text(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::RequiredFieldMissing { field });
    }
    Ok(())
}

/// Link from a contact to one of their social profiles.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SocialMediaLink {
    pub platform: String,
    pub url: String,
}

impl SocialMediaLink {
    pub fn new(platform: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            platform: platform.into(),
            url: url.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("social_links.platform", &self.platform)?;
        require_text("social_links.url", &self.url)?;
        if !(self.url.starts_with("http://") || self.url.starts_with("https://")) {
            return Err(ValidationError::InvalidValue {
                field: "social_links.url",
                reason: format!("'{}' must start with http:// or https://", self.url),
            });
        }
        Ok(())
    }
}

// ============================================================================
// KIND-SPECIFIC FIELDS
// ============================================================================

/// Calendar entry: gigs, rehearsals, lessons.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventFields {
    pub title: String,
    pub event_type: EventType,
    pub venue: Option<String>,
    pub starts_at: Timestamp,
    pub ends_at: Option<Timestamp>,
    /// Agreed fee in cents.
    pub fee_cents: Option<i64>,
    pub notes: Option<String>,
}

impl EventFields {
    fn validate(&self) -> Result<(), ValidationError> {
        require_text("title", &self.title)?;
        if let Some(ends_at) = self.ends_at {
            if ends_at < self.starts_at {
                return Err(ValidationError::InvalidValue {
                    field: "ends_at",
                    reason: "must not be before starts_at".to_string(),
                });
            }
        }
        if matches!(self.fee_cents, Some(fee) if fee < 0) {
            return Err(ValidationError::InvalidValue {
                field: "fee_cents",
                reason: "must not be negative".to_string(),
            });
        }
        Ok(())
    }

    fn apply(&mut self, patch: &EventPatch) {
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(event_type) = patch.event_type {
            self.event_type = event_type;
        }
        if let Some(venue) = &patch.venue {
            self.venue = venue.clone();
        }
        if let Some(starts_at) = patch.starts_at {
            self.starts_at = starts_at;
        }
        if let Some(ends_at) = patch.ends_at {
            self.ends_at = ends_at;
        }
        if let Some(fee_cents) = patch.fee_cents {
            self.fee_cents = fee_cents;
        }
        if let Some(notes) = &patch.notes {
            self.notes = notes.clone();
        }
    }
}

/// Income or expense entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionFields {
    pub description: String,
    /// Always positive; `direction` carries the sign.
    pub amount_cents: i64,
    pub direction: TransactionDirection,
    pub category: String,
    pub occurred_on: NaiveDate,
    pub notes: Option<String>,
}

impl TransactionFields {
    /// Amount with the direction applied (expenses negative).
    pub fn signed_amount_cents(&self) -> i64 {
        match self.direction {
            TransactionDirection::Income => self.amount_cents,
            TransactionDirection::Expense => -self.amount_cents,
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_text("description", &self.description)?;
        require_text("category", &self.category)?;
        if self.amount_cents <= 0 {
            return Err(ValidationError::InvalidValue {
                field: "amount_cents",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    fn apply(&mut self, patch: &TransactionPatch) {
        if let Some(description) = &patch.description {
            self.description = description.clone();
        }
        if let Some(amount_cents) = patch.amount_cents {
            self.amount_cents = amount_cents;
        }
        if let Some(direction) = patch.direction {
            self.direction = direction;
        }
        if let Some(category) = &patch.category {
            self.category = category.clone();
        }
        if let Some(occurred_on) = patch.occurred_on {
            self.occurred_on = occurred_on;
        }
        if let Some(notes) = &patch.notes {
            self.notes = notes.clone();
        }
    }
}

/// A piece in the musician's repertoire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepertoireFields {
    pub title: String,
    pub composer: Option<String>,
    pub genre: Option<String>,
    pub musical_key: Option<String>,
    pub status: RepertoireStatus,
    /// 1 (easy) to 5 (hard).
    pub difficulty: Option<u8>,
    pub notes: Option<String>,
}

impl RepertoireFields {
    fn validate(&self) -> Result<(), ValidationError> {
        require_text("title", &self.title)?;
        validate_difficulty(self.difficulty)
    }

    fn apply(&mut self, patch: &RepertoirePatch) {
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(composer) = &patch.composer {
            self.composer = composer.clone();
        }
        if let Some(genre) = &patch.genre {
            self.genre = genre.clone();
        }
        if let Some(musical_key) = &patch.musical_key {
            self.musical_key = musical_key.clone();
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(difficulty) = patch.difficulty {
            self.difficulty = difficulty;
        }
        if let Some(notes) = &patch.notes {
            self.notes = notes.clone();
        }
    }
}

fn validate_difficulty(difficulty: Option<u8>) -> Result<(), ValidationError> {
    match difficulty {
        Some(d) if !(1..=5).contains(&d) => Err(ValidationError::InvalidValue {
            field: "difficulty",
            reason: format!("{} is outside 1..=5", d),
        }),
        _ => Ok(()),
    }
}

/// Someone in the musician's network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactFields {
    pub name: String,
    pub role: Option<String>,
    pub company: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
    /// Dependent child collection, persisted separately from the contact row.
    #[serde(default)]
    pub social_links: Vec<SocialMediaLink>,
}

impl ContactFields {
    fn validate(&self) -> Result<(), ValidationError> {
        require_text("name", &self.name)?;
        validate_email(self.email.as_deref())?;
        self.social_links.iter().try_for_each(SocialMediaLink::validate)
    }

    fn apply(&mut self, patch: &ContactPatch) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(role) = &patch.role {
            self.role = role.clone();
        }
        if let Some(company) = &patch.company {
            self.company = company.clone();
        }
        if let Some(email) = &patch.email {
            self.email = email.clone();
        }
        if let Some(phone) = &patch.phone {
            self.phone = phone.clone();
        }
        if let Some(notes) = &patch.notes {
            self.notes = notes.clone();
        }
        if let Some(links) = &patch.social_links {
            self.social_links = links.clone();
        }
    }
}

fn validate_email(email: Option<&str>) -> Result<(), ValidationError> {
    match email {
        Some(email) if !email.is_empty() && !email.contains('@') => {
            Err(ValidationError::InvalidValue {
                field: "email",
                reason: format!("'{}' is not an email address", email),
            })
        }
        _ => Ok(()),
    }
}

// ============================================================================
// RESOURCE BODY
// ============================================================================

/// Kind-specific content of a record, tagged by kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "fields", rename_all = "snake_case")]
pub enum ResourceBody {
    Event(EventFields),
    FinancialTransaction(TransactionFields),
    RepertoireItem(RepertoireFields),
    NetworkingContact(ContactFields),
}

impl ResourceBody {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::Event(_) => ResourceKind::Event,
            Self::FinancialTransaction(_) => ResourceKind::FinancialTransaction,
            Self::RepertoireItem(_) => ResourceKind::RepertoireItem,
            Self::NetworkingContact(_) => ResourceKind::NetworkingContact,
        }
    }

    /// Fail unless this body belongs to `expected`.
    pub fn expect_kind(&self, expected: ResourceKind) -> Result<(), ValidationError> {
        check_kind(expected, self.kind())
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Self::Event(fields) => fields.validate(),
            Self::FinancialTransaction(fields) => fields.validate(),
            Self::RepertoireItem(fields) => fields.validate(),
            Self::NetworkingContact(fields) => fields.validate(),
        }
    }

    /// Dependent child records carried by this body.
    pub fn social_links(&self) -> &[SocialMediaLink] {
        match self {
            Self::NetworkingContact(fields) => &fields.social_links,
            _ => &[],
        }
    }

    /// Copy of this body without dependent children, as sent to the parent endpoint.
    pub fn without_children(&self) -> Self {
        let mut body = self.clone();
        if let Self::NetworkingContact(fields) = &mut body {
            fields.social_links.clear();
        }
        body
    }

    /// Attach children fetched or written separately. No-op for kinds without children.
    pub fn set_social_links(&mut self, links: Vec<SocialMediaLink>) {
        if let Self::NetworkingContact(fields) = self {
            fields.social_links = links;
        }
    }

    /// Shallow-merge a partial payload into this body.
    pub fn apply(&mut self, patch: &ResourcePatch) -> Result<(), ValidationError> {
        match (self, patch) {
            (Self::Event(fields), ResourcePatch::Event(p)) => fields.apply(p),
            (Self::FinancialTransaction(fields), ResourcePatch::FinancialTransaction(p)) => {
                fields.apply(p)
            }
            (Self::RepertoireItem(fields), ResourcePatch::RepertoireItem(p)) => fields.apply(p),
            (Self::NetworkingContact(fields), ResourcePatch::NetworkingContact(p)) => {
                fields.apply(p)
            }
            (body, patch) => return check_kind(body.kind(), patch.kind()),
        }
        Ok(())
    }
}

fn check_kind(expected: ResourceKind, got: ResourceKind) -> Result<(), ValidationError> {
    if expected != got {
        return Err(ValidationError::KindMismatch { expected, got });
    }
    Ok(())
}

// ============================================================================
// PARTIAL PAYLOADS
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_type: Option<EventType>,
    #[serde(default, deserialize_with = "deserialize_some", skip_serializing_if = "Option::is_none")]
    pub venue: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starts_at: Option<Timestamp>,
    #[serde(default, deserialize_with = "deserialize_some", skip_serializing_if = "Option::is_none")]
    pub ends_at: Option<Option<Timestamp>>,
    #[serde(default, deserialize_with = "deserialize_some", skip_serializing_if = "Option::is_none")]
    pub fee_cents: Option<Option<i64>>,
    #[serde(default, deserialize_with = "deserialize_some", skip_serializing_if = "Option::is_none")]
    pub notes: Option<Option<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_cents: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<TransactionDirection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occurred_on: Option<NaiveDate>,
    #[serde(default, deserialize_with = "deserialize_some", skip_serializing_if = "Option::is_none")]
    pub notes: Option<Option<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepertoirePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some", skip_serializing_if = "Option::is_none")]
    pub composer: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some", skip_serializing_if = "Option::is_none")]
    pub genre: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some", skip_serializing_if = "Option::is_none")]
    pub musical_key: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<RepertoireStatus>,
    #[serde(default, deserialize_with = "deserialize_some", skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<Option<u8>>,
    #[serde(default, deserialize_with = "deserialize_some", skip_serializing_if = "Option::is_none")]
    pub notes: Option<Option<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some", skip_serializing_if = "Option::is_none")]
    pub role: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some", skip_serializing_if = "Option::is_none")]
    pub company: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some", skip_serializing_if = "Option::is_none")]
    pub email: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some", skip_serializing_if = "Option::is_none")]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some", skip_serializing_if = "Option::is_none")]
    pub notes: Option<Option<String>>,
    /// Replaces the whole child collection when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub social_links: Option<Vec<SocialMediaLink>>,
}

/// Partial payload for an update, tagged by kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "fields", rename_all = "snake_case")]
pub enum ResourcePatch {
    Event(EventPatch),
    FinancialTransaction(TransactionPatch),
    RepertoireItem(RepertoirePatch),
    NetworkingContact(ContactPatch),
}

impl ResourcePatch {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::Event(_) => ResourceKind::Event,
            Self::FinancialTransaction(_) => ResourceKind::FinancialTransaction,
            Self::RepertoireItem(_) => ResourceKind::RepertoireItem,
            Self::NetworkingContact(_) => ResourceKind::NetworkingContact,
        }
    }

    pub fn expect_kind(&self, expected: ResourceKind) -> Result<(), ValidationError> {
        check_kind(expected, self.kind())
    }

    /// Check the fields this patch sets.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Self::Event(p) => {
                if let Some(title) = &p.title {
                    require_text("title", title)?;
                }
                if matches!(p.fee_cents, Some(Some(fee)) if fee < 0) {
                    return Err(ValidationError::InvalidValue {
                        field: "fee_cents",
                        reason: "must not be negative".to_string(),
                    });
                }
                Ok(())
            }
            Self::FinancialTransaction(p) => {
                if let Some(description) = &p.description {
                    require_text("description", description)?;
                }
                if let Some(category) = &p.category {
                    require_text("category", category)?;
                }
                if matches!(p.amount_cents, Some(amount) if amount <= 0) {
                    return Err(ValidationError::InvalidValue {
                        field: "amount_cents",
                        reason: "must be greater than zero".to_string(),
                    });
                }
                Ok(())
            }
            Self::RepertoireItem(p) => {
                if let Some(title) = &p.title {
                    require_text("title", title)?;
                }
                validate_difficulty(p.difficulty.flatten())
            }
            Self::NetworkingContact(p) => {
                if let Some(name) = &p.name {
                    require_text("name", name)?;
                }
                validate_email(p.email.as_ref().and_then(|e| e.as_deref()))?;
                p.social_links
                    .iter()
                    .flatten()
                    .try_for_each(SocialMediaLink::validate)
            }
        }
    }

    /// Replacement child collection carried by this patch, if any.
    pub fn social_links(&self) -> Option<&[SocialMediaLink]> {
        match self {
            Self::NetworkingContact(p) => p.social_links.as_deref(),
            _ => None,
        }
    }

    /// Copy of this patch without child changes, as sent to the parent endpoint.
    pub fn without_children(&self) -> Self {
        let mut patch = self.clone();
        if let Self::NetworkingContact(p) = &mut patch {
            p.social_links = None;
        }
        patch
    }
}

// ============================================================================
// RECORD
// ============================================================================

/// One row of a collection as the client sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub owner_id: OwnerId,
    pub body: ResourceBody,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    #[serde(default)]
    pub sync_state: SyncState,
}

impl Record {
    /// Build an optimistic record for a create that has not been confirmed yet.
    pub fn pending(id: RecordId, owner_id: OwnerId, body: ResourceBody, now: Timestamp) -> Self {
        Self {
            id,
            owner_id,
            body,
            created_at: now,
            updated_at: now,
            sync_state: SyncState::Pending,
        }
    }

    pub fn kind(&self) -> ResourceKind {
        self.body.kind()
    }

    pub fn is_pending(&self) -> bool {
        self.sync_state == SyncState::Pending || self.id.is_temporary()
    }

    pub fn with_sync_state(mut self, sync_state: SyncState) -> Self {
        self.sync_state = sync_state;
        self
    }
}

// ============================================================================
// ORDERING
// ============================================================================

impl SortKey {
    /// Compare two records of the same kind in listing order.
    ///
    /// Ties (and records of another kind) fall back to creation time so the
    /// order is total and stable across refetches.
    pub fn compare(self, a: &Record, b: &Record) -> Ordering {
        let primary = match (self, &a.body, &b.body) {
            (Self::StartsAtAscending, ResourceBody::Event(x), ResourceBody::Event(y)) => {
                x.starts_at.cmp(&y.starts_at)
            }
            (
                Self::OccurredOnDescending,
                ResourceBody::FinancialTransaction(x),
                ResourceBody::FinancialTransaction(y),
            ) => y.occurred_on.cmp(&x.occurred_on),
            (
                Self::TitleAscending,
                ResourceBody::RepertoireItem(x),
                ResourceBody::RepertoireItem(y),
            ) => x.title.to_lowercase().cmp(&y.title.to_lowercase()),
            (
                Self::NameAscending,
                ResourceBody::NetworkingContact(x),
                ResourceBody::NetworkingContact(y),
            ) => x.name.to_lowercase().cmp(&y.name.to_lowercase()),
            _ => Ordering::Equal,
        };
        primary.then_with(|| a.created_at.cmp(&b.created_at))
    }
}

/// Sort records in the listing order of `kind`.
pub fn sort_records(kind: ResourceKind, records: &mut [Record]) {
    let key = kind.spec().sort;
    records.sort_by(|a, b| key.compare(a, b));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn gig(title: &str, hour: u32) -> EventFields {
        EventFields {
            title: title.to_string(),
            event_type: EventType::Gig,
            venue: Some("Blue Note".to_string()),
            starts_at: Utc.with_ymd_and_hms(2026, 3, 14, hour, 0, 0).unwrap(),
            ends_at: None,
            fee_cents: Some(25_000),
            notes: None,
        }
    }

    fn contact(name: &str) -> ContactFields {
        ContactFields {
            name: name.to_string(),
            role: Some("Booker".to_string()),
            company: None,
            email: Some("booker@example.com".to_string()),
            phone: None,
            notes: None,
            social_links: vec![SocialMediaLink::new("instagram", "https://instagram.com/booker")],
        }
    }

    fn record(id: &str, body: ResourceBody) -> Record {
        let now = Utc::now();
        Record {
            id: RecordId::remote(id),
            owner_id: OwnerId::new_v7(),
            body,
            created_at: now,
            updated_at: now,
            sync_state: SyncState::Confirmed,
        }
    }

    #[test]
    fn test_event_validation() {
        assert!(ResourceBody::Event(gig("Friday set", 20)).validate().is_ok());

        let mut untitled = gig("  ", 20);
        assert_eq!(
            ResourceBody::Event(untitled.clone()).validate(),
            Err(ValidationError::RequiredFieldMissing { field: "title" })
        );

        untitled.title = "Set".to_string();
        untitled.ends_at = Some(untitled.starts_at - Duration::hours(1));
        assert!(matches!(
            ResourceBody::Event(untitled).validate(),
            Err(ValidationError::InvalidValue { field: "ends_at", .. })
        ));
    }

    #[test]
    fn test_transaction_requires_positive_amount() {
        let fields = TransactionFields {
            description: "Strings".to_string(),
            amount_cents: 0,
            direction: TransactionDirection::Expense,
            category: "Gear".to_string(),
            occurred_on: NaiveDate::from_ymd_opt(2026, 1, 2).unwrap(),
            notes: None,
        };
        assert!(ResourceBody::FinancialTransaction(fields.clone()).validate().is_err());

        let fields = TransactionFields {
            amount_cents: 1_299,
            ..fields
        };
        assert_eq!(fields.signed_amount_cents(), -1_299);
        assert!(ResourceBody::FinancialTransaction(fields).validate().is_ok());
    }

    #[test]
    fn test_contact_link_validation() {
        let mut fields = contact("Ana");
        assert!(ResourceBody::NetworkingContact(fields.clone()).validate().is_ok());

        fields.social_links.push(SocialMediaLink::new("site", "ftp://ana.example"));
        assert!(matches!(
            ResourceBody::NetworkingContact(fields).validate(),
            Err(ValidationError::InvalidValue { field: "social_links.url", .. })
        ));
    }

    #[test]
    fn test_apply_patch_is_shallow_merge() {
        let mut body = ResourceBody::Event(gig("Friday set", 20));
        let patch = ResourcePatch::Event(EventPatch {
            title: Some("Saturday set".to_string()),
            venue: Some(None),
            ..Default::default()
        });
        body.apply(&patch).unwrap();

        let ResourceBody::Event(fields) = body else {
            panic!("kind changed");
        };
        assert_eq!(fields.title, "Saturday set");
        assert_eq!(fields.venue, None);
        assert_eq!(fields.fee_cents, Some(25_000));
        assert_eq!(fields.event_type, EventType::Gig);
    }

    #[test]
    fn test_apply_patch_of_wrong_kind_is_rejected() {
        let mut body = ResourceBody::Event(gig("Friday set", 20));
        let before = body.clone();
        let patch = ResourcePatch::NetworkingContact(ContactPatch::default());
        assert_eq!(
            body.apply(&patch),
            Err(ValidationError::KindMismatch {
                expected: ResourceKind::Event,
                got: ResourceKind::NetworkingContact,
            })
        );
        assert_eq!(body, before);
    }

    #[test]
    fn test_without_children_strips_links() {
        let body = ResourceBody::NetworkingContact(contact("Ana"));
        assert_eq!(body.social_links().len(), 1);
        assert!(body.without_children().social_links().is_empty());

        let patch = ResourcePatch::NetworkingContact(ContactPatch {
            social_links: Some(vec![]),
            ..Default::default()
        });
        assert_eq!(patch.social_links(), Some(&[][..]));
        assert_eq!(patch.without_children().social_links(), None);
    }

    #[test]
    fn test_patch_serde_distinguishes_null_from_absent() {
        let patch: ContactPatch = serde_json::from_str(r#"{"email": null}"#).unwrap();
        assert_eq!(patch.email, Some(None));
        assert_eq!(patch.phone, None);
    }

    #[test]
    fn test_record_serde_tags_body_by_kind() {
        let rec = record("srv-1", ResourceBody::NetworkingContact(contact("Ana")));
        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json["id"], "srv-1");
        assert_eq!(json["body"]["kind"], "networking_contact");
        assert_eq!(json["body"]["fields"]["name"], "Ana");
        assert_eq!(json["sync_state"], "confirmed");

        let back: Record = serde_json::from_value(json).unwrap();
        assert_eq!(back, rec);
    }

    #[test]
    fn test_sort_events_by_start() {
        let mut records = vec![
            record("srv-2", ResourceBody::Event(gig("late", 22))),
            record("srv-1", ResourceBody::Event(gig("early", 18))),
        ];
        sort_records(ResourceKind::Event, &mut records);
        assert_eq!(records[0].id, RecordId::remote("srv-1"));
    }

    #[test]
    fn test_sort_contacts_case_insensitive() {
        let mut records = vec![
            record("srv-1", ResourceBody::NetworkingContact(contact("zoe"))),
            record("srv-2", ResourceBody::NetworkingContact(contact("Adam"))),
        ];
        sort_records(ResourceKind::NetworkingContact, &mut records);
        assert_eq!(records[0].id, RecordId::remote("srv-2"));
    }

    #[test]
    fn test_pending_record() {
        let rec = Record::pending(
            RecordId::Temporary(1),
            OwnerId::new_v7(),
            ResourceBody::Event(gig("set", 20)),
            Utc::now(),
        );
        assert!(rec.is_pending());
        assert_eq!(rec.kind(), ResourceKind::Event);
        assert_eq!(rec.created_at, rec.updated_at);
    }
}
