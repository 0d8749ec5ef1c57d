//! Encore Test Utilities
//!
//! Shared test infrastructure for the Encore workspace:
//! - Proptest generators for records, payloads and plan limits
//! - Fixtures for common records and patches
//! - A notification sink that records what it was sent
//! - A harness wiring a coordinator to an in-memory store
//! - Assertions for mutation results and cache state

pub use encore_core::{
    Ceiling, ContactFields, ContactPatch, CoordinatorConfig, EncoreConfig, EventFields,
    EventPatch, EventType, MutationError, OwnerId, PlanTier, Record, RecordId, RepertoireFields,
    RepertoirePatch, RepertoireStatus, ResourceBody, ResourceKind, ResourcePatch,
    SocialMediaLink, StorageError, SubscriptionLimits, SyncState, Timestamp,
    TransactionDirection, TransactionFields, TransactionPatch,
};
pub use encore_storage::{
    CollectionCache, CollectionSnapshot, Gate, InMemoryRemoteStore, RemoteStore, StoreOp,
};
pub use encore_sync::{
    Collections, MutationCoordinator, MutationOutcome, MutationPhase, Notification,
    NotificationAction, NotificationLevel, NotificationSink, SubscriptionSession,
};

use chrono::Utc;
use std::sync::{Arc, Mutex, PoisonError};

// ============================================================================
// RECORDING SINK
// ============================================================================

/// Notification sink that keeps every notification for later inspection.
#[derive(Debug, Default)]
pub struct RecordingSink {
    received: Mutex<Vec<Notification>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.received
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn last(&self) -> Option<Notification> {
        self.notifications().pop()
    }

    pub fn count(&self, level: NotificationLevel) -> usize {
        self.notifications()
            .iter()
            .filter(|n| n.level == level)
            .count()
    }

    pub fn clear(&self) {
        self.received
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl NotificationSink for RecordingSink {
    fn notify(&self, notification: Notification) {
        self.received
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notification);
    }
}

// ============================================================================
// HARNESS
// ============================================================================

/// A coordinator and collection queries wired to a fresh in-memory store,
/// a fresh cache and a recording sink, for one signed-in owner.
pub struct Harness {
    pub owner_id: OwnerId,
    pub store: Arc<InMemoryRemoteStore>,
    pub cache: Arc<CollectionCache>,
    pub session: Arc<SubscriptionSession>,
    pub sink: Arc<RecordingSink>,
    pub coordinator: MutationCoordinator,
    pub collections: Collections,
}

impl Harness {
    /// Harness whose owner is on `limits`, with default configuration.
    pub fn new(limits: SubscriptionLimits) -> Self {
        Self::with_config(limits, &EncoreConfig::default())
    }

    pub fn with_tier(tier: PlanTier) -> Self {
        Self::new(SubscriptionLimits::for_tier(tier))
    }

    pub fn with_config(limits: SubscriptionLimits, config: &EncoreConfig) -> Self {
        let owner_id = OwnerId::new_v7();
        let store = Arc::new(InMemoryRemoteStore::new());
        store.set_limits(owner_id, limits);
        let cache = Arc::new(CollectionCache::from_config(&config.cache));
        let session = Arc::new(SubscriptionSession::new(
            owner_id,
            store.clone(),
            config.limits.default_tier,
        ));
        let sink = Arc::new(RecordingSink::new());
        let coordinator = MutationCoordinator::new(
            store.clone(),
            cache.clone(),
            session.clone(),
            sink.clone(),
            config.coordinator.clone(),
        );
        let collections = Collections::new(store.clone(), cache.clone(), owner_id);
        Self {
            owner_id,
            store,
            cache,
            session,
            sink,
            coordinator,
            collections,
        }
    }

    /// Put records straight into the store and mirror the store into the
    /// cache, as if the collection had just been fetched.
    pub fn seed(&self, bodies: Vec<ResourceBody>) -> Vec<Record> {
        let seeded: Vec<Record> = bodies
            .into_iter()
            .map(|body| self.store.seed(self.owner_id, body))
            .collect();
        for kind in ResourceKind::ALL {
            if seeded.iter().any(|r| r.kind() == kind) {
                self.sync_cache_from_store(kind);
            }
        }
        seeded
    }

    /// Replace the cached snapshot of `kind` with what the store holds.
    pub fn sync_cache_from_store(&self, kind: ResourceKind) {
        let records = self
            .store
            .records(kind)
            .into_iter()
            .filter(|r| r.owner_id == self.owner_id)
            .map(|mut r| {
                r.body.set_social_links(self.store.children(&r.id));
                r
            })
            .collect();
        self.cache.set(kind, CollectionSnapshot::new(records));
    }

    pub fn snapshot(&self, kind: ResourceKind) -> CollectionSnapshot {
        self.cache.get(kind)
    }

    pub fn ids(&self, kind: ResourceKind) -> Vec<RecordId> {
        self.cache.get(kind).ids()
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for generating Encore types.

    use super::*;
    use chrono::{NaiveDate, TimeZone};
    use proptest::prelude::*;
    use uuid::Uuid;

    /// Generate an owner id.
    pub fn arb_owner_id() -> impl Strategy<Value = OwnerId> {
        any::<[u8; 16]>().prop_map(|bytes| OwnerId::from_uuid(Uuid::from_bytes(bytes)))
    }

    /// Generate a Timestamp within 2020-2030.
    pub fn arb_timestamp() -> impl Strategy<Value = Timestamp> {
        (1577836800i64..1893456000i64)
            .prop_map(|secs| Utc.timestamp_opt(secs, 0).single().unwrap_or_else(Utc::now))
    }

    pub fn arb_date() -> impl Strategy<Value = NaiveDate> {
        (2020i32..2030, 1u32..=12, 1u32..=28).prop_map(|(y, m, d)| {
            NaiveDate::from_ymd_opt(y, m, d).unwrap_or(NaiveDate::MIN)
        })
    }

    /// Non-blank display text.
    pub fn arb_title() -> impl Strategy<Value = String> {
        "[A-Za-z][A-Za-z0-9 '&-]{0,31}".prop_map(|s| s.trim_end().to_string())
    }

    fn arb_optional_text() -> impl Strategy<Value = Option<String>> {
        proptest::option::of("[A-Za-z0-9 ]{1,24}")
    }

    pub fn arb_kind() -> impl Strategy<Value = ResourceKind> {
        prop_oneof![
            Just(ResourceKind::Event),
            Just(ResourceKind::FinancialTransaction),
            Just(ResourceKind::RepertoireItem),
            Just(ResourceKind::NetworkingContact),
        ]
    }

    pub fn arb_event_type() -> impl Strategy<Value = EventType> {
        prop_oneof![
            Just(EventType::Gig),
            Just(EventType::Rehearsal),
            Just(EventType::Lesson),
            Just(EventType::Recording),
            Just(EventType::Meeting),
            Just(EventType::Other),
        ]
    }

    pub fn arb_repertoire_status() -> impl Strategy<Value = RepertoireStatus> {
        prop_oneof![
            Just(RepertoireStatus::Learning),
            Just(RepertoireStatus::Polishing),
            Just(RepertoireStatus::PerformanceReady),
            Just(RepertoireStatus::Retired),
        ]
    }

    /// Generate valid event fields (end, when set, after start).
    pub fn arb_event_fields() -> impl Strategy<Value = EventFields> {
        (
            arb_title(),
            arb_event_type(),
            arb_optional_text(),
            arb_timestamp(),
            proptest::option::of(0i64..6 * 3600),
            proptest::option::of(0i64..1_000_000),
        )
            .prop_map(|(title, event_type, venue, starts_at, length, fee_cents)| EventFields {
                title,
                event_type,
                venue,
                starts_at,
                ends_at: length.map(|secs| starts_at + chrono::Duration::seconds(secs)),
                fee_cents,
                notes: None,
            })
    }

    pub fn arb_transaction_fields() -> impl Strategy<Value = TransactionFields> {
        (
            arb_title(),
            1i64..10_000_000,
            prop_oneof![
                Just(TransactionDirection::Income),
                Just(TransactionDirection::Expense)
            ],
            arb_title(),
            arb_date(),
        )
            .prop_map(|(description, amount_cents, direction, category, occurred_on)| {
                TransactionFields {
                    description,
                    amount_cents,
                    direction,
                    category,
                    occurred_on,
                    notes: None,
                }
            })
    }

    pub fn arb_repertoire_fields() -> impl Strategy<Value = RepertoireFields> {
        (
            arb_title(),
            arb_optional_text(),
            arb_optional_text(),
            arb_repertoire_status(),
            proptest::option::of(1u8..=5),
        )
            .prop_map(|(title, composer, genre, status, difficulty)| RepertoireFields {
                title,
                composer,
                genre,
                musical_key: None,
                status,
                difficulty,
                notes: None,
            })
    }

    pub fn arb_social_link() -> impl Strategy<Value = SocialMediaLink> {
        (
            prop_oneof![Just("instagram"), Just("youtube"), Just("bandcamp"), Just("site")],
            "[a-z0-9]{1,16}",
        )
            .prop_map(|(platform, handle)| {
                SocialMediaLink::new(platform, format!("https://{}.example/{}", platform, handle))
            })
    }

    pub fn arb_contact_fields() -> impl Strategy<Value = ContactFields> {
        (
            arb_title(),
            arb_optional_text(),
            arb_optional_text(),
            proptest::collection::vec(arb_social_link(), 0..3),
        )
            .prop_map(|(name, role, company, social_links)| ContactFields {
                name,
                role,
                company,
                email: None,
                phone: None,
                notes: None,
                social_links,
            })
    }

    /// Generate a valid body of `kind`.
    pub fn arb_body(kind: ResourceKind) -> BoxedStrategy<ResourceBody> {
        match kind {
            ResourceKind::Event => arb_event_fields().prop_map(ResourceBody::Event).boxed(),
            ResourceKind::FinancialTransaction => arb_transaction_fields()
                .prop_map(ResourceBody::FinancialTransaction)
                .boxed(),
            ResourceKind::RepertoireItem => arb_repertoire_fields()
                .prop_map(ResourceBody::RepertoireItem)
                .boxed(),
            ResourceKind::NetworkingContact => arb_contact_fields()
                .prop_map(ResourceBody::NetworkingContact)
                .boxed(),
        }
    }

    /// Generate a kind together with a valid body of that kind.
    pub fn arb_kind_and_body() -> impl Strategy<Value = (ResourceKind, ResourceBody)> {
        arb_kind().prop_flat_map(|kind| (Just(kind), arb_body(kind)))
    }

    /// Generate a ceiling, unlimited about one time in five.
    pub fn arb_ceiling() -> impl Strategy<Value = Ceiling> {
        prop_oneof![
            4 => (0u32..50).prop_map(Ceiling::Limited),
            1 => Just(Ceiling::Unlimited),
        ]
    }

    pub fn arb_limits() -> impl Strategy<Value = SubscriptionLimits> {
        (
            arb_ceiling(),
            arb_ceiling(),
            arb_ceiling(),
            arb_ceiling(),
            any::<bool>(),
        )
            .prop_map(|(events, finances, repertoire, networking, show_ads)| {
                SubscriptionLimits {
                    events,
                    finances,
                    repertoire,
                    networking,
                    show_ads,
                }
            })
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built records and payloads for common testing scenarios.

    use super::*;
    use chrono::{NaiveDate, TimeZone};

    pub fn sample_event(title: &str) -> ResourceBody {
        ResourceBody::Event(EventFields {
            title: title.to_string(),
            event_type: EventType::Gig,
            venue: Some("The Jazz Cellar".to_string()),
            starts_at: Utc
                .with_ymd_and_hms(2026, 11, 7, 21, 0, 0)
                .single()
                .unwrap_or_else(Utc::now),
            ends_at: None,
            fee_cents: Some(30_000),
            notes: None,
        })
    }

    pub fn sample_transaction(description: &str) -> ResourceBody {
        ResourceBody::FinancialTransaction(TransactionFields {
            description: description.to_string(),
            amount_cents: 4_500,
            direction: TransactionDirection::Expense,
            category: "Gear".to_string(),
            occurred_on: NaiveDate::from_ymd_opt(2026, 10, 1).unwrap_or(NaiveDate::MIN),
            notes: None,
        })
    }

    pub fn sample_repertoire_item(title: &str) -> ResourceBody {
        ResourceBody::RepertoireItem(RepertoireFields {
            title: title.to_string(),
            composer: Some("Thelonious Monk".to_string()),
            genre: Some("Jazz".to_string()),
            musical_key: Some("Bb".to_string()),
            status: RepertoireStatus::Learning,
            difficulty: Some(3),
            notes: None,
        })
    }

    pub fn sample_contact(name: &str, social_links: Vec<SocialMediaLink>) -> ResourceBody {
        ResourceBody::NetworkingContact(ContactFields {
            name: name.to_string(),
            role: Some("Venue booker".to_string()),
            company: None,
            email: Some(format!("{}@example.com", name.to_lowercase().replace(' ', "."))),
            phone: None,
            notes: None,
            social_links,
        })
    }

    pub fn sample_link(platform: &str) -> SocialMediaLink {
        SocialMediaLink::new(platform, format!("https://{}.example/encore", platform))
    }

    /// A valid body of `kind` named `name`.
    pub fn sample_body(kind: ResourceKind, name: &str) -> ResourceBody {
        match kind {
            ResourceKind::Event => sample_event(name),
            ResourceKind::FinancialTransaction => sample_transaction(name),
            ResourceKind::RepertoireItem => sample_repertoire_item(name),
            ResourceKind::NetworkingContact => sample_contact(name, Vec::new()),
        }
    }

    /// A patch renaming a record of `kind` (title, description or name).
    pub fn rename_patch(kind: ResourceKind, name: &str) -> ResourcePatch {
        let name = Some(name.to_string());
        match kind {
            ResourceKind::Event => ResourcePatch::Event(EventPatch {
                title: name,
                ..Default::default()
            }),
            ResourceKind::FinancialTransaction => {
                ResourcePatch::FinancialTransaction(TransactionPatch {
                    description: name,
                    ..Default::default()
                })
            }
            ResourceKind::RepertoireItem => ResourcePatch::RepertoireItem(RepertoirePatch {
                title: name,
                ..Default::default()
            }),
            ResourceKind::NetworkingContact => ResourcePatch::NetworkingContact(ContactPatch {
                name,
                ..Default::default()
            }),
        }
    }

    /// Display name of a body: title, description or contact name.
    pub fn display_name(body: &ResourceBody) -> &str {
        match body {
            ResourceBody::Event(f) => &f.title,
            ResourceBody::FinancialTransaction(f) => &f.description,
            ResourceBody::RepertoireItem(f) => &f.title,
            ResourceBody::NetworkingContact(f) => &f.name,
        }
    }

    /// Limits with the same ceiling for every kind.
    pub fn uniform_limits(ceiling: Ceiling) -> SubscriptionLimits {
        SubscriptionLimits {
            events: ceiling,
            finances: ceiling,
            repertoire: ceiling,
            networking: ceiling,
            show_ads: !ceiling.is_unlimited(),
        }
    }

    pub fn unavailable(reason: &str) -> StorageError {
        StorageError::Unavailable {
            reason: reason.to_string(),
        }
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions for mutation results and cache state.

    use super::*;

    #[track_caller]
    pub fn assert_limit_exceeded<T: std::fmt::Debug>(result: &Result<T, MutationError>) {
        match result {
            Err(MutationError::LimitExceeded { .. }) => {}
            other => panic!("Expected LimitExceeded, got: {:?}", other),
        }
    }

    #[track_caller]
    pub fn assert_remote_failure<T: std::fmt::Debug>(result: &Result<T, MutationError>) {
        match result {
            Err(MutationError::RemoteFailure { .. }) => {}
            other => panic!("Expected RemoteFailure, got: {:?}", other),
        }
    }

    /// Assert no record in the snapshot carries a temporary id.
    #[track_caller]
    pub fn assert_settled(snapshot: &CollectionSnapshot) {
        assert!(
            snapshot.is_settled(),
            "Expected no pending records, got: {:?}",
            snapshot.ids()
        );
    }
}
