//! Enum types and the per-kind dispatch table

use serde::{Deserialize, Serialize};
use std::fmt;

/// The four first-class collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Event,
    FinancialTransaction,
    RepertoireItem,
    NetworkingContact,
}

impl ResourceKind {
    /// Every kind, in a stable order.
    pub const ALL: [ResourceKind; 4] = [
        ResourceKind::Event,
        ResourceKind::FinancialTransaction,
        ResourceKind::RepertoireItem,
        ResourceKind::NetworkingContact,
    ];

    /// Dense index for per-kind arrays.
    pub fn index(self) -> usize {
        match self {
            Self::Event => 0,
            Self::FinancialTransaction => 1,
            Self::RepertoireItem => 2,
            Self::NetworkingContact => 3,
        }
    }

    /// Dispatch entry for this kind.
    pub fn spec(self) -> &'static KindSpec {
        &KIND_SPECS[self.index()]
    }

    /// Human-facing singular label used in notifications.
    pub fn label(self) -> &'static str {
        match self {
            Self::Event => "event",
            Self::FinancialTransaction => "transaction",
            Self::RepertoireItem => "repertoire item",
            Self::NetworkingContact => "contact",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.spec().table)
    }
}

/// Which plan ceiling governs a kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitCategory {
    Events,
    Finances,
    Repertoire,
    Networking,
}

/// Ordering the remote store applies when listing a kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortKey {
    /// Events: start time, earliest first.
    StartsAtAscending,
    /// Transactions: date, newest first.
    OccurredOnDescending,
    /// Repertoire: title, case-insensitive A-Z.
    TitleAscending,
    /// Contacts: name, case-insensitive A-Z.
    NameAscending,
}

/// Static description of one resource kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindSpec {
    pub kind: ResourceKind,
    /// Remote collection (table) name.
    pub table: &'static str,
    pub limit_category: LimitCategory,
    pub sort: SortKey,
    /// Whether records own a dependent child collection.
    pub has_children: bool,
}

static KIND_SPECS: [KindSpec; 4] = [
    KindSpec {
        kind: ResourceKind::Event,
        table: "events",
        limit_category: LimitCategory::Events,
        sort: SortKey::StartsAtAscending,
        has_children: false,
    },
    KindSpec {
        kind: ResourceKind::FinancialTransaction,
        table: "financial_transactions",
        limit_category: LimitCategory::Finances,
        sort: SortKey::OccurredOnDescending,
        has_children: false,
    },
    KindSpec {
        kind: ResourceKind::RepertoireItem,
        table: "repertoire",
        limit_category: LimitCategory::Repertoire,
        sort: SortKey::TitleAscending,
        has_children: false,
    },
    KindSpec {
        kind: ResourceKind::NetworkingContact,
        table: "networking_contacts",
        limit_category: LimitCategory::Networking,
        sort: SortKey::NameAscending,
        has_children: true,
    },
];

/// Kind of calendar event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Gig,
    Rehearsal,
    Lesson,
    Recording,
    Meeting,
    Other,
}

/// Money in or money out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionDirection {
    Income,
    Expense,
}

/// How far along a piece is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepertoireStatus {
    Learning,
    Polishing,
    PerformanceReady,
    Retired,
}

/// Local synchronization state of a record in a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    /// Optimistically inserted, waiting for the remote store.
    Pending,
    /// Matches the last authoritative copy.
    #[default]
    Confirmed,
    /// Persisted, but its dependent children did not make it to the store.
    Incomplete,
}

/// Subscription tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanTier {
    #[default]
    Free,
    Pro,
}
