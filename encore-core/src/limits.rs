//! Plan ceilings and the resource limit evaluator.
//!
//! Each subscription tier caps how many records of each kind an owner may
//! keep. The evaluator is a pure function of (kind, current count, limits):
//! it never touches the cache or the network.

use crate::{LimitCategory, MutationError, PlanTier, ResourceKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Wire value meaning "no ceiling".
pub const UNLIMITED_SENTINEL: i64 = -1;

/// A ceiling value outside `-1..=u32::MAX`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid ceiling {0}: expected -1 (unlimited) or a non-negative count")]
pub struct InvalidCeiling(pub i64);

/// Maximum number of records of one kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum Ceiling {
    Limited(u32),
    Unlimited,
}

impl Ceiling {
    /// Whether one more record fits when `current_count` already exist.
    ///
    /// Negative counts are clamped to zero.
    pub fn allows(self, current_count: i64) -> bool {
        match self {
            Self::Unlimited => true,
            Self::Limited(max) => clamp_count(current_count) < u64::from(max),
        }
    }

    /// Records still available, or `None` when unlimited.
    pub fn remaining(self, current_count: i64) -> Option<u32> {
        match self {
            Self::Unlimited => None,
            Self::Limited(max) => {
                let left = u64::from(max).saturating_sub(clamp_count(current_count));
                Some(left as u32)
            }
        }
    }

    pub fn is_unlimited(self) -> bool {
        matches!(self, Self::Unlimited)
    }
}

fn clamp_count(count: i64) -> u64 {
    count.max(0) as u64
}

impl TryFrom<i64> for Ceiling {
    type Error = InvalidCeiling;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        if value == UNLIMITED_SENTINEL {
            return Ok(Self::Unlimited);
        }
        u32::try_from(value)
            .map(Self::Limited)
            .map_err(|_| InvalidCeiling(value))
    }
}

impl From<Ceiling> for i64 {
    fn from(ceiling: Ceiling) -> Self {
        match ceiling {
            Ceiling::Limited(max) => i64::from(max),
            Ceiling::Unlimited => UNLIMITED_SENTINEL,
        }
    }
}

/// Per-owner ceilings plus the ads flag, as stored by the remote platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionLimits {
    pub events: Ceiling,
    pub finances: Ceiling,
    pub repertoire: Ceiling,
    pub networking: Ceiling,
    #[serde(alias = "show_ads")]
    pub show_ads: bool,
}

impl SubscriptionLimits {
    /// Preset ceilings for a tier.
    pub fn for_tier(tier: PlanTier) -> Self {
        match tier {
            PlanTier::Free => Self {
                events: Ceiling::Limited(5),
                finances: Ceiling::Limited(10),
                repertoire: Ceiling::Limited(10),
                networking: Ceiling::Limited(5),
                show_ads: true,
            },
            PlanTier::Pro => Self {
                events: Ceiling::Unlimited,
                finances: Ceiling::Unlimited,
                repertoire: Ceiling::Unlimited,
                networking: Ceiling::Unlimited,
                show_ads: false,
            },
        }
    }

    pub fn ceiling_for(&self, category: LimitCategory) -> Ceiling {
        match category {
            LimitCategory::Events => self.events,
            LimitCategory::Finances => self.finances,
            LimitCategory::Repertoire => self.repertoire,
            LimitCategory::Networking => self.networking,
        }
    }

    pub fn ceiling(&self, kind: ResourceKind) -> Ceiling {
        self.ceiling_for(kind.spec().limit_category)
    }

    /// `allows(kind, currentCount)`: strict less-than against the ceiling.
    pub fn allows(&self, kind: ResourceKind, current_count: i64) -> bool {
        self.ceiling(kind).allows(current_count)
    }

    pub fn remaining(&self, kind: ResourceKind, current_count: i64) -> Option<u32> {
        self.ceiling(kind).remaining(current_count)
    }

    pub fn usage(&self, kind: ResourceKind, current_count: i64) -> LimitUsage {
        LimitUsage {
            kind,
            used: clamp_count(current_count),
            ceiling: self.ceiling(kind),
        }
    }

    /// Same decision as [`allows`](Self::allows), as a precondition error.
    pub fn check(&self, kind: ResourceKind, current_count: i64) -> Result<(), MutationError> {
        match self.ceiling(kind) {
            Ceiling::Limited(ceiling) if !self.allows(kind, current_count) => {
                Err(MutationError::LimitExceeded {
                    kind,
                    ceiling,
                    current: clamp_count(current_count),
                })
            }
            _ => Ok(()),
        }
    }
}

impl Default for SubscriptionLimits {
    fn default() -> Self {
        Self::for_tier(PlanTier::Free)
    }
}

/// "N of M used" view for one kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitUsage {
    pub kind: ResourceKind,
    pub used: u64,
    pub ceiling: Ceiling,
}

impl LimitUsage {
    pub fn is_at_limit(&self) -> bool {
        !self.ceiling.allows(self.used as i64)
    }

    pub fn remaining(&self) -> Option<u32> {
        self.ceiling.remaining(self.used as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn limits_with(ceiling: Ceiling) -> SubscriptionLimits {
        SubscriptionLimits {
            events: ceiling,
            finances: ceiling,
            repertoire: ceiling,
            networking: ceiling,
            show_ads: true,
        }
    }

    #[test]
    fn test_ceiling_is_strict_less_than() {
        let ceiling = Ceiling::Limited(5);
        assert!(ceiling.allows(4));
        assert!(!ceiling.allows(5));
        assert!(!ceiling.allows(6));
    }

    #[test]
    fn test_zero_ceiling_always_denies() {
        let ceiling = Ceiling::Limited(0);
        assert!(!ceiling.allows(0));
        assert!(!ceiling.allows(-3));
    }

    #[test]
    fn test_negative_counts_are_zero() {
        let ceiling = Ceiling::Limited(1);
        assert!(ceiling.allows(-10));
        assert_eq!(ceiling.remaining(-10), Some(1));
    }

    #[test]
    fn test_pro_allows_ten_thousand() {
        let limits = SubscriptionLimits::for_tier(PlanTier::Pro);
        assert!(limits.allows(ResourceKind::Event, 10_000));
        assert_eq!(limits.remaining(ResourceKind::Event, 10_000), None);
        assert!(!limits.show_ads);
    }

    #[test]
    fn test_check_reports_limit_exceeded() {
        let limits = limits_with(Ceiling::Limited(5));
        assert!(limits.check(ResourceKind::NetworkingContact, 4).is_ok());
        assert_eq!(
            limits.check(ResourceKind::NetworkingContact, 5),
            Err(MutationError::LimitExceeded {
                kind: ResourceKind::NetworkingContact,
                ceiling: 5,
                current: 5,
            })
        );
    }

    #[test]
    fn test_kind_maps_to_its_category() {
        let limits = SubscriptionLimits {
            events: Ceiling::Limited(1),
            finances: Ceiling::Limited(2),
            repertoire: Ceiling::Limited(3),
            networking: Ceiling::Unlimited,
            show_ads: false,
        };
        assert_eq!(limits.ceiling(ResourceKind::Event), Ceiling::Limited(1));
        assert_eq!(limits.ceiling(ResourceKind::FinancialTransaction), Ceiling::Limited(2));
        assert_eq!(limits.ceiling(ResourceKind::RepertoireItem), Ceiling::Limited(3));
        assert_eq!(limits.ceiling(ResourceKind::NetworkingContact), Ceiling::Unlimited);
    }

    #[test]
    fn test_limits_wire_format() {
        let json = r#"{"events": 5, "finances": -1, "repertoire": 0, "networking": 12, "showAds": true}"#;
        let limits: SubscriptionLimits = serde_json::from_str(json).unwrap();
        assert_eq!(limits.events, Ceiling::Limited(5));
        assert_eq!(limits.finances, Ceiling::Unlimited);
        assert_eq!(limits.repertoire, Ceiling::Limited(0));
        assert!(limits.show_ads);

        let back = serde_json::to_value(limits).unwrap();
        assert_eq!(back["finances"], -1);
        assert_eq!(back["showAds"], true);
    }

    #[test]
    fn test_other_negative_ceilings_are_rejected() {
        assert_eq!(Ceiling::try_from(-2i64), Err(InvalidCeiling(-2)));
        let json = r#"{"events": -5, "finances": 1, "repertoire": 1, "networking": 1, "showAds": false}"#;
        assert!(serde_json::from_str::<SubscriptionLimits>(json).is_err());
    }

    #[test]
    fn test_usage_view() {
        let usage = SubscriptionLimits::default().usage(ResourceKind::Event, 3);
        assert_eq!(usage.used, 3);
        assert_eq!(usage.remaining(), Some(2));
        assert!(!usage.is_at_limit());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn prop_limited_ceiling_is_strict_less_than(max in 0u32..10_000, count in -100i64..20_000) {
            let limits = limits_with(Ceiling::Limited(max));
            for kind in ResourceKind::ALL {
                prop_assert_eq!(limits.allows(kind, count), count.max(0) < i64::from(max));
            }
        }

        #[test]
        fn prop_unlimited_allows_everything(count in any::<i64>()) {
            let limits = limits_with(Ceiling::Unlimited);
            for kind in ResourceKind::ALL {
                prop_assert!(limits.allows(kind, count));
            }
        }

        #[test]
        fn prop_allowing_fewer_is_monotone(max in 0u32..1_000, count in 0i64..2_000) {
            let ceiling = Ceiling::Limited(max);
            if ceiling.allows(count) {
                prop_assert!(ceiling.allows(count - 1));
            }
        }
    }
}
