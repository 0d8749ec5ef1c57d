//! Per-session cache of the signed-in owner's plan limits.

use encore_core::{OwnerId, PlanTier, SubscriptionLimits};
use encore_storage::LimitsSource;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, warn};

/// Plan limits of one owner, fetched once and reused until the plan changes
/// or the owner signs out.
///
/// When the source cannot be reached the session answers with the limits of
/// `fallback_tier` without caching them, so the next call tries again.
pub struct SubscriptionSession {
    owner_id: OwnerId,
    source: Arc<dyn LimitsSource>,
    fallback_tier: PlanTier,
    cached: RwLock<Option<SubscriptionLimits>>,
}

impl SubscriptionSession {
    pub fn new(owner_id: OwnerId, source: Arc<dyn LimitsSource>, fallback_tier: PlanTier) -> Self {
        Self {
            owner_id,
            source,
            fallback_tier,
            cached: RwLock::new(None),
        }
    }

    pub fn owner_id(&self) -> OwnerId {
        self.owner_id
    }

    /// Limits currently cached, if any.
    pub fn current(&self) -> Option<SubscriptionLimits> {
        *self.cached.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether ads should be shown, using the fallback tier until limits load.
    pub fn show_ads(&self) -> bool {
        self.current()
            .unwrap_or_else(|| SubscriptionLimits::for_tier(self.fallback_tier))
            .show_ads
    }

    /// Cached limits, fetching them on first use.
    pub async fn ensure_loaded(&self) -> SubscriptionLimits {
        if let Some(limits) = self.current() {
            return limits;
        }
        self.fetch().await
    }

    /// Drop cached limits and fetch the new plan's.
    pub async fn on_plan_changed(&self) -> SubscriptionLimits {
        self.reset();
        debug!(owner_id = %self.owner_id, "Plan changed, refetching limits");
        self.fetch().await
    }

    /// Forget cached limits.
    pub fn sign_out(&self) {
        self.reset();
    }

    fn reset(&self) {
        *self.cached.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    async fn fetch(&self) -> SubscriptionLimits {
        match self.source.fetch_limits(self.owner_id).await {
            Ok(limits) => {
                *self.cached.write().unwrap_or_else(PoisonError::into_inner) = Some(limits);
                debug!(owner_id = %self.owner_id, limits = ?limits, "Subscription limits loaded");
                limits
            }
            Err(err) => {
                warn!(
                    owner_id = %self.owner_id,
                    fallback_tier = ?self.fallback_tier,
                    error = %err,
                    "Subscription limits unavailable, using fallback tier"
                );
                SubscriptionLimits::for_tier(self.fallback_tier)
            }
        }
    }
}

impl std::fmt::Debug for SubscriptionSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionSession")
            .field("owner_id", &self.owner_id)
            .field("fallback_tier", &self.fallback_tier)
            .field("cached", &self.current())
            .finish()
    }
}
