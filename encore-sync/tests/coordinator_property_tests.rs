//! Property-Based Tests for the Mutation Coordinator
//!
//! Covers optimistic visibility, consistency after confirmation, rollback of
//! failed creates/updates/deletes, order independence of concurrent creates,
//! and the plan limit gate.

use encore_test_utils::fixtures::{
    display_name, rename_patch, sample_body, sample_contact, sample_link, unavailable,
    uniform_limits,
};
use encore_test_utils::generators::*;
use encore_test_utils::{
    Ceiling, Harness, MutationError, PlanTier, ResourceKind, StoreOp, SubscriptionLimits,
};
use proptest::prelude::*;
use proptest::test_runner::TestCaseError;

mod test_support;
use test_support::{runtime, wait_until};

fn unlimited() -> SubscriptionLimits {
    SubscriptionLimits::for_tier(PlanTier::Pro)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(40))]

    /// The pending record is in the cache while the remote create is held.
    #[test]
    fn prop_pending_record_visible_before_remote_resolves(
        (kind, body) in arb_kind_and_body(),
        seeded in 0usize..4,
    ) {
        runtime().block_on(async {
            let h = Harness::new(unlimited());
            h.seed((0..seeded).map(|i| sample_body(kind, &format!("Seed {}", i))).collect());
            let mut rx = h.cache.subscribe(kind);
            let gate = h.store.hold_next(StoreOp::Create);

            let create = h.coordinator.create_item(kind, body.clone());
            let observe = async {
                let snapshot = wait_until(&h.cache, &mut rx, kind, "pending record", |s| !s.is_settled()).await;
                gate.release();
                snapshot
            };
            let (result, during) = tokio::join!(create, observe);

            prop_assert_eq!(during.len(), seeded + 1);
            let pending = &during.records()[0];
            prop_assert!(pending.id.is_temporary());
            prop_assert_eq!(display_name(&pending.body), display_name(&body));
            prop_assert!(result.is_ok());
            Ok::<(), TestCaseError>(())
        })?;
    }

    /// After a successful create there is exactly one record with the final
    /// id and none with a temporary id.
    #[test]
    fn prop_create_success_leaves_one_confirmed_record(
        (kind, body) in arb_kind_and_body(),
        seeded in 0usize..4,
    ) {
        runtime().block_on(async {
            let h = Harness::new(unlimited());
            h.seed((0..seeded).map(|i| sample_body(kind, &format!("Seed {}", i))).collect());

            let record = h
                .coordinator
                .create_item(kind, body.clone())
                .await
                .map_err(|e| TestCaseError::fail(format!("create failed: {:?}", e)))?
                .record
                .expect("create returns the record");

            let snapshot = h.snapshot(kind);
            prop_assert!(record.id.is_remote());
            prop_assert!(snapshot.is_settled());
            prop_assert_eq!(snapshot.len(), seeded + 1);
            prop_assert_eq!(snapshot.iter().filter(|r| r.id == record.id).count(), 1);
            prop_assert_eq!(record.body.social_links(), body.social_links());
            prop_assert_eq!(h.store.records(kind).len(), seeded + 1);
            Ok::<(), TestCaseError>(())
        })?;
    }

    /// A failed create leaves the cache with exactly the records it had.
    #[test]
    fn prop_failed_create_restores_previous_records(
        (kind, body) in arb_kind_and_body(),
        seeded in 0usize..4,
    ) {
        runtime().block_on(async {
            let h = Harness::new(unlimited());
            h.seed((0..seeded).map(|i| sample_body(kind, &format!("Seed {}", i))).collect());
            let before = h.snapshot(kind);
            h.store.fail_next(StoreOp::Create, unavailable("timeout"));

            let result = h.coordinator.create_item(kind, body).await;

            prop_assert!(matches!(result, Err(MutationError::RemoteFailure { .. })), "expected RemoteFailure");
            prop_assert_eq!(h.snapshot(kind), before);
            Ok::<(), TestCaseError>(())
        })?;
    }

    /// A failed update leaves the cache exactly as it was before the
    /// optimistic merge.
    #[test]
    fn prop_failed_update_restores_snapshot(
        kind in arb_kind(),
        seeded in 1usize..5,
        target in any::<prop::sample::Index>(),
        new_name in arb_title(),
    ) {
        runtime().block_on(async {
            let h = Harness::new(unlimited());
            let records = h.seed((0..seeded).map(|i| sample_body(kind, &format!("Seed {}", i))).collect());
            let id = records[target.index(records.len())].id.clone();
            let before = h.snapshot(kind);
            h.store.fail_next(StoreOp::Update, unavailable("timeout"));

            let result = h.coordinator.update_item(kind, &id, rename_patch(kind, &new_name)).await;

            prop_assert!(matches!(result, Err(MutationError::RemoteFailure { .. })), "expected RemoteFailure");
            prop_assert_eq!(h.snapshot(kind), before);
            Ok::<(), TestCaseError>(())
        })?;
    }

    /// A failed delete puts the record back where it was.
    #[test]
    fn prop_failed_delete_restores_snapshot(
        kind in arb_kind(),
        seeded in 1usize..5,
        target in any::<prop::sample::Index>(),
    ) {
        runtime().block_on(async {
            let h = Harness::new(unlimited());
            let records = h.seed((0..seeded).map(|i| sample_body(kind, &format!("Seed {}", i))).collect());
            let id = records[target.index(records.len())].id.clone();
            let before = h.snapshot(kind);
            h.store.fail_next(StoreOp::Delete, unavailable("timeout"));

            let result = h.coordinator.delete_item(kind, &id).await;

            prop_assert!(matches!(result, Err(MutationError::RemoteFailure { .. })), "expected RemoteFailure");
            prop_assert_eq!(h.snapshot(kind), before);
            prop_assert_eq!(h.store.records(kind).len(), seeded);
            Ok::<(), TestCaseError>(())
        })?;
    }

    /// Two creates confirming in reverse order each end up with their own
    /// server copy.
    #[test]
    fn prop_out_of_order_confirmation_does_not_cross(
        kind in arb_kind(),
        name_a in arb_title(),
        name_b in arb_title(),
    ) {
        runtime().block_on(async {
            let h = Harness::new(unlimited());
            let mut rx = h.cache.subscribe(kind);
            let gate_a = h.store.hold_next(StoreOp::Create);
            let gate_b = h.store.hold_next(StoreOp::Create);

            let create_a = h.coordinator.create_item(kind, sample_body(kind, &name_a));
            let create_b = h.coordinator.create_item(kind, sample_body(kind, &name_b));
            let releaser = async {
                wait_until(&h.cache, &mut rx, kind, "both pending", |s| s.pending().count() == 2).await;
                gate_b.release();
                wait_until(&h.cache, &mut rx, kind, "B confirmed", |s| s.pending().count() == 1).await;
                gate_a.release();
            };
            let (a, b, ()) = tokio::join!(create_a, create_b, releaser);

            let a = a.map_err(|e| TestCaseError::fail(format!("{:?}", e)))?.record.expect("record");
            let b = b.map_err(|e| TestCaseError::fail(format!("{:?}", e)))?.record.expect("record");
            prop_assert_eq!(b.id.to_string(), "srv-1");
            prop_assert_eq!(a.id.to_string(), "srv-2");

            let snapshot = h.snapshot(kind);
            prop_assert!(snapshot.is_settled());
            prop_assert_eq!(snapshot.len(), 2);
            let cached_a = snapshot.find(&a.id).expect("A cached");
            let cached_b = snapshot.find(&b.id).expect("B cached");
            prop_assert_eq!(display_name(&cached_a.body), name_a.as_str());
            prop_assert_eq!(display_name(&cached_b.body), name_b.as_str());
            Ok::<(), TestCaseError>(())
        })?;
    }

    /// The create gate matches the pure evaluator, and a rejection touches
    /// neither the cache nor the network.
    #[test]
    fn prop_limit_gate_matches_evaluator(
        ceiling in arb_ceiling(),
        kind in arb_kind(),
        seeded in 0usize..8,
    ) {
        runtime().block_on(async {
            let limits = uniform_limits(ceiling);
            let h = Harness::new(limits);
            h.seed((0..seeded).map(|i| sample_body(kind, &format!("Seed {}", i))).collect());
            let before = h.snapshot(kind);

            let result = h.coordinator.create_item(kind, sample_body(kind, "New")).await;

            if limits.allows(kind, seeded as i64) {
                prop_assert!(result.is_ok());
                prop_assert_eq!(h.store.calls(StoreOp::Create), 1);
            } else {
                let is_limit_exceeded = matches!(
                    result,
                    Err(MutationError::LimitExceeded { current, .. }) if current == seeded as u64
                );
                prop_assert!(is_limit_exceeded);
                prop_assert!(matches!(ceiling, Ceiling::Limited(_)));
                prop_assert_eq!(h.store.calls(StoreOp::Create), 0);
                prop_assert_eq!(h.snapshot(kind), before);
            }
            Ok::<(), TestCaseError>(())
        })?;
    }
}

#[test]
fn test_contact_create_writes_links_once() {
    runtime().block_on(async {
        let h = Harness::new(unlimited());
        let body = sample_contact("Ana", vec![sample_link("site")]);
        let outcome = h
            .coordinator
            .create_item(ResourceKind::NetworkingContact, body)
            .await
            .unwrap();
        let record = outcome.record.unwrap();
        assert_eq!(h.store.children(&record.id).len(), 1);
        assert_eq!(h.store.calls(StoreOp::ReplaceChildren), 1);
    });
}
