//! Reconciliation integration tests
//!
//! Exercises the ensure-definition protocol against the in-memory platform:
//! - Create-then-update convergence on repeated runs
//! - At-most-one definition per triple
//! - The concurrent double-create race and its fallback path

use prefsync_sdk::mock::MockPlatform;
use prefsync_sdk::{
    DefinitionSpec, OwnerType, ReconcileAction, Reconciler, PREFERENCES_NAMESPACE,
};

// =============================================================================
// Sequential idempotence
// =============================================================================

#[tokio::test]
async fn reconcile_twice_converges_on_one_definition() {
    let platform = MockPlatform::new();
    let reconciler = Reconciler::new(platform.clone());
    let spec = DefinitionSpec::single_line_text("nickname", OwnerType::Customer);

    let first = reconciler.ensure(&spec).await.unwrap();
    assert_eq!(first.action, ReconcileAction::Created);
    assert!(first.is_clean());
    let first_id = first.definition.unwrap().id.unwrap();
    assert!(!first_id.is_empty());

    let second = reconciler.ensure(&spec).await.unwrap();
    assert_eq!(second.action, ReconcileAction::Updated);
    assert!(second.is_clean(), "second run must not surface duplication errors");
    assert_eq!(second.definition.unwrap().id.unwrap(), first_id);

    assert_eq!(platform.definition_count().await, 1);
}

#[tokio::test]
async fn many_sequential_runs_never_duplicate() {
    let platform = MockPlatform::new();
    let reconciler = Reconciler::new(platform.clone());
    let spec = DefinitionSpec::single_line_text("expected_delivery_time", OwnerType::Order);

    for _ in 0..5 {
        let outcome = reconciler.ensure(&spec).await.unwrap();
        assert!(outcome.is_clean());
        assert!(outcome.definition.is_some());
    }

    assert_eq!(platform.definition_count().await, 1);
    assert_eq!(platform.create_calls().await, 1);
    assert_eq!(platform.update_calls().await, 4);
}

#[tokio::test]
async fn reconciled_definition_matches_the_spec() {
    let platform = MockPlatform::new();
    let reconciler = Reconciler::new(platform.clone());
    let spec = DefinitionSpec::single_line_text("nickname", OwnerType::Customer);

    let definition = reconciler
        .ensure(&spec)
        .await
        .unwrap()
        .definition
        .unwrap();

    assert_eq!(definition.key, "nickname");
    assert_eq!(definition.namespace, PREFERENCES_NAMESPACE);
    assert_eq!(definition.owner_type, OwnerType::Customer);
    assert_eq!(definition.access, spec.access);
    assert!(definition.pinned);
}

// =============================================================================
// Concurrent double-create race
// =============================================================================

#[tokio::test]
async fn concurrent_reconcilers_leave_exactly_one_definition() {
    let platform = MockPlatform::new();
    // Delay creates so both runs pass their get before either create lands.
    platform.set_create_delay(20).await;

    let left = Reconciler::new(platform.clone());
    let right = Reconciler::new(platform.clone());
    let spec = DefinitionSpec::single_line_text("nickname", OwnerType::Customer);

    let (a, b) = tokio::join!(left.ensure(&spec), right.ensure(&spec));
    let a = a.unwrap();
    let b = b.unwrap();

    // The losing run completes via fallback-to-update, not a fatal error.
    assert!(a.is_clean());
    assert!(b.is_clean());
    assert!(
        !(a.action == ReconcileAction::Created && b.action == ReconcileAction::Created),
        "both runs cannot win the create"
    );

    assert_eq!(platform.definition_count().await, 1);
    assert_eq!(
        a.definition.unwrap().id,
        b.definition.unwrap().id,
        "both runs must settle on the same definition"
    );
}
