//! Cross-context propagation integration tests
//!
//! Drives the full restricted-side flow against the in-memory platform:
//! - Happy path through the handoff to Done, with both values readable back
//! - Empty-string writes as explicit clears
//! - Validation and transport failure states
//! - The capability boundary on the restricted value store

use prefsync_sdk::mock::MockPlatform;
use prefsync_sdk::{
    handoff, FailureReason, OwnerId, PropagationInput, Propagator, PropagatorState, SdkError,
    UserError, ValueStore, CUSTOMER_PREF_KEY, ORDER_PREF_KEY, PREFERENCES_NAMESPACE,
};

fn order_id() -> OwnerId {
    OwnerId::order("6001")
}

fn customer_id() -> OwnerId {
    OwnerId::customer("42")
}

// =============================================================================
// Happy path
// =============================================================================

#[tokio::test]
async fn propagation_reaches_done_and_both_values_read_back() {
    let platform = MockPlatform::new();
    platform.insert_order(order_id(), "#1001").await;
    let account = platform.account(customer_id()).with_first_name("Ada");

    let (bridge, worker) = handoff::channel(platform.clone(), platform.clone(), 8);
    tokio::spawn(worker.run());

    let mut propagator = Propagator::new(account, bridge);
    let state = propagator
        .run(&PropagationInput::new(order_id(), "Captain", "2 days"))
        .await;

    assert_eq!(state, PropagatorState::Done);

    // Handoff correctness: the privileged side wrote the order value...
    assert_eq!(
        platform
            .value_read(ORDER_PREF_KEY, PREFERENCES_NAMESPACE, &order_id())
            .await
            .unwrap(),
        Some("2 days".to_string())
    );
    // ...and the restricted side wrote the customer value directly.
    assert_eq!(
        platform
            .value_read(CUSTOMER_PREF_KEY, PREFERENCES_NAMESPACE, &customer_id())
            .await
            .unwrap(),
        Some("Captain".to_string())
    );

    // One definition per triple, both registered by the run.
    assert_eq!(platform.definition_count().await, 2);

    let report = propagator.report();
    let snapshot = report.snapshot.as_ref().unwrap();
    assert_eq!(snapshot.first_name.as_deref(), Some("Ada"));
    assert_eq!(snapshot.order.as_ref().unwrap().name, "#1001");
    assert!(report.customer_definition.as_ref().unwrap().id.is_some());
    assert!(report.handoff.as_ref().unwrap().is_clean());
}

#[tokio::test]
async fn repeated_propagation_is_idempotent() {
    let platform = MockPlatform::new();
    platform.insert_order(order_id(), "#1001").await;
    let account = platform.account(customer_id());

    let (bridge, worker) = handoff::channel(platform.clone(), platform.clone(), 8);
    tokio::spawn(worker.run());

    let mut propagator = Propagator::new(account, bridge);
    let input = PropagationInput::new(order_id(), "Captain", "2 days");

    assert_eq!(propagator.run(&input).await, PropagatorState::Done);
    assert_eq!(propagator.run(&input).await, PropagatorState::Done);

    assert_eq!(platform.definition_count().await, 2);
    assert_eq!(
        platform
            .stored_value(PREFERENCES_NAMESPACE, ORDER_PREF_KEY, &order_id())
            .await,
        Some("2 days".to_string())
    );
}

#[tokio::test]
async fn unknown_order_falls_back_to_the_requested_id() {
    let platform = MockPlatform::new();
    // No insert_order: the snapshot resolves no order.
    let account = platform.account(customer_id());

    let (bridge, worker) = handoff::channel(platform.clone(), platform.clone(), 8);
    tokio::spawn(worker.run());

    let mut propagator = Propagator::new(account, bridge);
    let state = propagator
        .run(&PropagationInput::new(order_id(), "Captain", "2 days"))
        .await;

    assert_eq!(state, PropagatorState::Done);
    assert!(propagator.report().snapshot.as_ref().unwrap().order.is_none());
    assert_eq!(
        platform
            .stored_value(PREFERENCES_NAMESPACE, ORDER_PREF_KEY, &order_id())
            .await,
        Some("2 days".to_string())
    );
}

// =============================================================================
// Empty-string writes
// =============================================================================

#[tokio::test]
async fn empty_string_is_a_value_not_an_absence() {
    let platform = MockPlatform::new();
    platform.insert_order(order_id(), "#1001").await;
    let account = platform.account(customer_id());

    let (bridge, worker) = handoff::channel(platform.clone(), platform.clone(), 8);
    tokio::spawn(worker.run());

    let mut propagator = Propagator::new(account, bridge);
    let state = propagator
        .run(&PropagationInput::new(order_id(), "", ""))
        .await;

    assert_eq!(state, PropagatorState::Done);
    assert_eq!(
        platform
            .value_read(CUSTOMER_PREF_KEY, PREFERENCES_NAMESPACE, &customer_id())
            .await
            .unwrap(),
        Some(String::new())
    );
    assert_eq!(
        platform
            .value_read(ORDER_PREF_KEY, PREFERENCES_NAMESPACE, &order_id())
            .await
            .unwrap(),
        Some(String::new())
    );
}

// =============================================================================
// Failure states
// =============================================================================

#[tokio::test]
async fn snapshot_transport_failure_fails_with_network_reason() {
    let platform = MockPlatform::new();
    platform.set_snapshot_failure(true).await;
    let account = platform.account(customer_id());

    let (bridge, worker) = handoff::channel(platform.clone(), platform.clone(), 8);
    tokio::spawn(worker.run());

    let mut propagator = Propagator::new(account, bridge);
    let state = propagator
        .run(&PropagationInput::new(order_id(), "Captain", "2 days"))
        .await;

    assert!(matches!(
        state,
        PropagatorState::Failed(FailureReason::Network(_))
    ));
    assert!(propagator.report().snapshot.is_none());
}

#[tokio::test]
async fn rejected_write_fails_with_the_errors_attached() {
    let platform = MockPlatform::new();
    platform.insert_order(order_id(), "#1001").await;
    let account = platform.account(customer_id());

    let (bridge, worker) = handoff::channel(platform.clone(), platform.clone(), 8);
    tokio::spawn(worker.run());

    let mut propagator = Propagator::new(account, bridge);

    // The customer write is the first value mutation in the flow.
    platform
        .inject_write_rejection(UserError {
            field: Some(vec!["metafields".into(), "0".into(), "value".into()]),
            message: "Value is invalid".into(),
            code: Some("INVALID".into()),
            element_index: Some(0),
        })
        .await;

    let state = propagator
        .run(&PropagationInput::new(order_id(), "Captain", "2 days"))
        .await;

    match state {
        PropagatorState::Failed(FailureReason::Validation(errors)) => {
            assert_eq!(errors[0].code.as_deref(), Some("INVALID"));
        }
        other => panic!("expected validation failure, got {other:?}"),
    }

    // The flow stopped before the handoff: no order value was written.
    assert_eq!(
        platform
            .stored_value(PREFERENCES_NAMESPACE, ORDER_PREF_KEY, &order_id())
            .await,
        None
    );
}

// =============================================================================
// Capability boundary
// =============================================================================

#[tokio::test]
async fn restricted_order_write_is_a_capability_error_with_no_side_effects() {
    let platform = MockPlatform::new();
    let account = platform.account(customer_id());

    let err = account
        .value_write(ORDER_PREF_KEY, PREFERENCES_NAMESPACE, &order_id(), "2 days")
        .await
        .unwrap_err();

    assert!(matches!(err, SdkError::Capability(_)));
    // Refused by construction: nothing reached the store.
    assert_eq!(platform.write_calls().await, 0);
    assert_eq!(
        platform
            .stored_value(PREFERENCES_NAMESPACE, ORDER_PREF_KEY, &order_id())
            .await,
        None
    );
}
