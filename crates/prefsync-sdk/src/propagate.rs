//! Cross-context propagation from the restricted account surface
//!
//! Runs in the restricted context. The customer-value path stays local
//! (the restricted context holds customer write capability); definition
//! reconciliation and the order-value write cross the capability boundary
//! through the handoff channel. One pass per trigger, no automatic retries:
//! transport failures and platform rejections both land in a terminal
//! `Failed` state carrying enough for the caller to display.

use crate::error::SdkError;
use crate::handoff::{HandoffAck, HandoffSender, OrderWriteRequest};
use crate::traits::{AccountReader, ValueStore};
use prefsync_client::{
    DefinitionSpec, FieldDefinition, OwnerId, OwnerType, ProfileSnapshot, UserError, WrittenValue,
};

/// Preference key for the customer-owned field.
pub const CUSTOMER_PREF_KEY: &str = "nickname";

/// Preference key for the order-owned field.
pub const ORDER_PREF_KEY: &str = "expected_delivery_time";

/// Why a propagation run stopped short of `Done`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// Transport-level failure; retry policy is the caller's decision
    Network(String),
    /// The platform rejected a step; attached for the caller to inspect,
    /// never retried automatically
    Validation(Vec<UserError>),
    /// A step was attempted outside its context's scope; the fix is
    /// routing, not retrying
    Capability(String),
}

/// Observable state of one propagation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropagatorState {
    Idle,
    Fetching,
    ReconcilingCustomer,
    WritingCustomer,
    HandoffOrder,
    Done,
    Failed(FailureReason),
}

/// Inputs for one propagation run. The order reference and both desired
/// values are caller-supplied; nothing here is a baked-in literal.
#[derive(Debug, Clone)]
pub struct PropagationInput {
    pub namespace: String,
    pub customer_key: String,
    pub customer_value: String,
    pub order_key: String,
    pub order_value: String,
    /// The known order whose detail value is being propagated
    pub order_id: OwnerId,
}

impl PropagationInput {
    /// Inputs under the default preference keys and namespace.
    pub fn new(
        order_id: OwnerId,
        customer_value: impl Into<String>,
        order_value: impl Into<String>,
    ) -> Self {
        Self {
            namespace: prefsync_client::PREFERENCES_NAMESPACE.to_string(),
            customer_key: CUSTOMER_PREF_KEY.to_string(),
            customer_value: customer_value.into(),
            order_key: ORDER_PREF_KEY.to_string(),
            order_value: order_value.into(),
            order_id,
        }
    }
}

/// Everything the run produced so far; partial on failure so the caller can
/// display the full last response rather than a swallowed summary.
#[derive(Debug, Clone, Default)]
pub struct PropagationReport {
    pub snapshot: Option<ProfileSnapshot>,
    pub customer_definition: Option<FieldDefinition>,
    pub customer_write: Option<WrittenValue>,
    pub handoff: Option<HandoffAck>,
}

/// Drives one trigger through
/// `Idle → Fetching → ReconcilingCustomer → WritingCustomer → HandoffOrder → Done`,
/// with `Failed(reason)` reachable from every step.
pub struct Propagator<A> {
    account: A,
    bridge: HandoffSender,
    state: PropagatorState,
    report: PropagationReport,
}

impl<A: AccountReader + ValueStore> Propagator<A> {
    pub fn new(account: A, bridge: HandoffSender) -> Self {
        Self {
            account,
            bridge,
            state: PropagatorState::Idle,
            report: PropagationReport::default(),
        }
    }

    pub fn state(&self) -> &PropagatorState {
        &self.state
    }

    pub fn report(&self) -> &PropagationReport {
        &self.report
    }

    /// Run one propagation pass. Returns the terminal state; the report
    /// holds whatever completed.
    pub async fn run(&mut self, input: &PropagationInput) -> PropagatorState {
        self.report = PropagationReport::default();

        // One combined read from the restricted context: who we are, the
        // current customer value, and the order's identifying fields.
        self.transition(PropagatorState::Fetching);
        let snapshot = match self
            .account
            .profile_snapshot(&input.namespace, &input.customer_key, &input.order_id)
            .await
        {
            Ok(snapshot) => snapshot,
            Err(err) => return self.fail_from(err),
        };
        let customer_id = snapshot.customer_id.clone();
        let order_id = snapshot
            .order
            .as_ref()
            .map(|o| o.id.clone())
            .unwrap_or_else(|| input.order_id.clone());
        self.report.snapshot = Some(snapshot);

        // Definitions are admin-API-only, so even the customer definition is
        // reconciled on the privileged side of the channel.
        self.transition(PropagatorState::ReconcilingCustomer);
        let spec = DefinitionSpec::single_line_text(&input.customer_key, OwnerType::Customer)
            .with_namespace(&input.namespace);
        let reconcile = match self.bridge.reconcile(spec).await {
            Ok(outcome) => outcome,
            Err(err) => return self.fail_from(err),
        };
        self.report.customer_definition = reconcile.definition;
        if !reconcile.user_errors.is_empty() {
            return self.fail(FailureReason::Validation(reconcile.user_errors));
        }

        // The customer value is in scope here; write it directly.
        self.transition(PropagatorState::WritingCustomer);
        let write = match self
            .account
            .value_write(
                &input.customer_key,
                &input.namespace,
                &customer_id,
                &input.customer_value,
            )
            .await
        {
            Ok(outcome) => outcome,
            Err(err) => return self.fail_from(err),
        };
        self.report.customer_write = write.payload;
        if !write.user_errors.is_empty() {
            return self.fail(FailureReason::Validation(write.user_errors));
        }

        // The order value is not: delegate it across the capability
        // boundary and wait for the privileged side's acknowledgment.
        self.transition(PropagatorState::HandoffOrder);
        let request = OrderWriteRequest {
            order_id,
            key: input.order_key.clone(),
            namespace: input.namespace.clone(),
            value: input.order_value.clone(),
        };
        let ack = match self.bridge.write_order_value(request).await {
            Ok(ack) => ack,
            Err(err) => return self.fail_from(err),
        };
        let errors = ack.user_errors.clone();
        self.report.handoff = Some(ack);
        if !errors.is_empty() {
            return self.fail(FailureReason::Validation(errors));
        }

        self.transition(PropagatorState::Done);
        self.state.clone()
    }

    fn transition(&mut self, next: PropagatorState) {
        tracing::debug!(from = ?self.state, to = ?next, "propagator transition");
        self.state = next;
    }

    fn fail(&mut self, reason: FailureReason) -> PropagatorState {
        tracing::warn!(at = ?self.state, reason = ?reason, "propagation failed");
        self.state = PropagatorState::Failed(reason);
        self.state.clone()
    }

    fn fail_from(&mut self, err: SdkError) -> PropagatorState {
        match err {
            SdkError::Capability(message) => self.fail(FailureReason::Capability(message)),
            other => self.fail(FailureReason::Network(other.to_string())),
        }
    }
}
