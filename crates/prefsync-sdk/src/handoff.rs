//! Cross-context handoff: restricted callers delegate privileged work here
//!
//! The restricted context cannot manage definitions or write order-scoped
//! values, so those operations travel as explicit messages to a worker
//! running in the privileged context. The channel is in-process today
//! (mpsc with oneshot replies) but the messages are RPC-shaped so a real
//! transport can replace it without touching the callers. Delivery is
//! treated as at-least-once: the worker's handling is idempotent
//! (reconciliation re-checks remote truth, value writes are upserts).

use crate::error::{Result, SdkError};
use crate::reconcile::{ReconcileOutcome, Reconciler};
use crate::traits::{DefinitionStore, ValueStore};
use prefsync_client::{
    DefinitionSpec, FieldDefinition, OwnerId, OwnerType, UserError, WrittenValue,
};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};

/// Order-value write delegated to the privileged side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderWriteRequest {
    pub order_id: OwnerId,
    pub key: String,
    pub namespace: String,
    pub value: String,
}

/// Acknowledgment for a delegated order write: the reconciled definition,
/// the written value, and any rejections from either step.
#[derive(Debug, Clone)]
pub struct HandoffAck {
    pub definition: Option<FieldDefinition>,
    pub written: Option<WrittenValue>,
    pub user_errors: Vec<UserError>,
}

impl HandoffAck {
    pub fn is_clean(&self) -> bool {
        self.user_errors.is_empty()
    }
}

/// One admin-side trigger: reconcile a definition and, for order triggers,
/// also upsert the order's value.
#[derive(Debug, Clone)]
pub struct TriggerInput {
    pub key: String,
    pub namespace: String,
    pub owner_type: OwnerType,
    /// Target order and desired value; applied only for ORDER triggers
    pub order_write: Option<(OwnerId, String)>,
}

/// Everything the triggering surface displays: the reconciled definition,
/// the write result if one ran, and every rejection, unswallowed.
#[derive(Debug, Clone)]
pub struct TriggerResponse {
    pub key: String,
    pub owner_type: OwnerType,
    pub definition: Option<FieldDefinition>,
    pub written_value: Option<WrittenValue>,
    pub user_errors: Vec<UserError>,
}

/// Run the admin trigger flow against privileged backends: ensure the
/// definition, then apply the order write when asked for and only if
/// reconciliation came back clean.
pub async fn run_trigger<D: DefinitionStore, V: ValueStore>(
    reconciler: &Reconciler<D>,
    values: &V,
    input: &TriggerInput,
) -> Result<TriggerResponse> {
    let spec = DefinitionSpec::single_line_text(&input.key, input.owner_type)
        .with_namespace(&input.namespace);
    let reconcile = reconciler.ensure(&spec).await?;

    let mut user_errors = reconcile.user_errors;
    let mut written_value = None;

    if input.owner_type == OwnerType::Order && user_errors.is_empty() {
        if let Some((order_id, value)) = &input.order_write {
            let write = values
                .value_write(&input.key, &input.namespace, order_id, value)
                .await?;
            written_value = write.payload;
            user_errors.extend(write.user_errors);
        }
    }

    Ok(TriggerResponse {
        key: input.key.clone(),
        owner_type: input.owner_type,
        definition: reconcile.definition,
        written_value,
        user_errors,
    })
}

enum HandoffRequest {
    Reconcile {
        spec: DefinitionSpec,
        reply: oneshot::Sender<Result<ReconcileOutcome>>,
    },
    WriteOrderValue {
        request: OrderWriteRequest,
        reply: oneshot::Sender<Result<HandoffAck>>,
    },
}

/// Restricted-side handle to the privileged worker.
#[derive(Clone)]
pub struct HandoffSender {
    tx: mpsc::Sender<HandoffRequest>,
}

impl HandoffSender {
    /// Ask the privileged side to reconcile a definition.
    pub async fn reconcile(&self, spec: DefinitionSpec) -> Result<ReconcileOutcome> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(HandoffRequest::Reconcile { spec, reply })
            .await
            .map_err(|_| SdkError::HandoffClosed("reconcile send"))?;
        rx.await.map_err(|_| SdkError::HandoffClosed("reconcile ack"))?
    }

    /// Delegate an order-value write to the privileged side and wait for
    /// its acknowledgment.
    pub async fn write_order_value(&self, request: OrderWriteRequest) -> Result<HandoffAck> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(HandoffRequest::WriteOrderValue { request, reply })
            .await
            .map_err(|_| SdkError::HandoffClosed("order write send"))?;
        rx.await
            .map_err(|_| SdkError::HandoffClosed("order write ack"))?
    }
}

/// Privileged-side worker: drains the channel, applying each message with
/// the reconciler and value store it was built with.
pub struct HandoffWorker<D, V> {
    reconciler: Reconciler<D>,
    values: V,
    rx: mpsc::Receiver<HandoffRequest>,
}

/// Open a handoff channel. The sender lives in the restricted context; the
/// worker must be driven (`run`) in the privileged one.
pub fn channel<D: DefinitionStore, V: ValueStore>(
    definitions: D,
    values: V,
    capacity: usize,
) -> (HandoffSender, HandoffWorker<D, V>) {
    let (tx, rx) = mpsc::channel(capacity);
    (
        HandoffSender { tx },
        HandoffWorker {
            reconciler: Reconciler::new(definitions),
            values,
            rx,
        },
    )
}

impl<D: DefinitionStore, V: ValueStore> HandoffWorker<D, V> {
    /// Serve requests until every sender is dropped.
    pub async fn run(mut self) {
        while let Some(request) = self.rx.recv().await {
            match request {
                HandoffRequest::Reconcile { spec, reply } => {
                    let outcome = self.reconciler.ensure(&spec).await;
                    if reply.send(outcome).is_err() {
                        tracing::warn!("reconcile requester went away before the ack");
                    }
                }
                HandoffRequest::WriteOrderValue { request, reply } => {
                    let ack = self.apply_order_write(&request).await;
                    if reply.send(ack).is_err() {
                        tracing::warn!(
                            order = %request.order_id,
                            "order write requester went away before the ack"
                        );
                    }
                }
            }
        }
        tracing::debug!("handoff channel drained, worker stopping");
    }

    async fn apply_order_write(&self, request: &OrderWriteRequest) -> Result<HandoffAck> {
        let input = TriggerInput {
            key: request.key.clone(),
            namespace: request.namespace.clone(),
            owner_type: OwnerType::Order,
            order_write: Some((request.order_id.clone(), request.value.clone())),
        };
        let response = run_trigger(&self.reconciler, &self.values, &input).await?;
        Ok(HandoffAck {
            definition: response.definition,
            written: response.written_value,
            user_errors: response.user_errors,
        })
    }
}
