//! Prefsync SDK - storefront preference metafield synchronization
//!
//! Keeps a small set of key-value preference records (metafields) in sync
//! between a storefront platform's admin API and its customer account API.
//!
//! # Architecture
//!
//! Two execution contexts with asymmetric capabilities:
//! - **Privileged (admin)**: manages field definitions, reads/writes values
//!   for any owner type. Home of the [`Reconciler`] and the
//!   [`handoff`] worker.
//! - **Restricted (customer account)**: reads/writes only the authenticated
//!   customer's own values; order-scoped writes are refused at the client
//!   boundary. Home of the [`Propagator`], which routes what it cannot do
//!   itself through the handoff channel.
//!
//! The capability boundary is the point: the handoff exists because the
//! restricted side *cannot* write order values, not because the privileged
//! side happens to live elsewhere.
//!
//! # Example
//!
//! ```rust,ignore
//! use prefsync_sdk::{
//!     handoff, AdminClient, AdminConfig, OwnerId, PropagationInput, Propagator,
//! };
//!
//! // Privileged side: one worker serving the handoff channel.
//! let admin = AdminClient::new(AdminConfig::default());
//! let values = AdminClient::new(AdminConfig::default());
//! let (bridge, worker) = handoff::channel(admin, values, 16);
//! tokio::spawn(worker.run());
//!
//! // Restricted side: one propagation pass per trigger.
//! let account = AccountClient::new(AccountConfig::default());
//! let mut propagator = Propagator::new(account, bridge);
//! let state = propagator
//!     .run(&PropagationInput::new(
//!         OwnerId::order("6128892608816"),
//!         "Captain",
//!         "2 days",
//!     ))
//!     .await;
//! ```

// Error types
pub mod error;

// Capability seams between orchestration and backends
pub mod traits;

// Idempotent definition reconciliation
pub mod reconcile;

// Cross-context delegation channel and privileged worker
pub mod handoff;

// Restricted-side propagation state machine
pub mod propagate;

// In-memory platform for tests
pub mod mock;

// Re-export error types
pub use error::{Result, SdkError};

// Re-export core seams
pub use traits::{AccountReader, DefinitionStore, ValueStore};

// Re-export orchestration types
pub use handoff::{
    HandoffAck, HandoffSender, HandoffWorker, OrderWriteRequest, TriggerInput, TriggerResponse,
};
pub use propagate::{
    FailureReason, PropagationInput, PropagationReport, Propagator, PropagatorState,
    CUSTOMER_PREF_KEY, ORDER_PREF_KEY,
};
pub use reconcile::{ReconcileAction, ReconcileOutcome, Reconciler};

// Re-export from the client crate
pub use prefsync_client::{
    AccessLevel, AccessPolicy, AccountClient, AccountConfig, AdminClient, AdminConfig,
    ClientError, DefinitionSpec, ExecutionContext, FieldDefinition, FieldType, MutationOutcome,
    OrderSummary, OwnerId, OwnerType, ProfileSnapshot, UserError, WrittenValue,
    DUPLICATE_KEY_CODE, PREFERENCES_NAMESPACE, SINGLE_LINE_TEXT_TYPE,
};
