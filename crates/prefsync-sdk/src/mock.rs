//! In-memory platform for tests
//!
//! A controllable stand-in for the remote definition/value store, so
//! reconciliation and propagation can be exercised without a real platform.
//!
//! # Features
//!
//! - **Definition registry**: one definition per (namespace, key, ownerType)
//!   triple; a second create of the same triple is rejected with `TAKEN`
//! - **Value store**: upserts validated against the registered definition
//! - **Failure injection**: hide definitions from `get` (to force the
//!   duplicate-create race), delay creates (to interleave concurrent
//!   reconcilers), reject the next write, fail the profile read
//! - **Call counting**: create/update/write counters for assertions
//!
//! [`MockPlatform`] plays the privileged side; [`MockAccount`] (from
//! [`MockPlatform::account`]) is the restricted facade bound to one
//! authenticated customer.

use crate::error::{Result, SdkError};
use crate::traits::{AccountReader, DefinitionStore, ValueStore};
use async_trait::async_trait;
use prefsync_client::{
    DefinitionSpec, ExecutionContext, FieldDefinition, FieldType, MutationOutcome, OrderSummary,
    OwnerId, OwnerType, ProfileSnapshot, UserError, WrittenValue, DUPLICATE_KEY_CODE,
    SINGLE_LINE_TEXT_TYPE,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// (namespace, key, ownerType), the definition identity triple
type TripleKey = (String, String, OwnerType);

/// (namespace, key, owner gid)
type ValueKey = (String, String, String);

#[derive(Default)]
struct PlatformState {
    definitions: HashMap<TripleKey, FieldDefinition>,
    values: HashMap<ValueKey, String>,
    orders: Vec<OrderSummary>,
    next_definition_id: u64,
    create_calls: usize,
    update_calls: usize,
    write_calls: usize,
    get_absent_injections: usize,
    create_delay_ms: u64,
    write_rejection: Option<UserError>,
    fail_snapshot: bool,
}

/// In-memory platform, privileged side.
#[derive(Clone, Default)]
pub struct MockPlatform {
    state: Arc<Mutex<PlatformState>>,
}

impl MockPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricted facade bound to one authenticated customer.
    pub fn account(&self, customer: OwnerId) -> MockAccount {
        MockAccount {
            platform: self.clone(),
            customer,
            first_name: None,
        }
    }

    /// Register an order the restricted context can see.
    pub async fn insert_order(&self, id: OwnerId, name: impl Into<String>) {
        self.state.lock().await.orders.push(OrderSummary {
            id,
            name: name.into(),
        });
    }

    pub async fn definition_count(&self) -> usize {
        self.state.lock().await.definitions.len()
    }

    pub async fn create_calls(&self) -> usize {
        self.state.lock().await.create_calls
    }

    pub async fn update_calls(&self) -> usize {
        self.state.lock().await.update_calls
    }

    pub async fn write_calls(&self) -> usize {
        self.state.lock().await.write_calls
    }

    /// The raw stored value, bypassing any capability envelope.
    pub async fn stored_value(
        &self,
        namespace: &str,
        key: &str,
        owner: &OwnerId,
    ) -> Option<String> {
        self.state
            .lock()
            .await
            .values
            .get(&(
                namespace.to_string(),
                key.to_string(),
                owner.as_gid().to_string(),
            ))
            .cloned()
    }

    /// Make the next `count` definition gets report absent regardless of
    /// state. Forces the get/create race's losing branch deterministically.
    pub async fn inject_get_absent(&self, count: usize) {
        self.state.lock().await.get_absent_injections = count;
    }

    /// Delay every create, so two concurrent reconcilers both pass their
    /// get before either create lands.
    pub async fn set_create_delay(&self, ms: u64) {
        self.state.lock().await.create_delay_ms = ms;
    }

    /// Reject the next value write with the given error.
    pub async fn inject_write_rejection(&self, error: UserError) {
        self.state.lock().await.write_rejection = Some(error);
    }

    /// Fail the next profile snapshot reads at the transport level.
    pub async fn set_snapshot_failure(&self, fail: bool) {
        self.state.lock().await.fail_snapshot = fail;
    }

    async fn write_value(
        &self,
        key: &str,
        namespace: &str,
        owner: &OwnerId,
        value: &str,
    ) -> Result<MutationOutcome<WrittenValue>> {
        let mut state = self.state.lock().await;
        state.write_calls += 1;

        if let Some(error) = state.write_rejection.take() {
            return Ok(MutationOutcome::rejected(vec![error]));
        }

        let triple = (
            namespace.to_string(),
            key.to_string(),
            owner.owner_type(),
        );
        if !state.definitions.contains_key(&triple) {
            return Ok(MutationOutcome::rejected(vec![UserError {
                field: Some(vec!["metafields".into(), "0".into(), "key".into()]),
                message: format!(
                    "No definition for {namespace}:{key} on owner type {}",
                    owner.owner_type()
                ),
                code: Some("INVALID".into()),
                element_index: Some(0),
            }]));
        }

        state.values.insert(
            (
                namespace.to_string(),
                key.to_string(),
                owner.as_gid().to_string(),
            ),
            value.to_string(),
        );

        Ok(MutationOutcome::ok(WrittenValue {
            key: key.to_string(),
            namespace: namespace.to_string(),
            value: value.to_string(),
            created_at: None,
            updated_at: None,
        }))
    }
}

#[async_trait]
impl DefinitionStore for MockPlatform {
    async fn definition_get(
        &self,
        key: &str,
        namespace: &str,
        owner_type: OwnerType,
    ) -> Result<Option<FieldDefinition>> {
        let mut state = self.state.lock().await;
        if state.get_absent_injections > 0 {
            state.get_absent_injections -= 1;
            return Ok(None);
        }
        Ok(state
            .definitions
            .get(&(namespace.to_string(), key.to_string(), owner_type))
            .cloned())
    }

    async fn definition_create(
        &self,
        spec: &DefinitionSpec,
    ) -> Result<MutationOutcome<FieldDefinition>> {
        let delay = { self.state.lock().await.create_delay_ms };
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        let mut state = self.state.lock().await;
        state.create_calls += 1;

        let triple = (
            spec.namespace.clone(),
            spec.key.clone(),
            spec.owner_type,
        );
        if state.definitions.contains_key(&triple) {
            return Ok(MutationOutcome::rejected(vec![UserError {
                field: Some(vec!["definition".into(), "key".into()]),
                message: format!(
                    "Key is in use for owner type {} in this namespace",
                    spec.owner_type
                ),
                code: Some(DUPLICATE_KEY_CODE.into()),
                element_index: None,
            }]));
        }

        state.next_definition_id += 1;
        let definition = FieldDefinition {
            id: Some(format!(
                "gid://shopify/MetafieldDefinition/{}",
                state.next_definition_id
            )),
            key: spec.key.clone(),
            name: spec.name.clone(),
            namespace: spec.namespace.clone(),
            owner_type: spec.owner_type,
            value_type: FieldType {
                category: "TEXT".into(),
                name: SINGLE_LINE_TEXT_TYPE.into(),
            },
            access: spec.access,
            pinned: spec.pinned,
        };
        state.definitions.insert(triple, definition.clone());
        Ok(MutationOutcome::ok(definition))
    }

    async fn definition_update(
        &self,
        spec: &DefinitionSpec,
    ) -> Result<MutationOutcome<FieldDefinition>> {
        let mut state = self.state.lock().await;
        state.update_calls += 1;

        let triple = (
            spec.namespace.clone(),
            spec.key.clone(),
            spec.owner_type,
        );
        match state.definitions.get_mut(&triple) {
            Some(definition) => {
                definition.name = spec.name.clone();
                definition.access = spec.access;
                definition.pinned = spec.pinned;
                Ok(MutationOutcome::ok(definition.clone()))
            }
            None => Ok(MutationOutcome::rejected(vec![UserError {
                field: Some(vec!["definition".into()]),
                message: format!("Definition not found for key {}", spec.key),
                code: Some("NOT_FOUND".into()),
                element_index: None,
            }])),
        }
    }
}

#[async_trait]
impl ValueStore for MockPlatform {
    fn context(&self) -> ExecutionContext {
        ExecutionContext::Privileged
    }

    async fn value_write(
        &self,
        key: &str,
        namespace: &str,
        owner: &OwnerId,
        value: &str,
    ) -> Result<MutationOutcome<WrittenValue>> {
        self.write_value(key, namespace, owner, value).await
    }

    async fn value_read(
        &self,
        key: &str,
        namespace: &str,
        owner: &OwnerId,
    ) -> Result<Option<String>> {
        Ok(self.stored_value(namespace, key, owner).await)
    }
}

/// Restricted facade bound to one authenticated customer.
#[derive(Clone)]
pub struct MockAccount {
    platform: MockPlatform,
    customer: OwnerId,
    first_name: Option<String>,
}

impl MockAccount {
    pub fn with_first_name(mut self, first_name: impl Into<String>) -> Self {
        self.first_name = Some(first_name.into());
        self
    }

    fn check_customer_scope(&self, owner: &OwnerId, verb: &str) -> Result<()> {
        if owner.owner_type() != OwnerType::Customer {
            return Err(SdkError::Capability(format!(
                "Restricted context: {} values are not {verb} from the customer account API",
                owner.owner_type()
            )));
        }
        if owner != &self.customer {
            return Err(SdkError::Capability(format!(
                "Restricted context: {owner} is not the authenticated customer"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl ValueStore for MockAccount {
    fn context(&self) -> ExecutionContext {
        ExecutionContext::Restricted
    }

    async fn value_write(
        &self,
        key: &str,
        namespace: &str,
        owner: &OwnerId,
        value: &str,
    ) -> Result<MutationOutcome<WrittenValue>> {
        self.check_customer_scope(owner, "writable")?;
        self.platform.write_value(key, namespace, owner, value).await
    }

    async fn value_read(
        &self,
        key: &str,
        namespace: &str,
        owner: &OwnerId,
    ) -> Result<Option<String>> {
        self.check_customer_scope(owner, "readable")?;
        Ok(self.platform.stored_value(namespace, key, owner).await)
    }
}

#[async_trait]
impl AccountReader for MockAccount {
    async fn profile_snapshot(
        &self,
        namespace: &str,
        key: &str,
        order: &OwnerId,
    ) -> Result<ProfileSnapshot> {
        let state = self.platform.state.lock().await;
        if state.fail_snapshot {
            return Err(SdkError::Transport(
                "connection reset during profile read".into(),
            ));
        }

        let field_value = state
            .values
            .get(&(
                namespace.to_string(),
                key.to_string(),
                self.customer.as_gid().to_string(),
            ))
            .cloned();

        Ok(ProfileSnapshot {
            customer_id: self.customer.clone(),
            first_name: self.first_name.clone(),
            field_value,
            recent_orders: state.orders.clone(),
            order: state.orders.iter().find(|o| &o.id == order).cloned(),
        })
    }
}
