//! Capability seams between orchestration and the platform backends
//!
//! The two execution contexts are modeled as distinct trait impls rather
//! than one client with runtime checks: the privileged [`AdminClient`]
//! implements both stores, the restricted [`AccountClient`] only the value
//! side, and its write path refuses order owners before any request is
//! issued. The in-memory [`mock`](crate::mock) platform implements the same
//! traits for tests.

use crate::error::Result;
use async_trait::async_trait;
use prefsync_client::{
    AccountClient, AdminClient, DefinitionSpec, ExecutionContext, FieldDefinition,
    MutationOutcome, OwnerId, OwnerType, ProfileSnapshot, WrittenValue,
};

/// Schema-definition operations. Admin-API-only; each call is authoritative
/// against remote state.
#[async_trait]
pub trait DefinitionStore: Send + Sync {
    /// At most one result per (key, namespace, ownerType); absent is `None`.
    async fn definition_get(
        &self,
        key: &str,
        namespace: &str,
        owner_type: OwnerType,
    ) -> Result<Option<FieldDefinition>>;

    async fn definition_create(
        &self,
        spec: &DefinitionSpec,
    ) -> Result<MutationOutcome<FieldDefinition>>;

    async fn definition_update(
        &self,
        spec: &DefinitionSpec,
    ) -> Result<MutationOutcome<FieldDefinition>>;
}

/// Value read/write operations, available in both contexts with different
/// capability envelopes.
#[async_trait]
pub trait ValueStore: Send + Sync {
    /// Which side of the capability boundary this store operates on
    fn context(&self) -> ExecutionContext;

    /// Upsert one value; empty string is a valid value. Out-of-scope owners
    /// fail with a capability error, never partially succeed.
    async fn value_write(
        &self,
        key: &str,
        namespace: &str,
        owner: &OwnerId,
        value: &str,
    ) -> Result<MutationOutcome<WrittenValue>>;

    /// Read one value back; absent is `None`.
    async fn value_read(
        &self,
        key: &str,
        namespace: &str,
        owner: &OwnerId,
    ) -> Result<Option<String>>;
}

/// The restricted context's combined entry read: who am I, what does my
/// preference currently hold, which orders can I see.
#[async_trait]
pub trait AccountReader: Send + Sync {
    async fn profile_snapshot(
        &self,
        namespace: &str,
        key: &str,
        order: &OwnerId,
    ) -> Result<ProfileSnapshot>;
}

#[async_trait]
impl DefinitionStore for AdminClient {
    async fn definition_get(
        &self,
        key: &str,
        namespace: &str,
        owner_type: OwnerType,
    ) -> Result<Option<FieldDefinition>> {
        Ok(AdminClient::definition_get(self, key, namespace, owner_type).await?)
    }

    async fn definition_create(
        &self,
        spec: &DefinitionSpec,
    ) -> Result<MutationOutcome<FieldDefinition>> {
        Ok(AdminClient::definition_create(self, spec).await?)
    }

    async fn definition_update(
        &self,
        spec: &DefinitionSpec,
    ) -> Result<MutationOutcome<FieldDefinition>> {
        Ok(AdminClient::definition_update(self, spec).await?)
    }
}

#[async_trait]
impl ValueStore for AdminClient {
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
        Ok(AdminClient::value_write(self, key, namespace, owner, value).await?)
    }

    async fn value_read(
        &self,
        key: &str,
        namespace: &str,
        owner: &OwnerId,
    ) -> Result<Option<String>> {
        Ok(AdminClient::value_read(self, key, namespace, owner).await?)
    }
}

#[async_trait]
impl ValueStore for AccountClient {
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
        Ok(AccountClient::value_write(self, key, namespace, owner, value).await?)
    }

    async fn value_read(
        &self,
        key: &str,
        namespace: &str,
        owner: &OwnerId,
    ) -> Result<Option<String>> {
        Ok(AccountClient::value_read(self, key, namespace, owner).await?)
    }
}

#[async_trait]
impl AccountReader for AccountClient {
    async fn profile_snapshot(
        &self,
        namespace: &str,
        key: &str,
        order: &OwnerId,
    ) -> Result<ProfileSnapshot> {
        Ok(AccountClient::profile_snapshot(self, namespace, key, order).await?)
    }
}
