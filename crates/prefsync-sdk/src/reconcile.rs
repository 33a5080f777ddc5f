//! Definition reconciliation: ensure a field definition exists and matches
//!
//! Get-or-create-or-update against the remote definition store. The
//! algorithm re-checks remote truth on every invocation (read-then-act, no
//! local cache), which makes repeated runs converge to the same remote
//! state without ever producing a duplicate definition.

use crate::error::Result;
use crate::traits::DefinitionStore;
use prefsync_client::{DefinitionSpec, FieldDefinition, UserError};

/// Which branch a reconciliation took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileAction {
    Created,
    Updated,
}

/// Result of one reconciliation: the definition from whichever branch ran,
/// plus any structured rejections the platform returned.
#[derive(Debug, Clone)]
pub struct ReconcileOutcome {
    pub definition: Option<FieldDefinition>,
    pub action: ReconcileAction,
    pub user_errors: Vec<UserError>,
}

impl ReconcileOutcome {
    pub fn is_clean(&self) -> bool {
        self.user_errors.is_empty()
    }
}

/// Idempotent get-or-create-or-update for field definitions.
///
/// Get-then-act is not atomic against other reconcilers: two concurrent
/// runs on a fresh triple can both observe "absent" and both attempt the
/// create. The platform serializes them; the loser's create comes back with
/// a duplicate userError, which is treated as a benign signal to re-fetch
/// and fall back to update. Exactly one definition exists afterwards.
pub struct Reconciler<D> {
    store: D,
}

impl<D: DefinitionStore> Reconciler<D> {
    pub fn new(store: D) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &D {
        &self.store
    }

    /// Ensure the definition for `spec`'s (key, namespace, ownerType) triple
    /// exists and matches the desired shape.
    ///
    /// Present definitions are updated unconditionally, with no diffing
    /// against the current shape; the platform is authoritative and rejects
    /// invalid transitions via userErrors.
    pub async fn ensure(&self, spec: &DefinitionSpec) -> Result<ReconcileOutcome> {
        let existing = self
            .store
            .definition_get(&spec.key, &spec.namespace, spec.owner_type)
            .await?;

        if let Some(current) = existing {
            tracing::debug!(
                key = %spec.key,
                owner_type = %spec.owner_type,
                id = current.id.as_deref().unwrap_or(""),
                "definition present, updating in place"
            );
            let outcome = self.store.definition_update(spec).await?;
            return Ok(ReconcileOutcome {
                definition: outcome.payload,
                action: ReconcileAction::Updated,
                user_errors: outcome.user_errors,
            });
        }

        let outcome = self.store.definition_create(spec).await?;

        if outcome.user_errors.iter().any(UserError::is_duplicate) {
            // Lost a create race: another reconciler registered the triple
            // between our get and create. Re-fetch remote truth, then update.
            let winner = self
                .store
                .definition_get(&spec.key, &spec.namespace, spec.owner_type)
                .await?;
            tracing::debug!(
                key = %spec.key,
                owner_type = %spec.owner_type,
                winner = winner.as_ref().and_then(|d| d.id.as_deref()).unwrap_or(""),
                "create rejected as duplicate, falling back to update"
            );
            let outcome = self.store.definition_update(spec).await?;
            return Ok(ReconcileOutcome {
                definition: outcome.payload,
                action: ReconcileAction::Updated,
                user_errors: outcome.user_errors,
            });
        }

        Ok(ReconcileOutcome {
            definition: outcome.payload,
            action: ReconcileAction::Created,
            user_errors: outcome.user_errors,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockPlatform;
    use prefsync_client::OwnerType;

    #[tokio::test]
    async fn fresh_triple_takes_the_create_path() {
        let platform = MockPlatform::new();
        let reconciler = Reconciler::new(platform.clone());
        let spec = DefinitionSpec::single_line_text("nickname", OwnerType::Customer);

        let outcome = reconciler.ensure(&spec).await.unwrap();
        assert_eq!(outcome.action, ReconcileAction::Created);
        assert!(outcome.is_clean());
        let id = outcome.definition.unwrap().id.unwrap();
        assert!(!id.is_empty());
        assert_eq!(platform.definition_count().await, 1);
    }

    #[tokio::test]
    async fn second_run_updates_and_keeps_the_id() {
        let platform = MockPlatform::new();
        let reconciler = Reconciler::new(platform.clone());
        let spec = DefinitionSpec::single_line_text("nickname", OwnerType::Customer);

        let first = reconciler.ensure(&spec).await.unwrap();
        let second = reconciler.ensure(&spec).await.unwrap();

        assert_eq!(second.action, ReconcileAction::Updated);
        assert!(second.is_clean());
        assert_eq!(
            first.definition.unwrap().id,
            second.definition.unwrap().id
        );
        assert_eq!(platform.definition_count().await, 1);
    }

    #[tokio::test]
    async fn duplicate_create_falls_back_to_update() {
        let platform = MockPlatform::new();
        let reconciler = Reconciler::new(platform.clone());
        let spec = DefinitionSpec::single_line_text("nickname", OwnerType::Customer);

        // Seed the definition, then make the next get claim it's absent:
        // the reconciler will go down the create path and hit TAKEN.
        reconciler.ensure(&spec).await.unwrap();
        platform.inject_get_absent(1).await;

        let outcome = reconciler.ensure(&spec).await.unwrap();
        assert_eq!(outcome.action, ReconcileAction::Updated);
        assert!(outcome.is_clean());
        assert!(outcome.definition.is_some());
        assert_eq!(platform.definition_count().await, 1);
    }

    #[tokio::test]
    async fn same_key_different_owner_types_are_distinct_triples() {
        let platform = MockPlatform::new();
        let reconciler = Reconciler::new(platform.clone());

        let customer = DefinitionSpec::single_line_text("note", OwnerType::Customer);
        let order = DefinitionSpec::single_line_text("note", OwnerType::Order);

        assert_eq!(
            reconciler.ensure(&customer).await.unwrap().action,
            ReconcileAction::Created
        );
        assert_eq!(
            reconciler.ensure(&order).await.unwrap().action,
            ReconcileAction::Created
        );
        assert_eq!(platform.definition_count().await, 2);
    }
}
