//! Privileged client for the admin GraphQL endpoint
//!
//! The admin endpoint is the only place field definitions can be managed,
//! and the only context allowed to write order-scoped values. Each call is
//! authoritative against remote state; nothing is cached locally.

use crate::error::Result;
use crate::graphql::GraphqlTransport;
use crate::types::*;
use serde::Deserialize;
use serde_json::json;

const DEFINITION_GET_QUERY: &str = r#"
query getFieldDefinition($key: String!, $namespace: String!, $ownerType: MetafieldOwnerType!) {
  metafieldDefinitions(first: 1, key: $key, namespace: $namespace, ownerType: $ownerType) {
    nodes {
      id
      key
      name
      namespace
      ownerType
      type {
        category
        name
      }
      access {
        admin
        customerAccount
        storefront
      }
    }
  }
}"#;

const DEFINITION_CREATE_MUTATION: &str = r#"
mutation fieldDefinitionCreate($definition: MetafieldDefinitionInput!) {
  metafieldDefinitionCreate(definition: $definition) {
    createdDefinition {
      id
      key
      name
      namespace
      ownerType
      type {
        category
        name
      }
      access {
        admin
        customerAccount
        storefront
      }
    }
    userErrors {
      field
      message
      code
    }
  }
}"#;

const DEFINITION_UPDATE_MUTATION: &str = r#"
mutation fieldDefinitionUpdate($definition: MetafieldDefinitionUpdateInput!) {
  metafieldDefinitionUpdate(definition: $definition) {
    updatedDefinition {
      id
      key
      name
      namespace
      ownerType
      type {
        category
        name
      }
      access {
        admin
        customerAccount
        storefront
      }
    }
    userErrors {
      field
      message
      code
    }
  }
}"#;

const VALUE_SET_MUTATION: &str = r#"
mutation fieldValuesSet($metafields: [MetafieldsSetInput!]!) {
  metafieldsSet(metafields: $metafields) {
    metafields {
      key
      namespace
      value
      createdAt
      updatedAt
    }
    userErrors {
      field
      message
      code
    }
  }
}"#;

const ORDER_VALUE_QUERY: &str = r#"
query getOrderFieldValue($id: ID!, $namespace: String!, $key: String!) {
  order(id: $id) {
    metafield(namespace: $namespace, key: $key) {
      value
    }
  }
}"#;

const CUSTOMER_VALUE_QUERY: &str = r#"
query getCustomerFieldValue($id: ID!, $namespace: String!, $key: String!) {
  customer(id: $id) {
    metafield(namespace: $namespace, key: $key) {
      value
    }
  }
}"#;

#[derive(Debug, Deserialize)]
struct DefinitionGetData {
    #[serde(rename = "metafieldDefinitions")]
    metafield_definitions: DefinitionNodes,
}

#[derive(Debug, Deserialize)]
struct DefinitionNodes {
    nodes: Vec<FieldDefinition>,
}

#[derive(Debug, Deserialize)]
struct DefinitionCreateData {
    #[serde(rename = "metafieldDefinitionCreate")]
    payload: CreatePayload,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatePayload {
    created_definition: Option<FieldDefinition>,
    #[serde(default)]
    user_errors: Vec<UserError>,
}

#[derive(Debug, Deserialize)]
struct DefinitionUpdateData {
    #[serde(rename = "metafieldDefinitionUpdate")]
    payload: UpdatePayload,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdatePayload {
    updated_definition: Option<FieldDefinition>,
    #[serde(default)]
    user_errors: Vec<UserError>,
}

#[derive(Debug, Deserialize)]
struct ValueSetData {
    #[serde(rename = "metafieldsSet")]
    payload: SetPayload,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SetPayload {
    metafields: Option<Vec<WrittenValue>>,
    #[serde(default)]
    user_errors: Vec<UserError>,
}

#[derive(Debug, Deserialize)]
struct OrderValueData {
    order: Option<OwnerMetafield>,
}

#[derive(Debug, Deserialize)]
struct CustomerValueData {
    customer: Option<OwnerMetafield>,
}

#[derive(Debug, Deserialize)]
struct OwnerMetafield {
    metafield: Option<ValueNode>,
}

#[derive(Debug, Deserialize)]
struct ValueNode {
    value: String,
}

/// Privileged client for the admin endpoint
pub struct AdminClient {
    config: AdminConfig,
    transport: GraphqlTransport,
}

impl AdminClient {
    pub fn new(config: AdminConfig) -> Self {
        let transport = GraphqlTransport::new(
            config.endpoint.clone(),
            config.access_token.as_deref(),
            config.timeout_secs,
        );
        Self { config, transport }
    }

    pub fn config(&self) -> &AdminConfig {
        &self.config
    }

    /// Look up the definition for a (key, namespace, ownerType) triple.
    /// At most one can exist; absent is `None`, not an error.
    pub async fn definition_get(
        &self,
        key: &str,
        namespace: &str,
        owner_type: OwnerType,
    ) -> Result<Option<FieldDefinition>> {
        let data: DefinitionGetData = self
            .transport
            .execute(
                DEFINITION_GET_QUERY,
                json!({
                    "key": key,
                    "namespace": namespace,
                    "ownerType": owner_type,
                }),
            )
            .await?;

        Ok(data.metafield_definitions.nodes.into_iter().next())
    }

    /// Register a definition. Expected rejections (duplicate key, invalid
    /// policy) come back as userErrors, not as `Err`.
    pub async fn definition_create(
        &self,
        spec: &DefinitionSpec,
    ) -> Result<MutationOutcome<FieldDefinition>> {
        let data: DefinitionCreateData = self
            .transport
            .execute(
                DEFINITION_CREATE_MUTATION,
                json!({ "definition": spec.create_input() }),
            )
            .await?;

        if !data.payload.user_errors.is_empty() {
            tracing::debug!(
                key = %spec.key,
                owner_type = %spec.owner_type,
                errors = data.payload.user_errors.len(),
                "definition create rejected"
            );
        }

        Ok(MutationOutcome {
            payload: data.payload.created_definition,
            user_errors: data.payload.user_errors,
        })
    }

    /// Update an existing definition in place. Same soft-failure contract
    /// as [`definition_create`](Self::definition_create).
    pub async fn definition_update(
        &self,
        spec: &DefinitionSpec,
    ) -> Result<MutationOutcome<FieldDefinition>> {
        let data: DefinitionUpdateData = self
            .transport
            .execute(
                DEFINITION_UPDATE_MUTATION,
                json!({ "definition": spec.update_input() }),
            )
            .await?;

        Ok(MutationOutcome {
            payload: data.payload.updated_definition,
            user_errors: data.payload.user_errors,
        })
    }

    /// Upsert one value for any owner type. Empty string is a valid value
    /// (an explicit clear). The matching definition must already exist.
    pub async fn value_write(
        &self,
        key: &str,
        namespace: &str,
        owner: &OwnerId,
        value: &str,
    ) -> Result<MutationOutcome<WrittenValue>> {
        let data: ValueSetData = self
            .transport
            .execute(
                VALUE_SET_MUTATION,
                json!({
                    "metafields": [{
                        "key": key,
                        "namespace": namespace,
                        "ownerId": owner.as_gid(),
                        "type": SINGLE_LINE_TEXT_TYPE,
                        "value": value,
                    }],
                }),
            )
            .await?;

        Ok(MutationOutcome {
            payload: data
                .payload
                .metafields
                .and_then(|values| values.into_iter().next()),
            user_errors: data.payload.user_errors,
        })
    }

    /// Read one value back; absent is `None`.
    pub async fn value_read(
        &self,
        key: &str,
        namespace: &str,
        owner: &OwnerId,
    ) -> Result<Option<String>> {
        let variables = json!({
            "id": owner.as_gid(),
            "namespace": namespace,
            "key": key,
        });

        let node = match owner.owner_type() {
            OwnerType::Order => {
                let data: OrderValueData =
                    self.transport.execute(ORDER_VALUE_QUERY, variables).await?;
                data.order.and_then(|o| o.metafield)
            }
            OwnerType::Customer => {
                let data: CustomerValueData = self
                    .transport
                    .execute(CUSTOMER_VALUE_QUERY, variables)
                    .await?;
                data.customer.and_then(|c| c.metafield)
            }
        };

        Ok(node.map(|n| n.value))
    }
}
