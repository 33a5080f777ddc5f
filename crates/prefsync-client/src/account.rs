//! Restricted client for the customer account GraphQL endpoint
//!
//! The customer account API is scoped to one authenticated customer. It can
//! read and write that customer's own preference values and read identifying
//! fields of orders, but it holds no order-metafield scope: order-scoped
//! writes are refused here by construction, before any request is issued.
//! Routing those writes through the privileged side is the caller's job.

use crate::error::{ClientError, Result};
use crate::graphql::GraphqlTransport;
use crate::types::*;
use serde::Deserialize;
use serde_json::json;

const PROFILE_SNAPSHOT_QUERY: &str = r#"
query profileSnapshot($namespace: String!, $key: String!, $orderId: ID!) {
  customer {
    id
    firstName
    metafield(namespace: $namespace, key: $key) {
      value
    }
    orders(first: 10) {
      edges {
        node {
          id
          name
        }
      }
    }
  }
  order(id: $orderId) {
    id
    name
  }
}"#;

const VALUE_SET_MUTATION: &str = r#"
mutation setPreference($metafields: [MetafieldsSetInput!]!) {
  metafieldsSet(metafields: $metafields) {
    metafields {
      key
      namespace
      value
    }
    userErrors {
      field
      message
      code
      elementIndex
    }
  }
}"#;

const OWN_VALUE_QUERY: &str = r#"
query getOwnFieldValue($namespace: String!, $key: String!) {
  customer {
    metafield(namespace: $namespace, key: $key) {
      value
    }
  }
}"#;

#[derive(Debug, Deserialize)]
struct SnapshotData {
    customer: CustomerNode,
    order: Option<OrderSummary>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CustomerNode {
    id: OwnerId,
    first_name: Option<String>,
    metafield: Option<ValueNode>,
    orders: OrderConnection,
}

#[derive(Debug, Deserialize)]
struct OrderConnection {
    edges: Vec<OrderEdge>,
}

#[derive(Debug, Deserialize)]
struct OrderEdge {
    node: OrderSummary,
}

#[derive(Debug, Deserialize)]
struct ValueNode {
    value: String,
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
struct OwnValueData {
    customer: OwnValueCustomer,
}

#[derive(Debug, Deserialize)]
struct OwnValueCustomer {
    metafield: Option<ValueNode>,
}

/// Restricted client for the customer account endpoint
pub struct AccountClient {
    config: AccountConfig,
    transport: GraphqlTransport,
}

impl AccountClient {
    pub fn new(config: AccountConfig) -> Self {
        let transport = GraphqlTransport::new(
            config.endpoint.clone(),
            config.access_token.as_deref(),
            config.timeout_secs,
        );
        Self { config, transport }
    }

    pub fn config(&self) -> &AccountConfig {
        &self.config
    }

    /// One combined read: the authenticated customer's identity, their
    /// current value under the given preference key, their recent orders,
    /// and the identifying fields of one specific order.
    pub async fn profile_snapshot(
        &self,
        namespace: &str,
        key: &str,
        order: &OwnerId,
    ) -> Result<ProfileSnapshot> {
        let data: SnapshotData = self
            .transport
            .execute(
                PROFILE_SNAPSHOT_QUERY,
                json!({
                    "namespace": namespace,
                    "key": key,
                    "orderId": order.as_gid(),
                }),
            )
            .await?;

        Ok(ProfileSnapshot {
            customer_id: data.customer.id,
            first_name: data.customer.first_name,
            field_value: data.customer.metafield.map(|n| n.value),
            recent_orders: data
                .customer
                .orders
                .edges
                .into_iter()
                .map(|e| e.node)
                .collect(),
            order: data.order,
        })
    }

    /// Upsert one value for the authenticated customer. Order-scoped owners
    /// are refused before any request goes out: this context holds no
    /// order-metafield capability, and the platform would reject the write
    /// anyway. Empty string is a valid value.
    pub async fn value_write(
        &self,
        key: &str,
        namespace: &str,
        owner: &OwnerId,
        value: &str,
    ) -> Result<MutationOutcome<WrittenValue>> {
        if owner.owner_type() != OwnerType::Customer {
            return Err(ClientError::Capability {
                context: ExecutionContext::Restricted,
                message: format!(
                    "{} values are not writable from the customer account API",
                    owner.owner_type()
                ),
            });
        }

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

    /// Read the authenticated customer's own value; absent is `None`.
    /// Order-scoped reads are out of scope for this context too.
    pub async fn value_read(
        &self,
        key: &str,
        namespace: &str,
        owner: &OwnerId,
    ) -> Result<Option<String>> {
        if owner.owner_type() != OwnerType::Customer {
            return Err(ClientError::Capability {
                context: ExecutionContext::Restricted,
                message: format!(
                    "{} values are not readable from the customer account API",
                    owner.owner_type()
                ),
            });
        }

        let data: OwnValueData = self
            .transport
            .execute(
                OWN_VALUE_QUERY,
                json!({ "namespace": namespace, "key": key }),
            )
            .await?;

        Ok(data.customer.metafield.map(|n| n.value))
    }
}
