//! Configuration and wire types shared by both endpoint clients

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// The app-reserved namespace all preference fields live under.
pub const PREFERENCES_NAMESPACE: &str = "$app:preferences";

/// The only value type this system registers definitions for.
pub const SINGLE_LINE_TEXT_TYPE: &str = "single_line_text_field";

/// UserError code the platform returns when a definition key is already taken.
pub const DUPLICATE_KEY_CODE: &str = "TAKEN";

/// Privileged (admin) endpoint configuration
#[derive(Debug, Clone)]
pub struct AdminConfig {
    /// Admin GraphQL endpoint URL
    pub endpoint: String,
    /// App access token, sent as a bearer header
    pub access_token: Option<String>,
    /// Request timeout in seconds (default: 30)
    pub timeout_secs: u64,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8080/admin/api/graphql.json".to_string(),
            access_token: None,
            timeout_secs: 30,
        }
    }
}

/// Restricted (customer account) endpoint configuration
#[derive(Debug, Clone)]
pub struct AccountConfig {
    /// Customer account GraphQL endpoint URL
    pub endpoint: String,
    /// Session token for the authenticated customer
    pub access_token: Option<String>,
    /// Request timeout in seconds (default: 30)
    pub timeout_secs: u64,
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8080/customer-account/api/graphql.json".to_string(),
            access_token: None,
            timeout_secs: 30,
        }
    }
}

/// Which side of the capability boundary a client operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutionContext {
    /// Admin context: full definition and value access for any owner type
    Privileged,
    /// Customer account context: own customer values only, no order writes
    Restricted,
}

impl fmt::Display for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Privileged => write!(f, "Privileged"),
            Self::Restricted => write!(f, "Restricted"),
        }
    }
}

/// Entity kind a definition or value applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OwnerType {
    Order,
    Customer,
}

impl OwnerType {
    /// Wire representation (`ORDER`, `CUSTOMER`)
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Order => "ORDER",
            Self::Customer => "CUSTOMER",
        }
    }

    fn gid_prefix(&self) -> &'static str {
        match self {
            Self::Order => "gid://shopify/Order/",
            Self::Customer => "gid://shopify/Customer/",
        }
    }
}

impl fmt::Display for OwnerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Globally-unique reference to a specific entity instance, carried as the
/// platform's gid string (e.g. `gid://shopify/Order/6128892608816`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OwnerId {
    owner_type: OwnerType,
    gid: String,
}

impl OwnerId {
    /// Reference an order by its numeric id
    pub fn order(id: impl AsRef<str>) -> Self {
        Self {
            owner_type: OwnerType::Order,
            gid: format!("{}{}", OwnerType::Order.gid_prefix(), id.as_ref()),
        }
    }

    /// Reference a customer by its numeric id
    pub fn customer(id: impl AsRef<str>) -> Self {
        Self {
            owner_type: OwnerType::Customer,
            gid: format!("{}{}", OwnerType::Customer.gid_prefix(), id.as_ref()),
        }
    }

    /// Parse a full gid string. Returns `None` for gid kinds this system
    /// does not own values for.
    pub fn from_gid(gid: &str) -> Option<Self> {
        for owner_type in [OwnerType::Order, OwnerType::Customer] {
            if gid.starts_with(owner_type.gid_prefix()) {
                return Some(Self {
                    owner_type,
                    gid: gid.to_string(),
                });
            }
        }
        None
    }

    pub fn owner_type(&self) -> OwnerType {
        self.owner_type
    }

    /// The full gid string sent on the wire
    pub fn as_gid(&self) -> &str {
        &self.gid
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.gid)
    }
}

impl Serialize for OwnerId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.gid)
    }
}

impl<'de> Deserialize<'de> for OwnerId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let gid = String::deserialize(deserializer)?;
        Self::from_gid(&gid)
            .ok_or_else(|| serde::de::Error::custom(format!("unrecognized owner gid: {gid}")))
    }
}

/// A single access level on one surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccessLevel {
    None,
    PublicRead,
    ReadWrite,
}

/// Visibility of a definition's values on each of the three surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessPolicy {
    pub admin: AccessLevel,
    pub customer_account: AccessLevel,
    pub storefront: AccessLevel,
}

impl Default for AccessPolicy {
    /// The policy preference fields are registered with: readable in the
    /// admin and storefront, read-write from the customer account.
    fn default() -> Self {
        Self {
            admin: AccessLevel::PublicRead,
            customer_account: AccessLevel::ReadWrite,
            storefront: AccessLevel::PublicRead,
        }
    }
}

/// Value type descriptor as the platform reports it on reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldType {
    pub category: String,
    pub name: String,
}

/// A registered field definition: the schema governing all values under its
/// (namespace, key, ownerType) triple. At most one exists per triple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefinition {
    /// Platform-assigned gid, present once created
    #[serde(default)]
    pub id: Option<String>,
    pub key: String,
    pub name: String,
    pub namespace: String,
    pub owner_type: OwnerType,
    #[serde(rename = "type")]
    pub value_type: FieldType,
    pub access: AccessPolicy,
    /// Display hint; not part of the identity triple
    #[serde(default)]
    pub pinned: bool,
}

/// Desired shape of a definition, the input to create/update reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefinitionSpec {
    pub key: String,
    pub namespace: String,
    pub owner_type: OwnerType,
    /// Human-readable name; defaults to the key
    pub name: String,
    pub access: AccessPolicy,
    pub pinned: bool,
}

impl DefinitionSpec {
    /// A single-line text definition under the preferences namespace with
    /// the default access policy, pinned.
    pub fn single_line_text(key: impl Into<String>, owner_type: OwnerType) -> Self {
        let key = key.into();
        Self {
            name: key.clone(),
            key,
            namespace: PREFERENCES_NAMESPACE.to_string(),
            owner_type,
            access: AccessPolicy::default(),
            pinned: true,
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_access(mut self, access: AccessPolicy) -> Self {
        self.access = access;
        self
    }

    /// Variables payload for the create mutation (carries the value type)
    pub fn create_input(&self) -> serde_json::Value {
        serde_json::json!({
            "access": self.access,
            "pin": self.pinned,
            "key": self.key,
            "name": self.name,
            "namespace": self.namespace,
            "ownerType": self.owner_type,
            "type": SINGLE_LINE_TEXT_TYPE,
        })
    }

    /// Variables payload for the update mutation (type is immutable)
    pub fn update_input(&self) -> serde_json::Value {
        serde_json::json!({
            "access": self.access,
            "pin": self.pinned,
            "key": self.key,
            "name": self.name,
            "namespace": self.namespace,
            "ownerType": self.owner_type,
        })
    }
}

/// Structured, expected-case rejection returned alongside a mutation's
/// nominal result. The canonical recoverable-error channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserError {
    #[serde(default)]
    pub field: Option<Vec<String>>,
    pub message: String,
    #[serde(default)]
    pub code: Option<String>,
    /// Position in the batch, on batch value sets only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_index: Option<u32>,
}

impl UserError {
    /// Whether this rejection means the definition key is already in use,
    /// the one rejection reconciliation recovers from automatically.
    pub fn is_duplicate(&self) -> bool {
        self.code.as_deref() == Some(DUPLICATE_KEY_CODE)
    }
}

/// Envelope every mutation returns: the payload when the platform accepted
/// the shape, plus any structured rejections. Transport success with
/// non-empty `user_errors` is the expected soft-failure path.
#[derive(Debug, Clone)]
pub struct MutationOutcome<T> {
    pub payload: Option<T>,
    pub user_errors: Vec<UserError>,
}

impl<T> MutationOutcome<T> {
    pub fn ok(payload: T) -> Self {
        Self {
            payload: Some(payload),
            user_errors: Vec::new(),
        }
    }

    pub fn rejected(user_errors: Vec<UserError>) -> Self {
        Self {
            payload: None,
            user_errors,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.user_errors.is_empty()
    }
}

/// Echo of an upserted value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WrittenValue {
    pub key: String,
    pub namespace: String,
    pub value: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// An order as the restricted context may see it: identifying fields only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSummary {
    pub id: OwnerId,
    pub name: String,
}

/// The combined read the restricted context starts from: who the
/// authenticated customer is, what their preference value currently holds,
/// and the identifying fields of the orders it may reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileSnapshot {
    pub customer_id: OwnerId,
    pub first_name: Option<String>,
    /// Existing value under the queried preference key, if any
    pub field_value: Option<String>,
    /// The customer's recent orders (identifying fields only)
    pub recent_orders: Vec<OrderSummary>,
    /// The specific order the snapshot was asked about, if it resolved
    pub order: Option<OrderSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_id_builds_and_parses_gids() {
        let order = OwnerId::order("6128892608816");
        assert_eq!(order.as_gid(), "gid://shopify/Order/6128892608816");
        assert_eq!(order.owner_type(), OwnerType::Order);

        let parsed = OwnerId::from_gid("gid://shopify/Customer/42").unwrap();
        assert_eq!(parsed.owner_type(), OwnerType::Customer);
        assert_eq!(parsed, OwnerId::customer("42"));

        // Gid kinds this system owns no values for don't parse
        assert!(OwnerId::from_gid("gid://shopify/Product/1").is_none());
    }

    #[test]
    fn owner_id_serde_is_the_bare_gid() {
        let owner = OwnerId::customer("7");
        let json = serde_json::to_value(&owner).unwrap();
        assert_eq!(json, serde_json::json!("gid://shopify/Customer/7"));

        let back: OwnerId = serde_json::from_value(json).unwrap();
        assert_eq!(back, owner);

        let foreign = serde_json::json!("gid://shopify/Product/1");
        assert!(serde_json::from_value::<OwnerId>(foreign).is_err());
    }

    #[test]
    fn access_levels_use_platform_spelling() {
        assert_eq!(
            serde_json::to_value(AccessLevel::PublicRead).unwrap(),
            serde_json::json!("PUBLIC_READ")
        );
        assert_eq!(
            serde_json::to_value(AccessPolicy::default()).unwrap(),
            serde_json::json!({
                "admin": "PUBLIC_READ",
                "customerAccount": "READ_WRITE",
                "storefront": "PUBLIC_READ",
            })
        );
    }

    #[test]
    fn create_input_carries_type_update_input_does_not() {
        let spec = DefinitionSpec::single_line_text("nickname", OwnerType::Customer);
        let create = spec.create_input();
        assert_eq!(create["type"], SINGLE_LINE_TEXT_TYPE);
        assert_eq!(create["ownerType"], "CUSTOMER");
        assert_eq!(create["namespace"], PREFERENCES_NAMESPACE);
        assert_eq!(create["pin"], true);
        assert_eq!(create["name"], "nickname");

        let update = spec.update_input();
        assert!(update.get("type").is_none());
    }

    #[test]
    fn definition_deserializes_from_wire_node() {
        let node = serde_json::json!({
            "id": "gid://shopify/MetafieldDefinition/123",
            "key": "nickname",
            "name": "nickname",
            "namespace": "$app:preferences",
            "ownerType": "CUSTOMER",
            "type": { "category": "TEXT", "name": "single_line_text_field" },
            "access": {
                "admin": "PUBLIC_READ",
                "customerAccount": "READ_WRITE",
                "storefront": "PUBLIC_READ",
            },
        });

        let definition: FieldDefinition = serde_json::from_value(node).unwrap();
        assert_eq!(definition.id.as_deref(), Some("gid://shopify/MetafieldDefinition/123"));
        assert_eq!(definition.owner_type, OwnerType::Customer);
        assert_eq!(definition.value_type.name, SINGLE_LINE_TEXT_TYPE);
        assert_eq!(definition.access, AccessPolicy::default());
        assert!(!definition.pinned);
    }

    #[test]
    fn duplicate_detection_keys_off_the_code() {
        let taken = UserError {
            field: Some(vec!["definition".into(), "key".into()]),
            message: "Key is in use".into(),
            code: Some("TAKEN".into()),
            element_index: None,
        };
        assert!(taken.is_duplicate());

        let other = UserError {
            field: None,
            message: "Access is invalid".into(),
            code: Some("INVALID".into()),
            element_index: None,
        };
        assert!(!other.is_duplicate());
    }
}
