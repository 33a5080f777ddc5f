//! Typed GraphQL clients for the storefront preference metafield APIs
//!
//! Two endpoint clients with asymmetric capabilities:
//! - [`AdminClient`]: the privileged admin endpoint. Manages field
//!   definitions and reads/writes values for any owner type.
//! - [`AccountClient`]: the restricted customer account endpoint. Scoped to
//!   the authenticated customer; it can read and write that customer's own
//!   values but holds no order-metafield capability, so order writes are
//!   refused before any request is issued.
//!
//! # Example
//!
//! ```rust,no_run
//! use prefsync_client::{AdminClient, AdminConfig, DefinitionSpec, OwnerType};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = AdminClient::new(AdminConfig {
//!     endpoint: "https://shop.example/admin/api/graphql.json".into(),
//!     access_token: Some("shpat_...".into()),
//!     ..Default::default()
//! });
//!
//! // Look up a definition (absent is None, not an error)
//! let existing = client
//!     .definition_get("nickname", "$app:preferences", OwnerType::Customer)
//!     .await?;
//!
//! if existing.is_none() {
//!     let spec = DefinitionSpec::single_line_text("nickname", OwnerType::Customer);
//!     let outcome = client.definition_create(&spec).await?;
//!     for err in &outcome.user_errors {
//!         eprintln!("rejected: {}", err.message);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod account;
pub mod admin;
pub mod error;
mod graphql;
pub mod types;

// Re-export main types
pub use account::AccountClient;
pub use admin::AdminClient;
pub use error::{ClientError, Result};
pub use types::*;
