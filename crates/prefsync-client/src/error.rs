//! Error types for the endpoint clients

use crate::types::ExecutionContext;
use thiserror::Error;

/// Endpoint client error
///
/// Expected platform rejections (duplicate definitions, invalid policies)
/// are NOT errors; they ride back inside
/// [`MutationOutcome::user_errors`](crate::types::MutationOutcome). This enum
/// covers transport-class failures and capability violations only.
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Server returned a non-success status
    #[error("Server error {status}: {message}")]
    Server { status: u16, message: String },

    /// Query failed with top-level GraphQL errors
    #[error("GraphQL error: {0}")]
    Graphql(String),

    /// Response decoded but carried no data payload
    #[error("Response missing {0}")]
    MissingData(&'static str),

    /// Operation outside the execution context's granted scope.
    /// Terminal for the call; the fix is routing, not retrying.
    #[error("Capability violation in {context} context: {message}")]
    Capability {
        context: ExecutionContext,
        message: String,
    },
}

/// Result type for client operations
pub type Result<T> = std::result::Result<T, ClientError>;
