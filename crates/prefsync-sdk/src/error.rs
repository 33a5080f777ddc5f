//! Error types for the sync SDK

use prefsync_client::ClientError;
use thiserror::Error;

/// Result type for SDK operations
pub type Result<T> = std::result::Result<T, SdkError>;

/// SDK error types
///
/// Expected platform rejections stay inside outcomes as
/// [`UserError`](prefsync_client::UserError) lists; these variants are the
/// hard failures that terminate the current step.
#[derive(Error, Debug)]
pub enum SdkError {
    /// Network/transport failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Operation outside the current context's granted scope
    #[error("Capability violation: {0}")]
    Capability(String),

    /// The cross-context channel is gone
    #[error("Handoff channel closed while waiting for {0}")]
    HandoffClosed(&'static str),
}

impl From<ClientError> for SdkError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Capability { context, message } => {
                SdkError::Capability(format!("{context} context: {message}"))
            }
            other => SdkError::Transport(other.to_string()),
        }
    }
}
