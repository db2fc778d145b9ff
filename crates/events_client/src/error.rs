//! Events client error types

use thiserror::Error;

/// Errors raised while building an events client
///
/// Nothing in here is ever returned by `send`.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Missing or invalid construction parameter
    #[error("invalid configuration: {0}")]
    Configuration(#[from] contracts::ContractError),

    /// Collaborator could not be created
    #[error("failed to create sink '{name}': {message}")]
    SinkCreation { name: String, message: String },
}

impl ClientError {
    /// Create a sink creation error
    pub fn sink_creation(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkCreation {
            name: name.into(),
            message: message.into(),
        }
    }
}
