use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Per-call dispatch failures.
///
/// These are never propagated as faults: the dispatcher renders each one
/// into the content of the corresponding tool message so the model and the
/// user see them as data. The display strings are part of that wire shape.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DispatchError {
    #[error("Failed to parse arguments: {0}")]
    InvalidArguments(String),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Error calling MCP tool: {0}")]
    CallFailed(String),
}

/// Failures on a tool-provider connection.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("failed to spawn provider '{provider}': {source}")]
    Spawn {
        provider: String,
        #[source]
        source: std::io::Error,
    },

    #[error("transport error on provider '{provider}': {message}")]
    Transport { provider: String, message: String },

    #[error("provider '{provider}' returned an error: {message}")]
    Rpc { provider: String, message: String },

    #[error("provider '{provider}' connection is closed")]
    Closed { provider: String },
}

pub type ProviderResult<T> = Result<T, ProviderError>;
