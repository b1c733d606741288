//! Error types for the remote signing client.

use thiserror::Error;

use crate::jsonrpc::JsonRpcError;

/// Errors from the remote signing service or its configuration.
#[derive(Debug, Error)]
pub enum Web3SignerError {
    #[error("Invalid remote signer configuration: {0}")]
    Config(String),

    #[error("Remote signer returned HTTP {status} for {path}: {body}")]
    Http {
        path: String,
        status: u16,
        body: String,
    },

    #[error(transparent)]
    JsonRpc(#[from] JsonRpcError),

    #[error("Remote signer request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Invalid response from remote signer: {0}")]
    InvalidResponse(String),
}

impl Web3SignerError {
    /// HTTP status or JSON-RPC error code carried by the failure, if any.
    pub fn code(&self) -> Option<i64> {
        match self {
            Web3SignerError::Http { status, .. } => Some(i64::from(*status)),
            Web3SignerError::JsonRpc(e) => e.code(),
            Web3SignerError::Request(e) => e.status().map(|s| i64::from(s.as_u16())),
            Web3SignerError::Config(_) | Web3SignerError::InvalidResponse(_) => None,
        }
    }

    /// Whether the failure was the HTTP client timeout elapsing.
    pub fn is_timeout(&self) -> bool {
        match self {
            Web3SignerError::JsonRpc(e) => e.is_timeout(),
            Web3SignerError::Request(e) => e.is_timeout(),
            _ => false,
        }
    }
}
