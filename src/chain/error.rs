//! Error types for chain collaborators.

use thiserror::Error;

use crate::jsonrpc::JsonRpcError;

/// Errors from chain connectivity, queries and event delivery.
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("Failed to connect to chain RPC at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Block height regression: current {current} < expected {expected}")]
    BlockRegression { current: u64, expected: u64 },

    #[error("RPC request failed: {0}")]
    Rpc(#[from] JsonRpcError),

    #[error("Failed to decode chain data: {0}")]
    Decode(String),

    #[error("No configuration for AVS {0}")]
    AvsNotFound(String),

    #[error("Event queue closed")]
    QueueClosed,
}
