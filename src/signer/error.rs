//! Error types for signing operations.

use thiserror::Error;

use crate::signer::CurveType;
use crate::web3signer::Web3SignerError;

/// Errors produced by local and remote signers.
#[derive(Debug, Error)]
pub enum SignerError {
    #[error("Invalid key material: {0}")]
    InvalidKey(String),

    #[error("Unsupported curve type {curve} for {operation}")]
    UnsupportedCurve {
        curve: CurveType,
        operation: &'static str,
    },

    #[error("Invalid digest length: expected 32 bytes, got {0}")]
    InvalidDigestLength(usize),

    #[error("Signing failed: {0}")]
    SigningFailed(String),

    #[error("Invalid signature encoding: {0}")]
    InvalidSignature(String),

    #[error("Remote signer validation failed: {0}")]
    Validation(String),

    #[error("Remote signer error: {0}")]
    Remote(#[from] Web3SignerError),
}
