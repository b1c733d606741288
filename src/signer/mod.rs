//! Signing capability shared by authentication and task signing.
//!
//! A [`Signer`] hides whether the key lives in this process ([`LocalSigner`])
//! or behind a remote signing service ([`RemoteSigner`]). The curve is fixed
//! when the signer is built; unsupported curve and operation pairs are
//! rejected there or with an explicit error, never silently.

pub mod bn254;
pub mod ecdsa;
pub mod error;
pub mod local;
pub mod remote;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use bn254::{Bn254PrivateKey, Bn254PublicKey};
pub use ecdsa::{keccak256, EcdsaPrivateKey, EcdsaPublicKey};
pub use error::SignerError;
pub use local::{LocalSigner, PrivateKey};
pub use remote::RemoteSigner;

/// Signature scheme of a signer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CurveType {
    Bn254,
    Ecdsa,
}

impl fmt::Display for CurveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CurveType::Bn254 => write!(f, "bn254"),
            CurveType::Ecdsa => write!(f, "ecdsa"),
        }
    }
}

impl FromStr for CurveType {
    type Err = SignerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bn254" => Ok(CurveType::Bn254),
            "ecdsa" => Ok(CurveType::Ecdsa),
            other => Err(SignerError::InvalidKey(format!(
                "unknown curve type {:?}",
                other
            ))),
        }
    }
}

/// Produces signatures and exposes the identity behind them.
#[async_trait]
pub trait Signer: Send + Sync {
    /// Sign an arbitrary message.
    async fn sign_message(&self, data: &[u8]) -> Result<Vec<u8>, SignerError>;

    /// Sign a 32-byte digest in the format on-chain verifiers expect.
    async fn sign_message_for_solidity(&self, digest: &[u8]) -> Result<Vec<u8>, SignerError>;

    fn curve_type(&self) -> CurveType;

    /// Ethereum address of the signer. Only meaningful for ECDSA.
    fn from_address(&self) -> Result<String, SignerError>;

    /// Public key bytes (uncompressed SEC1 for ECDSA, G2 for BN254).
    fn public_key(&self) -> Result<Vec<u8>, SignerError>;

    fn supports_remote_signing(&self) -> bool {
        false
    }

    /// Confirm the signer is usable. Remote signers contact the service.
    async fn validate(&self) -> Result<(), SignerError> {
        Ok(())
    }
}

/// Require the fixed-width digest Solidity verifiers work with.
pub(crate) fn as_digest(data: &[u8]) -> Result<[u8; 32], SignerError> {
    data.try_into()
        .map_err(|_| SignerError::InvalidDigestLength(data.len()))
}
