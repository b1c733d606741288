//! In-process signer holding its private key for the life of the process.

use async_trait::async_trait;

use crate::signer::bn254::Bn254PrivateKey;
use crate::signer::ecdsa::EcdsaPrivateKey;
use crate::signer::error::SignerError;
use crate::signer::{as_digest, CurveType, Signer};

/// Private key tagged by curve.
#[derive(Debug)]
pub enum PrivateKey {
    Bn254(Bn254PrivateKey),
    Ecdsa(EcdsaPrivateKey),
}

impl PrivateKey {
    pub fn from_hex(curve: CurveType, hex_key: &str) -> Result<Self, SignerError> {
        match curve {
            CurveType::Bn254 => Ok(PrivateKey::Bn254(Bn254PrivateKey::from_hex(hex_key)?)),
            CurveType::Ecdsa => Ok(PrivateKey::Ecdsa(EcdsaPrivateKey::from_hex(hex_key)?)),
        }
    }

    pub fn curve_type(&self) -> CurveType {
        match self {
            PrivateKey::Bn254(_) => CurveType::Bn254,
            PrivateKey::Ecdsa(_) => CurveType::Ecdsa,
        }
    }
}

/// Signer backed by an in-memory private key.
#[derive(Debug)]
pub struct LocalSigner {
    key: PrivateKey,
}

impl LocalSigner {
    pub fn new(key: PrivateKey) -> Self {
        Self { key }
    }

    pub fn from_hex(curve: CurveType, hex_key: &str) -> Result<Self, SignerError> {
        Ok(Self::new(PrivateKey::from_hex(curve, hex_key)?))
    }

    pub fn ecdsa(key: EcdsaPrivateKey) -> Self {
        Self::new(PrivateKey::Ecdsa(key))
    }

    pub fn bn254(key: Bn254PrivateKey) -> Self {
        Self::new(PrivateKey::Bn254(key))
    }

    /// Check a signature from [`Signer::sign_message`] against this key.
    pub fn verify(&self, data: &[u8], signature: &[u8]) -> bool {
        match &self.key {
            PrivateKey::Bn254(key) => key.public_key().verify(data, signature),
            PrivateKey::Ecdsa(key) => key
                .public_key()
                .map(|public| public.verify(data, signature))
                .unwrap_or(false),
        }
    }
}

#[async_trait]
impl Signer for LocalSigner {
    async fn sign_message(&self, data: &[u8]) -> Result<Vec<u8>, SignerError> {
        match &self.key {
            PrivateKey::Bn254(key) => Ok(key.sign(data)),
            PrivateKey::Ecdsa(key) => key.sign(data),
        }
    }

    async fn sign_message_for_solidity(&self, digest: &[u8]) -> Result<Vec<u8>, SignerError> {
        let digest = as_digest(digest)?;
        match &self.key {
            PrivateKey::Bn254(key) => Ok(key.sign_digest(&digest)),
            PrivateKey::Ecdsa(key) => key.sign(&digest),
        }
    }

    fn curve_type(&self) -> CurveType {
        self.key.curve_type()
    }

    fn from_address(&self) -> Result<String, SignerError> {
        match &self.key {
            PrivateKey::Ecdsa(key) => Ok(key.public_key()?.address()),
            PrivateKey::Bn254(_) => Err(SignerError::UnsupportedCurve {
                curve: CurveType::Bn254,
                operation: "from-address derivation",
            }),
        }
    }

    fn public_key(&self) -> Result<Vec<u8>, SignerError> {
        match &self.key {
            PrivateKey::Ecdsa(key) => Ok(key.public_key()?.to_uncompressed()),
            PrivateKey::Bn254(key) => Ok(key.public_key().g2_bytes()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signer::bn254::{G1_POINT_LENGTH, G2_POINT_LENGTH};
    use crate::signer::ecdsa::SIGNATURE_LENGTH;

    const ECDSA_KEY: &str = "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";
    const BN254_KEY: &str = "0x00000000000000000000000000000000000000000000000000000000000beef1";

    #[tokio::test]
    async fn test_ecdsa_local_signer() {
        let signer = LocalSigner::from_hex(CurveType::Ecdsa, ECDSA_KEY).unwrap();
        assert_eq!(signer.curve_type(), CurveType::Ecdsa);
        assert!(!signer.supports_remote_signing());
        assert_eq!(
            signer.from_address().unwrap(),
            "0x70997970c51812dc3a010c7d01b50e0d17dc79c8"
        );

        let sig = signer.sign_message(b"data").await.unwrap();
        assert_eq!(sig.len(), SIGNATURE_LENGTH);
        assert!(signer.verify(b"data", &sig));
        assert_eq!(signer.public_key().unwrap().len(), 65);
    }

    #[tokio::test]
    async fn test_bn254_local_signer() {
        let signer = LocalSigner::from_hex(CurveType::Bn254, BN254_KEY).unwrap();
        assert_eq!(signer.curve_type(), CurveType::Bn254);
        assert!(matches!(
            signer.from_address(),
            Err(SignerError::UnsupportedCurve { .. })
        ));

        let sig = signer.sign_message(b"data").await.unwrap();
        assert_eq!(sig.len(), G1_POINT_LENGTH);
        assert!(signer.verify(b"data", &sig));
        assert_eq!(signer.public_key().unwrap().len(), G2_POINT_LENGTH);
    }

    #[tokio::test]
    async fn test_solidity_signing_requires_digest() {
        let signer = LocalSigner::from_hex(CurveType::Ecdsa, ECDSA_KEY).unwrap();
        assert!(matches!(
            signer.sign_message_for_solidity(b"short").await,
            Err(SignerError::InvalidDigestLength(5))
        ));

        let digest = [7u8; 32];
        let for_solidity = signer.sign_message_for_solidity(&digest).await.unwrap();
        let plain = signer.sign_message(&digest).await.unwrap();
        assert_eq!(for_solidity, plain);
    }

    #[tokio::test]
    async fn test_bn254_solidity_signing_verifies() {
        let key = Bn254PrivateKey::from_hex(BN254_KEY).unwrap();
        let public = key.public_key();
        let signer = LocalSigner::bn254(key);

        let digest = [9u8; 32];
        let sig = signer.sign_message_for_solidity(&digest).await.unwrap();
        assert!(public.verify_digest(&digest, &sig));
    }
}
