//! secp256k1 keys with Ethereum conventions.
//!
//! Signatures are recoverable and laid out as `r || s || v` with `v` in
//! `{27, 28}`, the form accepted by `ecrecover`.

use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use secrecy::{ExposeSecret, Secret};
use sha3::{Digest, Keccak256};
use std::fmt;

use crate::signer::error::SignerError;

/// Length of an encoded recoverable signature.
pub const SIGNATURE_LENGTH: usize = 65;

/// Offset added to the recovery id so the signature verifies on chain.
const RECOVERY_ID_OFFSET: u8 = 27;

/// Keccak-256 of arbitrary bytes.
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    Keccak256::digest(data).into()
}

/// secp256k1 private key, zeroized on drop.
pub struct EcdsaPrivateKey {
    inner: Secret<[u8; 32]>,
}

impl EcdsaPrivateKey {
    /// Create from 32 raw scalar bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SignerError> {
        if bytes.len() != 32 {
            return Err(SignerError::InvalidKey(format!(
                "ECDSA private key must be 32 bytes, got {}",
                bytes.len()
            )));
        }
        // Reject zero and out-of-range scalars up front.
        SigningKey::from_slice(bytes).map_err(|e| SignerError::InvalidKey(e.to_string()))?;

        let mut key = [0u8; 32];
        key.copy_from_slice(bytes);
        Ok(Self {
            inner: Secret::new(key),
        })
    }

    /// Parse a hex string, with or without a `0x` prefix.
    pub fn from_hex(hex_key: &str) -> Result<Self, SignerError> {
        let bytes = hex::decode(hex_key.trim().trim_start_matches("0x"))
            .map_err(|e| SignerError::InvalidKey(format!("invalid hex: {}", e)))?;
        Self::from_bytes(&bytes)
    }

    /// Generate a fresh random key.
    pub fn random() -> Self {
        let key = SigningKey::random(&mut rand_core::OsRng);
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&key.to_bytes());
        Self {
            inner: Secret::new(bytes),
        }
    }

    fn signing_key(&self) -> Result<SigningKey, SignerError> {
        SigningKey::from_slice(self.inner.expose_secret())
            .map_err(|e| SignerError::InvalidKey(e.to_string()))
    }

    /// The matching public key.
    pub fn public_key(&self) -> Result<EcdsaPublicKey, SignerError> {
        Ok(EcdsaPublicKey {
            inner: *self.signing_key()?.verifying_key(),
        })
    }

    /// Sign `keccak256(data)`.
    pub fn sign(&self, data: &[u8]) -> Result<Vec<u8>, SignerError> {
        self.sign_prehash(&keccak256(data))
    }

    /// Sign an already hashed 32-byte digest.
    pub fn sign_prehash(&self, digest: &[u8; 32]) -> Result<Vec<u8>, SignerError> {
        let (signature, recovery_id) = self
            .signing_key()?
            .sign_prehash_recoverable(digest)
            .map_err(|e| SignerError::SigningFailed(e.to_string()))?;

        let mut encoded = Vec::with_capacity(SIGNATURE_LENGTH);
        encoded.extend_from_slice(&signature.to_bytes());
        encoded.push(recovery_id.to_byte() + RECOVERY_ID_OFFSET);
        Ok(encoded)
    }
}

impl fmt::Debug for EcdsaPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EcdsaPrivateKey([REDACTED])")
    }
}

/// secp256k1 public key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EcdsaPublicKey {
    inner: VerifyingKey,
}

impl EcdsaPublicKey {
    /// Parse a SEC1 key. Accepts compressed (33 bytes), uncompressed (65 bytes)
    /// and the bare 64-byte `x || y` form remote signers report.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SignerError> {
        let inner = if bytes.len() == 64 {
            let mut prefixed = Vec::with_capacity(65);
            prefixed.push(0x04);
            prefixed.extend_from_slice(bytes);
            VerifyingKey::from_sec1_bytes(&prefixed)
        } else {
            VerifyingKey::from_sec1_bytes(bytes)
        }
        .map_err(|e| SignerError::InvalidKey(format!("invalid secp256k1 public key: {}", e)))?;

        Ok(Self { inner })
    }

    /// Parse a hex string, with or without a `0x` prefix.
    pub fn from_hex(hex_key: &str) -> Result<Self, SignerError> {
        let bytes = hex::decode(hex_key.trim().trim_start_matches("0x"))
            .map_err(|e| SignerError::InvalidKey(format!("invalid hex: {}", e)))?;
        Self::from_bytes(&bytes)
    }

    /// Uncompressed SEC1 encoding (65 bytes, `0x04` prefix).
    pub fn to_uncompressed(&self) -> Vec<u8> {
        self.inner.to_encoded_point(false).as_bytes().to_vec()
    }

    /// Ethereum address: last 20 bytes of the Keccak-256 of `x || y`.
    pub fn address(&self) -> String {
        let uncompressed = self.to_uncompressed();
        let hash = keccak256(&uncompressed[1..]);
        format!("0x{}", hex::encode(&hash[12..]))
    }

    /// Check a signature produced by [`EcdsaPrivateKey::sign`].
    pub fn verify(&self, data: &[u8], signature: &[u8]) -> bool {
        self.verify_prehash(&keccak256(data), signature)
    }

    /// Check a signature over a 32-byte digest by recovering the signer.
    pub fn verify_prehash(&self, digest: &[u8; 32], signature: &[u8]) -> bool {
        if signature.len() != SIGNATURE_LENGTH {
            return false;
        }
        let Some(v) = signature[64].checked_sub(RECOVERY_ID_OFFSET) else {
            return false;
        };
        let Some(recovery_id) = RecoveryId::from_byte(v) else {
            return false;
        };
        let Ok(sig) = Signature::from_slice(&signature[..64]) else {
            return false;
        };

        match VerifyingKey::recover_from_prehash(digest, &sig, recovery_id) {
            Ok(recovered) => recovered == self.inner,
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Well-known hardhat account #0.
    const TEST_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const TEST_ADDRESS: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";

    #[test]
    fn test_address_derivation() {
        let key = EcdsaPrivateKey::from_hex(TEST_KEY).unwrap();
        assert_eq!(key.public_key().unwrap().address(), TEST_ADDRESS);

        let prefixed = EcdsaPrivateKey::from_hex(&format!("0x{}", TEST_KEY)).unwrap();
        assert_eq!(prefixed.public_key().unwrap().address(), TEST_ADDRESS);
    }

    #[test]
    fn test_sign_is_deterministic_and_recoverable() {
        let key = EcdsaPrivateKey::from_hex(TEST_KEY).unwrap();
        let sig1 = key.sign(b"hello").unwrap();
        let sig2 = key.sign(b"hello").unwrap();

        assert_eq!(sig1.len(), SIGNATURE_LENGTH);
        assert_eq!(sig1, sig2);
        assert!(sig1[64] == 27 || sig1[64] == 28);
        assert!(key.public_key().unwrap().verify(b"hello", &sig1));
        assert!(!key.public_key().unwrap().verify(b"hellO", &sig1));
    }

    #[test]
    fn test_public_key_forms() {
        let key = EcdsaPrivateKey::from_hex(TEST_KEY).unwrap();
        let public = key.public_key().unwrap();
        let uncompressed = public.to_uncompressed();

        let bare = EcdsaPublicKey::from_bytes(&uncompressed[1..]).unwrap();
        let full = EcdsaPublicKey::from_hex(&hex::encode(&uncompressed)).unwrap();
        assert_eq!(bare, public);
        assert_eq!(full, public);
    }

    #[test]
    fn test_invalid_keys_rejected() {
        assert!(EcdsaPrivateKey::from_bytes(&[0u8; 16]).is_err());
        assert!(EcdsaPrivateKey::from_bytes(&[0u8; 32]).is_err());
        assert!(EcdsaPrivateKey::from_hex("zz").is_err());
        assert!(EcdsaPublicKey::from_hex("0x1234").is_err());
    }

    #[test]
    fn test_debug_redacted() {
        let key = EcdsaPrivateKey::from_hex(TEST_KEY).unwrap();
        let debug_str = format!("{:?}", key);
        assert!(debug_str.contains("REDACTED"));
        assert!(!debug_str.contains("ac09"));
    }
}
