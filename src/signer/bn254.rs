//! BN254 keys and BLS-style signatures.
//!
//! Signatures live on G1 and public keys on G2 so that a single pairing
//! check verifies them on chain. Messages are mapped to G1 with the
//! try-and-increment routine used by the EigenLayer `BN254.hashToG1`
//! library, which keeps signatures produced here verifiable by those
//! contracts.

use ark_bn254::{Bn254, Fq, Fq2, Fr, G1Affine, G2Affine};
use ark_ec::pairing::Pairing;
use ark_ec::{AffineRepr, CurveGroup};
use ark_ff::{BigInteger, Field, One, PrimeField, UniformRand, Zero};
use secrecy::{ExposeSecret, Secret};
use std::fmt;

use crate::signer::ecdsa::keccak256;
use crate::signer::error::SignerError;

/// Encoded G1 point: `x || y`, big-endian.
pub const G1_POINT_LENGTH: usize = 64;

/// Encoded G2 point: `x.c1 || x.c0 || y.c1 || y.c0`, big-endian.
pub const G2_POINT_LENGTH: usize = 128;

/// BN254 private key scalar.
pub struct Bn254PrivateKey {
    inner: Secret<[u8; 32]>,
}

impl Bn254PrivateKey {
    /// Create from a 32-byte big-endian scalar. The value must be a non-zero
    /// element of the scalar field.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SignerError> {
        if bytes.len() != 32 {
            return Err(SignerError::InvalidKey(format!(
                "BN254 private key must be 32 bytes, got {}",
                bytes.len()
            )));
        }
        let scalar = Fr::from_be_bytes_mod_order(bytes);
        if scalar.is_zero() {
            return Err(SignerError::InvalidKey(
                "BN254 private key must be non-zero".to_string(),
            ));
        }
        if scalar.into_bigint().to_bytes_be() != bytes {
            return Err(SignerError::InvalidKey(
                "BN254 private key exceeds the scalar field modulus".to_string(),
            ));
        }

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
        let mut rng = rand_core::OsRng;
        let mut scalar = Fr::rand(&mut rng);
        while scalar.is_zero() {
            scalar = Fr::rand(&mut rng);
        }
        let mut key = [0u8; 32];
        key.copy_from_slice(&scalar.into_bigint().to_bytes_be());
        Self {
            inner: Secret::new(key),
        }
    }

    fn scalar(&self) -> Fr {
        Fr::from_be_bytes_mod_order(self.inner.expose_secret())
    }

    /// The matching public key pair.
    pub fn public_key(&self) -> Bn254PublicKey {
        let scalar = self.scalar();
        Bn254PublicKey {
            g1: (G1Affine::generator() * scalar).into_affine(),
            g2: (G2Affine::generator() * scalar).into_affine(),
        }
    }

    /// Sign `keccak256(data)`.
    pub fn sign(&self, data: &[u8]) -> Vec<u8> {
        self.sign_digest(&keccak256(data))
    }

    /// Sign a 32-byte digest exactly as the on-chain verifier hashes it.
    pub fn sign_digest(&self, digest: &[u8; 32]) -> Vec<u8> {
        let point = (hash_to_g1(digest) * self.scalar()).into_affine();
        encode_g1(&point)
    }
}

impl fmt::Debug for Bn254PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Bn254PrivateKey([REDACTED])")
    }
}

/// BN254 public key on both groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bn254PublicKey {
    g1: G1Affine,
    g2: G2Affine,
}

impl Bn254PublicKey {
    /// G1 key, `x || y`.
    pub fn g1_bytes(&self) -> Vec<u8> {
        encode_g1(&self.g1)
    }

    /// G2 key, in the coordinate order Solidity precompiles expect.
    pub fn g2_bytes(&self) -> Vec<u8> {
        encode_g2(&self.g2)
    }

    /// Check a signature produced by [`Bn254PrivateKey::sign`].
    pub fn verify(&self, data: &[u8], signature: &[u8]) -> bool {
        self.verify_digest(&keccak256(data), signature)
    }

    /// Pairing check `e(sig, g2) == e(H(m), pk)`.
    pub fn verify_digest(&self, digest: &[u8; 32], signature: &[u8]) -> bool {
        let Ok(sig) = decode_g1(signature) else {
            return false;
        };
        let lhs = Bn254::pairing(sig, G2Affine::generator());
        let rhs = Bn254::pairing(hash_to_g1(digest), self.g2);
        lhs == rhs
    }
}

/// Map a digest onto G1 by incrementing `x` until `x^3 + 3` has a root.
pub fn hash_to_g1(digest: &[u8; 32]) -> G1Affine {
    let three = Fq::from(3u64);
    let mut x = Fq::from_be_bytes_mod_order(digest);
    loop {
        let y_squared = x.square() * x + three;
        if let Some(y) = y_squared.sqrt() {
            return G1Affine::new_unchecked(x, y);
        }
        x += Fq::one();
    }
}

fn fq_to_bytes(value: &Fq) -> Vec<u8> {
    value.into_bigint().to_bytes_be()
}

fn encode_g1(point: &G1Affine) -> Vec<u8> {
    let mut out = Vec::with_capacity(G1_POINT_LENGTH);
    if point.is_zero() {
        out.resize(G1_POINT_LENGTH, 0);
        return out;
    }
    out.extend_from_slice(&fq_to_bytes(&point.x));
    out.extend_from_slice(&fq_to_bytes(&point.y));
    out
}

fn encode_g2(point: &G2Affine) -> Vec<u8> {
    let mut out = Vec::with_capacity(G2_POINT_LENGTH);
    if point.is_zero() {
        out.resize(G2_POINT_LENGTH, 0);
        return out;
    }
    let coords: [&Fq2; 2] = [&point.x, &point.y];
    for coord in coords {
        out.extend_from_slice(&fq_to_bytes(&coord.c1));
        out.extend_from_slice(&fq_to_bytes(&coord.c0));
    }
    out
}

fn decode_g1(bytes: &[u8]) -> Result<G1Affine, SignerError> {
    if bytes.len() != G1_POINT_LENGTH {
        return Err(SignerError::InvalidSignature(format!(
            "G1 point must be {} bytes, got {}",
            G1_POINT_LENGTH,
            bytes.len()
        )));
    }
    let x = Fq::from_be_bytes_mod_order(&bytes[..32]);
    let y = Fq::from_be_bytes_mod_order(&bytes[32..]);
    let point = G1Affine::new_unchecked(x, y);
    if !point.is_on_curve() || !point.is_in_correct_subgroup_assuming_on_curve() {
        return Err(SignerError::InvalidSignature(
            "G1 point is not on the curve".to_string(),
        ));
    }
    Ok(point)
}
