//! Signer that delegates to a remote signing service.
//!
//! Only ECDSA is supported; the service holds the key and this side keeps
//! nothing but the public key identifier and the derived address.

use async_trait::async_trait;
use log::{debug, info, warn};
use std::sync::Arc;

use crate::signer::ecdsa::EcdsaPublicKey;
use crate::signer::error::SignerError;
use crate::signer::{CurveType, Signer};
use crate::web3signer::Web3SignerClient;

/// Remote ECDSA signer.
#[derive(Debug)]
pub struct RemoteSigner {
    client: Arc<Web3SignerClient>,
    /// Lowercase hex public key without `0x`, used as the REST identifier.
    identifier: String,
    from_address: String,
    public_key: EcdsaPublicKey,
}

impl RemoteSigner {
    /// Bind a remote signer to `public_key` (hex, `0x` optional).
    pub fn new(
        client: Arc<Web3SignerClient>,
        public_key: &str,
        curve: CurveType,
    ) -> Result<Self, SignerError> {
        if curve != CurveType::Ecdsa {
            return Err(SignerError::UnsupportedCurve {
                curve,
                operation: "remote signing",
            });
        }

        let identifier = public_key.trim().trim_start_matches("0x").to_ascii_lowercase();
        if identifier.is_empty() {
            return Err(SignerError::InvalidKey(
                "remote signer public key must not be empty".to_string(),
            ));
        }

        let parsed = EcdsaPublicKey::from_hex(&identifier)?;
        let from_address = parsed.address();
        info!(
            "Remote signer bound to {} via {}",
            from_address,
            client.base_url()
        );

        Ok(Self {
            client,
            identifier,
            from_address,
            public_key: parsed,
        })
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }
}

#[async_trait]
impl Signer for RemoteSigner {
    async fn sign_message(&self, data: &[u8]) -> Result<Vec<u8>, SignerError> {
        debug!("Remote signing {} bytes for {}", data.len(), self.from_address);
        Ok(self.client.sign_raw(&self.identifier, data).await?)
    }

    async fn sign_message_for_solidity(&self, digest: &[u8]) -> Result<Vec<u8>, SignerError> {
        self.sign_message(digest).await
    }

    fn curve_type(&self) -> CurveType {
        CurveType::Ecdsa
    }

    fn from_address(&self) -> Result<String, SignerError> {
        Ok(self.from_address.clone())
    }

    fn public_key(&self) -> Result<Vec<u8>, SignerError> {
        Ok(self.public_key.to_uncompressed())
    }

    fn supports_remote_signing(&self) -> bool {
        true
    }

    async fn validate(&self) -> Result<(), SignerError> {
        let accounts = self.client.eth_accounts().await?;
        if accounts
            .iter()
            .any(|account| account.eq_ignore_ascii_case(&self.from_address))
        {
            info!("Remote signer account {} is available", self.from_address);
            return Ok(());
        }

        warn!(
            "Remote signer does not manage {} ({} accounts listed)",
            self.from_address,
            accounts.len()
        );
        Err(SignerError::Validation(format!(
            "address {} not found in remote signer accounts",
            self.from_address
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signer::ecdsa::EcdsaPrivateKey;
    use crate::web3signer::Web3SignerConfig;

    fn client() -> Arc<Web3SignerClient> {
        Arc::new(Web3SignerClient::new(&Web3SignerConfig::new("http://127.0.0.1:9000")).unwrap())
    }

    fn public_key_hex() -> String {
        let key = EcdsaPrivateKey::from_hex(
            "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
        )
        .unwrap();
        format!("0x{}", hex::encode(key.public_key().unwrap().to_uncompressed()))
    }

    #[test]
    fn test_bn254_rejected_at_construction() {
        let result = RemoteSigner::new(client(), &public_key_hex(), CurveType::Bn254);
        assert!(matches!(
            result,
            Err(SignerError::UnsupportedCurve {
                curve: CurveType::Bn254,
                ..
            })
        ));
    }

    #[test]
    fn test_empty_public_key_rejected() {
        assert!(matches!(
            RemoteSigner::new(client(), "0x", CurveType::Ecdsa),
            Err(SignerError::InvalidKey(_))
        ));
        assert!(RemoteSigner::new(client(), "  ", CurveType::Ecdsa).is_err());
    }

    #[test]
    fn test_ecdsa_construction_normalizes_identifier() {
        let signer = RemoteSigner::new(client(), &public_key_hex(), CurveType::Ecdsa).unwrap();
        assert!(!signer.identifier().starts_with("0x"));
        assert!(signer.supports_remote_signing());
        assert_eq!(signer.curve_type(), CurveType::Ecdsa);
        assert_eq!(
            signer.from_address().unwrap(),
            "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
        );
    }
}
