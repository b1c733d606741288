//! Client side of the challenge-token protocol.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::auth::verifier::{signed_message, AuthSignature};
use crate::signer::{Signer, SignerError};

/// Token returned by a server's `GetChallengeToken` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeToken {
    pub challenge_token: String,
    pub expires_at: DateTime<Utc>,
}

/// Anything that can hand out challenge tokens, usually an RPC client.
#[async_trait]
pub trait ChallengeTokenSource: Send + Sync {
    type Error: From<SignerError> + Send;

    async fn get_challenge_token(&self, entity: &str) -> Result<ChallengeToken, Self::Error>;
}

/// Signs fresh challenge tokens on behalf of one entity.
#[derive(Clone)]
pub struct AuthenticatedClient {
    signer: Arc<dyn Signer>,
    entity: String,
}

impl AuthenticatedClient {
    pub fn new(signer: Arc<dyn Signer>, entity: impl Into<String>) -> Self {
        Self {
            signer,
            entity: entity.into(),
        }
    }

    /// Use the signer's own address as the entity.
    pub fn from_signer(signer: Arc<dyn Signer>) -> Result<Self, SignerError> {
        let entity = signer.from_address()?;
        Ok(Self::new(signer, entity))
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// Fetch a token from `source` and sign it for `method` and `payload`.
    ///
    /// Every call fetches a new token; tokens are single use.
    pub async fn authenticate<S>(
        &self,
        source: &S,
        method: &str,
        payload: &[u8],
    ) -> Result<AuthSignature, S::Error>
    where
        S: ChallengeTokenSource + ?Sized,
    {
        let token = source.get_challenge_token(&self.entity).await?;
        debug!(
            "Signing challenge token for {} (expires {})",
            method, token.expires_at
        );
        let message = signed_message(&token.challenge_token, method, payload);
        let signature = self.signer.sign_message(&message).await?;
        Ok(AuthSignature {
            challenge_token: token.challenge_token,
            signature,
        })
    }
}

impl std::fmt::Debug for AuthenticatedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticatedClient")
            .field("entity", &self.entity)
            .field("curve", &self.signer.curve_type())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::error::AuthError;
    use crate::auth::token::ChallengeTokenManager;
    use crate::auth::verifier::Verifier;
    use crate::signer::{CurveType, LocalSigner};
    use std::time::Duration;

    const KEY: &str = "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";

    /// Token source backed directly by a verifier.
    struct InProcess<'a>(&'a Verifier);

    #[async_trait]
    impl ChallengeTokenSource for InProcess<'_> {
        type Error = AuthError;

        async fn get_challenge_token(&self, entity: &str) -> Result<ChallengeToken, AuthError> {
            let entry = self.0.generate_challenge_token(entity).await?;
            Ok(ChallengeToken {
                challenge_token: entry.token,
                expires_at: entry.expires_at,
            })
        }
    }

    #[tokio::test]
    async fn test_authenticate_against_verifier() {
        let signer: Arc<dyn Signer> = Arc::new(LocalSigner::from_hex(CurveType::Ecdsa, KEY).unwrap());
        let client = AuthenticatedClient::from_signer(signer.clone()).unwrap();
        let verifier = Verifier::new(
            ChallengeTokenManager::new(client.entity(), Duration::from_secs(60)).unwrap(),
            signer,
        );

        let source = InProcess(&verifier);
        let auth = client
            .authenticate(&source, "RegisterAvs", b"{\"avs\":1}")
            .await
            .unwrap();
        verifier
            .verify_authentication(Some(&auth), "RegisterAvs", b"{\"avs\":1}")
            .await
            .unwrap();

        // A second call gets its own token.
        let again = client
            .authenticate(&source, "RegisterAvs", b"{\"avs\":1}")
            .await
            .unwrap();
        assert_ne!(again.challenge_token, auth.challenge_token);
    }

    #[tokio::test]
    async fn test_wrong_entity_surfaces_source_error() {
        let signer: Arc<dyn Signer> = Arc::new(LocalSigner::from_hex(CurveType::Ecdsa, KEY).unwrap());
        let verifier = Verifier::new(
            ChallengeTokenManager::new("0xdeadbeef", Duration::from_secs(60)).unwrap(),
            signer.clone(),
        );
        let client = AuthenticatedClient::from_signer(signer).unwrap();

        let err = client
            .authenticate(&InProcess(&verifier), "RegisterAvs", b"")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::UnauthorizedEntity { .. }));
    }
}
