//! Server side of the challenge-token protocol.

use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;

use crate::auth::error::AuthError;
use crate::auth::token::{ChallengeTokenEntry, ChallengeTokenManager};
use crate::signer::Signer;

/// Domain tag prefixed to every authentication message.
const AUTH_MESSAGE_DOMAIN: &[u8] = b"hourglass-auth-v1";

/// Proof that the caller holds the server's expected key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSignature {
    pub challenge_token: String,
    #[serde(with = "crate::serde_hex")]
    pub signature: Vec<u8>,
}

/// Build the message signed for an authenticated call.
///
/// Layout: `sha256(domain || len(token) || token || len(method) || method || sha256(payload))`
/// with lengths as big-endian u64, so no two distinct inputs share an encoding.
pub fn signed_message(challenge_token: &str, method: &str, payload: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(AUTH_MESSAGE_DOMAIN);
    for field in [challenge_token.as_bytes(), method.as_bytes()] {
        hasher.update((field.len() as u64).to_be_bytes());
        hasher.update(field);
    }
    hasher.update(Sha256::digest(payload));
    hasher.finalize().into()
}

/// Issues tokens and checks signed tokens against the bound signer.
pub struct Verifier {
    tokens: ChallengeTokenManager,
    signer: Arc<dyn Signer>,
}

impl Verifier {
    pub fn new(tokens: ChallengeTokenManager, signer: Arc<dyn Signer>) -> Self {
        Self { tokens, signer }
    }

    pub fn authorized_entity(&self) -> &str {
        self.tokens.authorized_entity()
    }

    pub fn token_manager(&self) -> &ChallengeTokenManager {
        &self.tokens
    }

    pub async fn generate_challenge_token(
        &self,
        entity: &str,
    ) -> Result<ChallengeTokenEntry, AuthError> {
        self.tokens.generate_challenge_token(entity).await
    }

    /// Consume the token in `auth` and check its signature over
    /// `(token, method, payload)`.
    ///
    /// The token is consumed before the signature is checked, so a failed
    /// attempt cannot be retried with the same token.
    pub async fn verify_authentication(
        &self,
        auth: Option<&AuthSignature>,
        method: &str,
        payload: &[u8],
    ) -> Result<(), AuthError> {
        let auth = auth.ok_or(AuthError::MissingAuthentication)?;

        if let Err(e) = self.tokens.use_challenge_token(&auth.challenge_token).await {
            warn!("Rejected challenge token for {}: {}", method, e);
            return Err(e);
        }

        let message = signed_message(&auth.challenge_token, method, payload);
        let expected = self.signer.sign_message(&message).await.map_err(|e| {
            error!("Failed to compute expected signature for {}: {}", method, e);
            AuthError::Signer(e)
        })?;

        if !constant_time_eq(&expected, &auth.signature) {
            warn!("Invalid signature on authenticated call {}", method);
            return Err(AuthError::InvalidSignature);
        }

        info!("Authenticated call {}", method);
        debug!("Consumed challenge token for {}", self.authorized_entity());
        Ok(())
    }
}

impl std::fmt::Debug for Verifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Verifier")
            .field("tokens", &self.tokens)
            .field("curve", &self.signer.curve_type())
            .finish()
    }
}

/// Length check, then a full pass over the contents.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
