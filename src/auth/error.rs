//! Error types for challenge-token authentication.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::signer::SignerError;

/// Errors raised while issuing or checking challenge tokens.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid authentication configuration: {0}")]
    InvalidConfiguration(String),

    #[error("entity {entity} is not authorized for this server")]
    UnauthorizedEntity { entity: String },

    #[error("challenge token not found")]
    TokenNotFound,

    #[error("challenge token already used")]
    TokenAlreadyUsed,

    #[error("challenge token expired at {expires_at}")]
    TokenExpired { expires_at: DateTime<Utc> },

    #[error("authentication is required")]
    MissingAuthentication,

    #[error("invalid signature")]
    InvalidSignature,

    #[error("signer failed: {0}")]
    Signer(#[from] SignerError),
}

impl AuthError {
    /// True for local faults, as opposed to a rejected credential.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            AuthError::Signer(_) | AuthError::InvalidConfiguration(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_internal_classification() {
        assert!(!AuthError::TokenAlreadyUsed.is_internal());
        assert!(!AuthError::InvalidSignature.is_internal());
        assert!(AuthError::Signer(SignerError::SigningFailed("hsm offline".into())).is_internal());
    }

    #[test]
    fn test_messages_name_the_cause() {
        assert!(AuthError::TokenAlreadyUsed.to_string().contains("already used"));
        assert!(AuthError::TokenNotFound.to_string().contains("not found"));
        assert!(AuthError::TokenExpired {
            expires_at: Utc::now()
        }
        .to_string()
        .contains("expired"));
    }
}
