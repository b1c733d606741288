//! Challenge-token authentication for privileged RPC calls.
//!
//! ```text
//! client                                   server
//!   | -- GetChallengeToken(entity) ----------> | ChallengeTokenManager issues token
//!   | <------------- {token, expires_at} ----- |
//!   | sign(signed_message(token, method, payload))
//!   | -- Method(request, auth) --------------> | Verifier consumes token,
//!   |                                          | re-signs and compares
//! ```
//!
//! Tokens are single use and expire. The server signs the same message with
//! its own signer, so the client must hold the key the server is bound to.

pub mod client;
pub mod error;
pub mod token;
pub mod verifier;

pub use client::{AuthenticatedClient, ChallengeToken, ChallengeTokenSource};
pub use error::AuthError;
pub use token::{
    ChallengeTokenEntry, ChallengeTokenManager, DEFAULT_SWEEP_INTERVAL, DEFAULT_TOKEN_EXPIRATION,
};
pub use verifier::{signed_message, AuthSignature, Verifier};
