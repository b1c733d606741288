//! HTTP RPC surface of the aggregator and executor.
//!
//! Every call is a JSON `POST`. Failures come back as an [`RpcStatus`] body
//! with the HTTP status of its [`RpcCode`].

pub mod aggregator;
pub mod executor;
mod http;
pub mod status;
pub mod types;

pub use aggregator::{aggregator_router, AggregatorClient};
pub use executor::{executor_router, ExecutorClient};
pub use status::{RpcCode, RpcStatus};

use crate::auth::{AuthSignature, Verifier};
use types::AuthenticatedRequest;

/// Shared gate for privileged calls.
///
/// Without a verifier, supplying `auth` is a caller error (`Unimplemented`)
/// and omitting it passes. With one, `auth` must verify for `method` and
/// `payload`.
pub async fn verify_auth(
    verifier: Option<&Verifier>,
    auth: Option<&AuthSignature>,
    method: &str,
    payload: &[u8],
) -> Result<(), RpcStatus> {
    match verifier {
        None if auth.is_some() => Err(RpcStatus::unimplemented("authentication is not enabled")),
        None => Ok(()),
        Some(verifier) => Ok(verifier.verify_authentication(auth, method, payload).await?),
    }
}

/// [`verify_auth`] over a request's own method name and signing payload.
pub async fn verify_request<R>(verifier: Option<&Verifier>, request: &R) -> Result<(), RpcStatus>
where
    R: AuthenticatedRequest + Sync,
{
    let payload = request
        .signing_payload()
        .map_err(|e| RpcStatus::internal(format!("failed to encode request: {}", e)))?;
    verify_auth(verifier, request.auth(), R::METHOD, &payload).await
}

/// Issue a challenge token, or `Unimplemented` without a verifier.
pub async fn issue_challenge_token(
    verifier: Option<&Verifier>,
    entity_address: &str,
) -> Result<types::GetChallengeTokenResponse, RpcStatus> {
    let verifier =
        verifier.ok_or_else(|| RpcStatus::unimplemented("authentication is not enabled"))?;

    let entry = verifier
        .generate_challenge_token(entity_address)
        .await
        .map_err(|e| {
            RpcStatus::invalid_argument(format!("failed to generate challenge token: {}", e))
        })?;

    Ok(types::GetChallengeTokenResponse {
        challenge_token: entry.token,
        expires_at: entry.expires_at,
    })
}
