//! Aggregator management service.
//!
//! Operators register and deregister AVSs here. Mutating calls go through
//! [`Aggregator::verify_auth`] before they touch the [`AvsRegistry`].

pub mod execution;
pub mod registry;

use log::{info, warn};

use crate::auth::{AuthSignature, Verifier};
use crate::rpc::types::{
    DeRegisterAvsRequest, DeRegisterAvsResponse, GetChallengeTokenRequest,
    GetChallengeTokenResponse, ListAvsResponse, RegisterAvsRequest, RegisterAvsResponse,
};
use crate::rpc::{self, RpcCode, RpcStatus};

pub use execution::{
    AvsExecutionManager, ChainExecutionManager, ChainExecutionManagerFactory, ChainTarget,
    ExecutionError, ExecutionManagerFactory,
};
pub use registry::{AvsExecutionManagerInfo, AvsRegistry, AvsSummary, CancelHandle, RegistryError};

/// Aggregator service state shared by every RPC handler.
#[derive(Debug)]
pub struct Aggregator {
    registry: AvsRegistry,
    verifier: Option<Verifier>,
}

impl Aggregator {
    /// Build the service. Authentication is enabled iff `verifier` is set.
    pub fn new(registry: AvsRegistry, verifier: Option<Verifier>) -> Self {
        info!(
            "Aggregator management service created (authentication {})",
            if verifier.is_some() { "enabled" } else { "disabled" }
        );
        Self { registry, verifier }
    }

    pub fn auth_enabled(&self) -> bool {
        self.verifier.is_some()
    }

    pub fn registry(&self) -> &AvsRegistry {
        &self.registry
    }

    /// Gate for privileged calls.
    ///
    /// With authentication disabled, supplying `auth` is a caller error
    /// (`Unimplemented`). With it enabled, `auth` must verify.
    pub async fn verify_auth(
        &self,
        auth: Option<&AuthSignature>,
        method: &str,
        payload: &[u8],
    ) -> Result<(), RpcStatus> {
        rpc::verify_auth(self.verifier.as_ref(), auth, method, payload).await
    }

    pub async fn get_challenge_token(
        &self,
        request: GetChallengeTokenRequest,
    ) -> Result<GetChallengeTokenResponse, RpcStatus> {
        rpc::issue_challenge_token(self.verifier.as_ref(), &request.entity_address).await
    }

    pub async fn register_avs(
        &self,
        request: RegisterAvsRequest,
    ) -> Result<RegisterAvsResponse, RpcStatus> {
        rpc::verify_request(self.verifier.as_ref(), &request).await?;

        self.registry
            .register(&request.avs_address, &request.chain_ids)
            .await
            .map_err(|e| {
                warn!("RegisterAvs {} failed: {}", request.avs_address, e);
                registry_status(e)
            })?;
        Ok(RegisterAvsResponse { success: true })
    }

    pub async fn deregister_avs(
        &self,
        request: DeRegisterAvsRequest,
    ) -> Result<DeRegisterAvsResponse, RpcStatus> {
        rpc::verify_request(self.verifier.as_ref(), &request).await?;

        self.registry
            .deregister(&request.avs_address)
            .await
            .map_err(|e| {
                warn!("DeRegisterAvs {} failed: {}", request.avs_address, e);
                registry_status(e)
            })?;
        Ok(DeRegisterAvsResponse { success: true })
    }

    pub async fn list_avs(&self) -> ListAvsResponse {
        ListAvsResponse {
            avs: self.registry.list().await,
        }
    }

    /// Stop every execution manager.
    pub async fn shutdown(&self) {
        self.registry.shutdown().await;
    }
}

fn registry_status(err: RegistryError) -> RpcStatus {
    let code = match &err {
        RegistryError::InvalidAddress => RpcCode::InvalidArgument,
        RegistryError::AlreadyRegistered(_) => RpcCode::AlreadyExists,
        RegistryError::Execution {
            source: ExecutionError::UnsupportedChain { .. } | ExecutionError::NoChains(_),
            ..
        } => RpcCode::InvalidArgument,
        RegistryError::ShutDown => RpcCode::Unavailable,
        RegistryError::NotRegistered(_)
        | RegistryError::Execution { .. }
        | RegistryError::Aborted(_) => RpcCode::Internal,
    };
    RpcStatus::new(code, err.to_string())
}
