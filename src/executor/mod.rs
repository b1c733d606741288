//! Executor service: runs tasks through per-AVS performers and signs the
//! results with the operator's key.

pub mod error;
pub mod performer;

use log::{info, warn};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::auth::{AuthSignature, Verifier};
use crate::rpc::types::{
    GetChallengeTokenRequest, GetChallengeTokenResponse, ListPerformersRequest,
    ListPerformersResponse, PerformerInfo, RemovePerformerRequest, RemovePerformerResponse,
    SubmitTaskRequest, TaskResult,
};
use crate::rpc::{self, RpcStatus};
use crate::signer::{keccak256, Signer};

pub use error::ExecutorError;
pub use performer::{HttpPerformer, PerformResponse, Performer, DEFAULT_PERFORMER_TIMEOUT};

/// Digest signed for a task result:
/// `keccak256(task_id || avs_address (20 bytes) || output)`.
pub fn task_result_digest(
    task_id: &str,
    avs_address: &str,
    output: &[u8],
) -> Result<[u8; 32], ExecutorError> {
    let address = hex::decode(avs_address.trim_start_matches("0x"))
        .ok()
        .filter(|bytes| bytes.len() == 20)
        .ok_or_else(|| {
            ExecutorError::InvalidTask(format!("{} is not a 20-byte address", avs_address))
        })?;

    let mut message = Vec::with_capacity(task_id.len() + address.len() + output.len());
    message.extend_from_slice(task_id.as_bytes());
    message.extend_from_slice(&address);
    message.extend_from_slice(output);
    Ok(keccak256(&message))
}

/// Executor service state shared by every RPC handler.
pub struct Executor {
    signer: Arc<dyn Signer>,
    operator_address: String,
    performers: RwLock<HashMap<String, Arc<dyn Performer>>>,
    verifier: Option<Verifier>,
}

impl Executor {
    pub fn new(signer: Arc<dyn Signer>, operator_address: &str, verifier: Option<Verifier>) -> Self {
        let operator_address = operator_address.trim().to_ascii_lowercase();
        info!(
            "Executor for operator {} created (authentication {})",
            operator_address,
            if verifier.is_some() { "enabled" } else { "disabled" }
        );
        Self {
            signer,
            operator_address,
            performers: RwLock::new(HashMap::new()),
            verifier,
        }
    }

    pub fn operator_address(&self) -> &str {
        &self.operator_address
    }

    pub fn auth_enabled(&self) -> bool {
        self.verifier.is_some()
    }

    /// Route tasks for `avs_address` to `performer`, replacing any previous one.
    pub async fn add_performer(&self, avs_address: &str, performer: Arc<dyn Performer>) {
        let key = avs_address.trim().to_ascii_lowercase();
        info!("Performer for AVS {} at {}", key, performer.endpoint());
        self.performers.write().await.insert(key, performer);
    }

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

    /// Run `task` and return its output signed for on-chain verification.
    pub async fn submit_task(&self, task: SubmitTaskRequest) -> Result<TaskResult, RpcStatus> {
        if task.task_id.is_empty() {
            return Err(RpcStatus::invalid_argument("task_id must not be empty"));
        }
        let avs_address = task.avs_address.trim().to_ascii_lowercase();

        let performer = self
            .performers
            .read()
            .await
            .get(&avs_address)
            .cloned()
            .ok_or_else(|| {
                RpcStatus::not_found(ExecutorError::PerformerNotFound(avs_address.clone()).to_string())
            })?;

        let output = performer.perform(&task).await.map_err(|e| {
            warn!("Task {} failed on {}: {}", task.task_id, performer.endpoint(), e);
            RpcStatus::unavailable(format!("task {} failed: {}", task.task_id, e))
        })?;

        let digest = task_result_digest(&task.task_id, &avs_address, &output)
            .map_err(|e| RpcStatus::invalid_argument(e.to_string()))?;
        let signature = self
            .signer
            .sign_message_for_solidity(&digest)
            .await
            .map_err(|e| RpcStatus::internal(ExecutorError::Signer(e).to_string()))?;

        info!("Task {} for AVS {} completed", task.task_id, avs_address);
        Ok(TaskResult {
            task_id: task.task_id,
            avs_address,
            output,
            operator_address: self.operator_address.clone(),
            signature,
        })
    }

    pub async fn list_performers(
        &self,
        request: ListPerformersRequest,
    ) -> Result<ListPerformersResponse, RpcStatus> {
        rpc::verify_request(self.verifier.as_ref(), &request).await?;

        let performers = self.performers.read().await;
        let mut listed: Vec<PerformerInfo> = performers
            .iter()
            .map(|(avs_address, performer)| PerformerInfo {
                avs_address: avs_address.clone(),
                endpoint: performer.endpoint().to_string(),
            })
            .collect();
        drop(performers);
        listed.sort_by(|a, b| a.avs_address.cmp(&b.avs_address));

        Ok(ListPerformersResponse { performers: listed })
    }

    pub async fn remove_performer(
        &self,
        request: RemovePerformerRequest,
    ) -> Result<RemovePerformerResponse, RpcStatus> {
        rpc::verify_request(self.verifier.as_ref(), &request).await?;

        let key = request.avs_address.trim().to_ascii_lowercase();
        if self.performers.write().await.remove(&key).is_none() {
            return Err(RpcStatus::not_found(
                ExecutorError::PerformerNotFound(key).to_string(),
            ));
        }
        info!("Removed performer for AVS {}", key);
        Ok(RemovePerformerResponse { success: true })
    }
}

impl std::fmt::Debug for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("operator_address", &self.operator_address)
            .field("curve", &self.signer.curve_type())
            .field("auth_enabled", &self.verifier.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::RpcCode;
    use crate::signer::{CurveType, EcdsaPublicKey, LocalSigner};
    use async_trait::async_trait;

    const KEY: &str = "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";
    const OPERATOR: &str = "0x70997970c51812dc3a010c7d01b50e0d17dc79c8";
    const AVS: &str = "0x00000000000000000000000000000000000000a5";

    struct Echo;

    #[async_trait]
    impl Performer for Echo {
        fn endpoint(&self) -> &str {
            "memory://echo"
        }

        async fn perform(&self, task: &SubmitTaskRequest) -> Result<Vec<u8>, ExecutorError> {
            Ok(task.payload.iter().rev().copied().collect())
        }
    }

    fn executor() -> (Executor, Arc<LocalSigner>) {
        let signer = Arc::new(LocalSigner::from_hex(CurveType::Ecdsa, KEY).unwrap());
        (Executor::new(signer.clone(), OPERATOR, None), signer)
    }

    #[test]
    fn test_task_result_digest() {
        let a = task_result_digest("1", AVS, b"out").unwrap();
        let upper = AVS.to_uppercase().replace("0X", "0x");
        assert_eq!(a, task_result_digest("1", &upper, b"out").unwrap());
        assert_ne!(a, task_result_digest("2", AVS, b"out").unwrap());
        assert!(matches!(
            task_result_digest("1", "0x1234", b""),
            Err(ExecutorError::InvalidTask(_))
        ));
    }

    #[tokio::test]
    async fn test_submit_task_signs_result() {
        let (executor, signer) = executor();
        executor.add_performer(AVS, Arc::new(Echo)).await;

        let result = executor
            .submit_task(SubmitTaskRequest {
                task_id: "task-1".to_string(),
                avs_address: AVS.to_string(),
                payload: vec![1, 2, 3],
            })
            .await
            .unwrap();

        assert_eq!(result.output, vec![3, 2, 1]);
        assert_eq!(result.operator_address, OPERATOR);

        let digest = task_result_digest("task-1", AVS, &result.output).unwrap();
        assert!(signer.verify(&digest, &result.signature));

        let public = EcdsaPublicKey::from_bytes(&signer.public_key().unwrap()).unwrap();
        assert_eq!(public.address(), OPERATOR);
    }

    #[tokio::test]
    async fn test_submit_task_unknown_avs() {
        let (executor, _) = executor();
        let err = executor
            .submit_task(SubmitTaskRequest {
                task_id: "task-1".to_string(),
                avs_address: AVS.to_string(),
                payload: Vec::new(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.code, RpcCode::NotFound);
    }

    #[tokio::test]
    async fn test_performer_administration() {
        let (executor, _) = executor();
        executor.add_performer(AVS, Arc::new(Echo)).await;

        let listed = executor
            .list_performers(ListPerformersRequest::default())
            .await
            .unwrap();
        assert_eq!(listed.performers.len(), 1);
        assert_eq!(listed.performers[0].endpoint, "memory://echo");

        executor
            .remove_performer(RemovePerformerRequest {
                avs_address: AVS.to_uppercase().replace("0X", "0x"),
                auth: None,
            })
            .await
            .unwrap();
        let err = executor
            .remove_performer(RemovePerformerRequest {
                avs_address: AVS.to_string(),
                auth: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err.code, RpcCode::NotFound);
    }

    #[tokio::test]
    async fn test_disabled_auth_rejects_credentials() {
        let (executor, _) = executor();
        let err = executor
            .list_performers(ListPerformersRequest {
                auth: Some(AuthSignature {
                    challenge_token: "t".to_string(),
                    signature: vec![1],
                }),
            })
            .await
            .unwrap_err();
        assert_eq!(err.code, RpcCode::Unimplemented);
    }
}
