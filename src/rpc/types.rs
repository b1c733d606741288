//! Request and response bodies of both services.

use serde::{Deserialize, Serialize};

use crate::aggregator::registry::AvsSummary;
use crate::auth::AuthSignature;

pub use crate::auth::ChallengeToken as GetChallengeTokenResponse;

/// A request whose handler checks an [`AuthSignature`].
///
/// The signed payload is the JSON encoding of the request with `auth`
/// cleared, so the signature covers every other field.
pub trait AuthenticatedRequest: Serialize + Clone {
    /// Method name bound into the signed message.
    const METHOD: &'static str;

    fn auth(&self) -> Option<&AuthSignature>;

    fn set_auth(&mut self, auth: Option<AuthSignature>);

    fn signing_payload(&self) -> Result<Vec<u8>, serde_json::Error> {
        let mut unsigned = self.clone();
        unsigned.set_auth(None);
        serde_json::to_vec(&unsigned)
    }
}

macro_rules! authenticated_request {
    ($ty:ty, $method:literal) => {
        impl AuthenticatedRequest for $ty {
            const METHOD: &'static str = $method;

            fn auth(&self) -> Option<&AuthSignature> {
                self.auth.as_ref()
            }

            fn set_auth(&mut self, auth: Option<AuthSignature>) {
                self.auth = auth;
            }
        }
    };
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetChallengeTokenRequest {
    pub entity_address: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterAvsRequest {
    pub avs_address: String,
    pub chain_ids: Vec<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<AuthSignature>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterAvsResponse {
    pub success: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeRegisterAvsRequest {
    pub avs_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<AuthSignature>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeRegisterAvsResponse {
    pub success: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListAvsResponse {
    pub avs: Vec<AvsSummary>,
}

/// Work submitted to an executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitTaskRequest {
    pub task_id: String,
    pub avs_address: String,
    #[serde(with = "crate::serde_hex")]
    pub payload: Vec<u8>,
}

/// Performer output signed by the operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskResult {
    pub task_id: String,
    pub avs_address: String,
    #[serde(with = "crate::serde_hex")]
    pub output: Vec<u8>,
    pub operator_address: String,
    #[serde(with = "crate::serde_hex")]
    pub signature: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListPerformersRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<AuthSignature>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerformerInfo {
    pub avs_address: String,
    pub endpoint: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListPerformersResponse {
    pub performers: Vec<PerformerInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovePerformerRequest {
    pub avs_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<AuthSignature>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovePerformerResponse {
    pub success: bool,
}

authenticated_request!(RegisterAvsRequest, "RegisterAvs");
authenticated_request!(DeRegisterAvsRequest, "DeRegisterAvs");
authenticated_request!(ListPerformersRequest, "ListPerformers");
authenticated_request!(RemovePerformerRequest, "RemovePerformer");
