//! HTTP routes and client for the aggregator management service.

use async_trait::async_trait;
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;

use crate::aggregator::Aggregator;
use crate::auth::{AuthenticatedClient, ChallengeTokenSource};
use crate::rpc::http::{sign_request, RpcHttpClient};
use crate::rpc::status::RpcStatus;
use crate::rpc::types::{
    DeRegisterAvsRequest, DeRegisterAvsResponse, GetChallengeTokenRequest,
    GetChallengeTokenResponse, ListAvsResponse, RegisterAvsRequest, RegisterAvsResponse,
};

pub const GET_CHALLENGE_TOKEN_PATH: &str = "/aggregator/v1/challenge-token";
pub const REGISTER_AVS_PATH: &str = "/aggregator/v1/register-avs";
pub const DEREGISTER_AVS_PATH: &str = "/aggregator/v1/deregister-avs";
pub const LIST_AVS_PATH: &str = "/aggregator/v1/avs";

pub fn aggregator_router(aggregator: Arc<Aggregator>) -> Router {
    Router::new()
        .route(GET_CHALLENGE_TOKEN_PATH, post(get_challenge_token))
        .route(REGISTER_AVS_PATH, post(register_avs))
        .route(DEREGISTER_AVS_PATH, post(deregister_avs))
        .route(LIST_AVS_PATH, get(list_avs))
        .with_state(aggregator)
}

/// POST /aggregator/v1/challenge-token
async fn get_challenge_token(
    State(aggregator): State<Arc<Aggregator>>,
    Json(request): Json<GetChallengeTokenRequest>,
) -> Result<Json<GetChallengeTokenResponse>, RpcStatus> {
    aggregator.get_challenge_token(request).await.map(Json)
}

/// POST /aggregator/v1/register-avs
async fn register_avs(
    State(aggregator): State<Arc<Aggregator>>,
    Json(request): Json<RegisterAvsRequest>,
) -> Result<Json<RegisterAvsResponse>, RpcStatus> {
    aggregator.register_avs(request).await.map(Json)
}

/// POST /aggregator/v1/deregister-avs
async fn deregister_avs(
    State(aggregator): State<Arc<Aggregator>>,
    Json(request): Json<DeRegisterAvsRequest>,
) -> Result<Json<DeRegisterAvsResponse>, RpcStatus> {
    aggregator.deregister_avs(request).await.map(Json)
}

/// GET /aggregator/v1/avs
async fn list_avs(State(aggregator): State<Arc<Aggregator>>) -> Json<ListAvsResponse> {
    Json(aggregator.list_avs().await)
}

/// Client for the aggregator management service.
///
/// With an [`AuthenticatedClient`] attached, every privileged call first
/// fetches and signs a challenge token.
#[derive(Debug, Clone)]
pub struct AggregatorClient {
    transport: RpcHttpClient,
    auth: Option<AuthenticatedClient>,
}

impl AggregatorClient {
    pub fn new(base_url: &str) -> Self {
        Self::with_http(reqwest::Client::new(), base_url)
    }

    pub fn with_http(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            transport: RpcHttpClient::new(http, base_url),
            auth: None,
        }
    }

    pub fn with_auth(mut self, auth: AuthenticatedClient) -> Self {
        self.auth = Some(auth);
        self
    }

    pub fn base_url(&self) -> &str {
        self.transport.base_url()
    }

    pub async fn register_avs(
        &self,
        avs_address: &str,
        chain_ids: &[u64],
    ) -> Result<RegisterAvsResponse, RpcStatus> {
        let mut request = RegisterAvsRequest {
            avs_address: avs_address.to_string(),
            chain_ids: chain_ids.to_vec(),
            auth: None,
        };
        sign_request(self.auth.as_ref(), self, &mut request).await?;
        self.register_avs_raw(&request).await
    }

    /// Send `request` as is, including whatever `auth` it carries.
    pub async fn register_avs_raw(
        &self,
        request: &RegisterAvsRequest,
    ) -> Result<RegisterAvsResponse, RpcStatus> {
        self.transport.post(REGISTER_AVS_PATH, request).await
    }

    pub async fn deregister_avs(&self, avs_address: &str) -> Result<DeRegisterAvsResponse, RpcStatus> {
        let mut request = DeRegisterAvsRequest {
            avs_address: avs_address.to_string(),
            auth: None,
        };
        sign_request(self.auth.as_ref(), self, &mut request).await?;
        self.deregister_avs_raw(&request).await
    }

    /// Send `request` as is, including whatever `auth` it carries.
    pub async fn deregister_avs_raw(
        &self,
        request: &DeRegisterAvsRequest,
    ) -> Result<DeRegisterAvsResponse, RpcStatus> {
        self.transport.post(DEREGISTER_AVS_PATH, request).await
    }

    pub async fn list_avs(&self) -> Result<ListAvsResponse, RpcStatus> {
        self.transport.get(LIST_AVS_PATH).await
    }
}

#[async_trait]
impl ChallengeTokenSource for AggregatorClient {
    type Error = RpcStatus;

    async fn get_challenge_token(
        &self,
        entity: &str,
    ) -> Result<GetChallengeTokenResponse, RpcStatus> {
        let request = GetChallengeTokenRequest {
            entity_address: entity.to_string(),
        };
        self.transport.post(GET_CHALLENGE_TOKEN_PATH, &request).await
    }
}
