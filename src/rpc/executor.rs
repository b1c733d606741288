//! HTTP routes and client for the executor service.

use async_trait::async_trait;
use axum::{extract::State, routing::post, Json, Router};
use std::sync::Arc;

use crate::auth::{AuthenticatedClient, ChallengeTokenSource};
use crate::executor::Executor;
use crate::rpc::http::{sign_request, RpcHttpClient};
use crate::rpc::status::RpcStatus;
use crate::rpc::types::{
    GetChallengeTokenRequest, GetChallengeTokenResponse, ListPerformersRequest,
    ListPerformersResponse, RemovePerformerRequest, RemovePerformerResponse, SubmitTaskRequest,
    TaskResult,
};

pub const GET_CHALLENGE_TOKEN_PATH: &str = "/executor/v1/challenge-token";
pub const SUBMIT_TASK_PATH: &str = "/executor/v1/submit-task";
pub const LIST_PERFORMERS_PATH: &str = "/executor/v1/list-performers";
pub const REMOVE_PERFORMER_PATH: &str = "/executor/v1/remove-performer";

pub fn executor_router(executor: Arc<Executor>) -> Router {
    Router::new()
        .route(GET_CHALLENGE_TOKEN_PATH, post(get_challenge_token))
        .route(SUBMIT_TASK_PATH, post(submit_task))
        .route(LIST_PERFORMERS_PATH, post(list_performers))
        .route(REMOVE_PERFORMER_PATH, post(remove_performer))
        .with_state(executor)
}

/// POST /executor/v1/challenge-token
async fn get_challenge_token(
    State(executor): State<Arc<Executor>>,
    Json(request): Json<GetChallengeTokenRequest>,
) -> Result<Json<GetChallengeTokenResponse>, RpcStatus> {
    executor.get_challenge_token(request).await.map(Json)
}

/// POST /executor/v1/submit-task
async fn submit_task(
    State(executor): State<Arc<Executor>>,
    Json(request): Json<SubmitTaskRequest>,
) -> Result<Json<TaskResult>, RpcStatus> {
    executor.submit_task(request).await.map(Json)
}

/// POST /executor/v1/list-performers
async fn list_performers(
    State(executor): State<Arc<Executor>>,
    Json(request): Json<ListPerformersRequest>,
) -> Result<Json<ListPerformersResponse>, RpcStatus> {
    executor.list_performers(request).await.map(Json)
}

/// POST /executor/v1/remove-performer
async fn remove_performer(
    State(executor): State<Arc<Executor>>,
    Json(request): Json<RemovePerformerRequest>,
) -> Result<Json<RemovePerformerResponse>, RpcStatus> {
    executor.remove_performer(request).await.map(Json)
}

/// Client for the executor service.
#[derive(Debug, Clone)]
pub struct ExecutorClient {
    transport: RpcHttpClient,
    auth: Option<AuthenticatedClient>,
}

impl ExecutorClient {
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

    pub async fn submit_task(&self, task: &SubmitTaskRequest) -> Result<TaskResult, RpcStatus> {
        self.transport.post(SUBMIT_TASK_PATH, task).await
    }

    pub async fn list_performers(&self) -> Result<ListPerformersResponse, RpcStatus> {
        let mut request = ListPerformersRequest::default();
        sign_request(self.auth.as_ref(), self, &mut request).await?;
        self.transport.post(LIST_PERFORMERS_PATH, &request).await
    }

    pub async fn remove_performer(
        &self,
        avs_address: &str,
    ) -> Result<RemovePerformerResponse, RpcStatus> {
        let mut request = RemovePerformerRequest {
            avs_address: avs_address.to_string(),
            auth: None,
        };
        sign_request(self.auth.as_ref(), self, &mut request).await?;
        self.transport.post(REMOVE_PERFORMER_PATH, &request).await
    }
}

#[async_trait]
impl ChallengeTokenSource for ExecutorClient {
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
