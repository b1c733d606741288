//! JSON-over-HTTP transport shared by the service clients.

use log::debug;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::auth::{AuthenticatedClient, ChallengeTokenSource};
use crate::rpc::status::{RpcCode, RpcStatus};
use crate::rpc::types::AuthenticatedRequest;

#[derive(Debug, Clone)]
pub(crate) struct RpcHttpClient {
    http: reqwest::Client,
    base_url: String,
}

impl RpcHttpClient {
    pub(crate) fn new(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub(crate) fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) async fn post<Req, Resp>(&self, path: &str, body: &Req) -> Result<Resp, RpcStatus>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!("POST {}", url);
        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| RpcStatus::unavailable(format!("request to {} failed: {}", url, e)))?;
        decode(response).await
    }

    pub(crate) async fn get<Resp>(&self, path: &str) -> Result<Resp, RpcStatus>
    where
        Resp: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| RpcStatus::unavailable(format!("request to {} failed: {}", url, e)))?;
        decode(response).await
    }
}

/// Attach a fresh signature to `request` when `auth` is configured.
pub(crate) async fn sign_request<R, S>(
    auth: Option<&AuthenticatedClient>,
    source: &S,
    request: &mut R,
) -> Result<(), RpcStatus>
where
    R: AuthenticatedRequest,
    S: ChallengeTokenSource<Error = RpcStatus> + ?Sized,
{
    let Some(auth) = auth else {
        return Ok(());
    };
    request.set_auth(None);
    let payload = request
        .signing_payload()
        .map_err(|e| RpcStatus::internal(format!("failed to encode request: {}", e)))?;
    let signature = auth.authenticate(source, R::METHOD, &payload).await?;
    request.set_auth(Some(signature));
    Ok(())
}

async fn decode<Resp: DeserializeOwned>(response: reqwest::Response) -> Result<Resp, RpcStatus> {
    let status = response.status();
    if status.is_success() {
        return response
            .json()
            .await
            .map_err(|e| RpcStatus::internal(format!("invalid response body: {}", e)));
    }

    let code = RpcCode::from_http_status(status.as_u16());
    let body = response.text().await.map_err(|e| RpcStatus {
        code,
        message: format!("HTTP {} with unreadable body: {}", status, e),
    })?;
    Err(serde_json::from_str::<RpcStatus>(&body).unwrap_or(RpcStatus {
        code,
        message: body,
    }))
}
