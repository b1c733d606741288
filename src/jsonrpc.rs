//! Minimal JSON-RPC 2.0 client over HTTP.
//!
//! Shared by the remote signing client and the chain listener. Every request
//! carries a monotonically increasing id; a non-2xx status or a populated
//! `error` object is surfaced with its numeric code intact.

use log::debug;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

/// JSON-RPC protocol version carried by every request.
pub const JSONRPC_VERSION: &str = "2.0";

/// Outgoing request envelope.
#[derive(Debug, Serialize)]
pub struct JsonRpcRequest<'a, P> {
    pub jsonrpc: &'static str,
    pub method: &'a str,
    pub params: P,
    pub id: u64,
}

/// Error object returned by the server.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JsonRpcErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// Incoming response envelope.
#[derive(Debug, Deserialize)]
pub struct JsonRpcResponse<R> {
    pub result: Option<R>,
    pub error: Option<JsonRpcErrorObject>,
    #[serde(default)]
    pub id: serde_json::Value,
}

/// Errors from a JSON-RPC exchange.
#[derive(Debug, Error)]
pub enum JsonRpcError {
    #[error("HTTP {status} from {method}: {body}")]
    Http {
        method: String,
        status: u16,
        body: String,
    },

    #[error("JSON-RPC error {code} from {method}: {message}")]
    Rpc {
        method: String,
        code: i64,
        message: String,
    },

    #[error("Request {method} failed: {source}")]
    Transport {
        method: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Invalid response to {method}: {reason}")]
    Decode { method: String, reason: String },
}

impl JsonRpcError {
    /// The HTTP status or JSON-RPC error code, when the server supplied one.
    pub fn code(&self) -> Option<i64> {
        match self {
            JsonRpcError::Http { status, .. } => Some(i64::from(*status)),
            JsonRpcError::Rpc { code, .. } => Some(*code),
            JsonRpcError::Transport { source, .. } => {
                source.status().map(|s| i64::from(s.as_u16()))
            }
            JsonRpcError::Decode { .. } => None,
        }
    }

    /// Whether the request was abandoned because the client timeout elapsed.
    pub fn is_timeout(&self) -> bool {
        matches!(self, JsonRpcError::Transport { source, .. } if source.is_timeout())
    }
}

/// JSON-RPC client bound to a single endpoint.
pub struct JsonRpcClient {
    http: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

impl JsonRpcClient {
    pub fn new(http: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Invoke `method` and decode its `result`.
    pub async fn call<P, R>(&self, method: &str, params: P) -> Result<R, JsonRpcError>
    where
        P: Serialize + Send,
        R: DeserializeOwned,
    {
        let request = JsonRpcRequest {
            jsonrpc: JSONRPC_VERSION,
            method,
            params,
            id: self.next_id(),
        };
        debug!("JSON-RPC {} id={} -> {}", method, request.id, self.url);

        let response = self
            .http
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|source| JsonRpcError::Transport {
                method: method.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(JsonRpcError::Http {
                method: method.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let envelope: JsonRpcResponse<R> =
            response.json().await.map_err(|e| JsonRpcError::Decode {
                method: method.to_string(),
                reason: e.to_string(),
            })?;

        if let Some(error) = envelope.error {
            return Err(JsonRpcError::Rpc {
                method: method.to_string(),
                code: error.code,
                message: error.message,
            });
        }

        envelope.result.ok_or_else(|| JsonRpcError::Decode {
            method: method.to_string(),
            reason: "response carries neither result nor error".to_string(),
        })
    }
}

impl std::fmt::Debug for JsonRpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonRpcClient")
            .field("url", &self.url)
            .field("next_id", &self.next_id.load(Ordering::Relaxed))
            .finish()
    }
}
