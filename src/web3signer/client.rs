//! HTTP client for a Web3Signer-compatible remote signing service.
//!
//! Account listing and transaction/typed-data signing go over JSON-RPC;
//! raw message signing uses the REST endpoint. Both share one `reqwest`
//! client so TLS settings and the timeout apply uniformly.

use log::{debug, info, warn};
use serde_json::json;

use crate::jsonrpc::JsonRpcClient;
use crate::web3signer::error::Web3SignerError;
use crate::web3signer::tls::Web3SignerConfig;
use crate::web3signer::types::{
    normalize_signature_body, raw_sign_path, RawSignRequest, TransactionRequest,
};

/// Client for the remote signing service.
pub struct Web3SignerClient {
    http: reqwest::Client,
    base_url: String,
    rpc: JsonRpcClient,
}

impl Web3SignerClient {
    /// Build a client. Configuration and TLS material are checked here so a
    /// bad setup fails at startup rather than on the first signature.
    pub fn new(config: &Web3SignerConfig) -> Result<Self, Web3SignerError> {
        config.validate()?;

        let mut builder = reqwest::Client::builder().timeout(config.timeout);

        if config.is_https() {
            let tls = config.tls.load()?;

            if let Some(ca_pem) = tls.ca_certs {
                let certs = reqwest::Certificate::from_pem_bundle(&ca_pem).map_err(|e| {
                    Web3SignerError::Config(format!("invalid CA certificate: {}", e))
                })?;
                for cert in certs {
                    builder = builder.add_root_certificate(cert);
                }
            }

            if let Some((cert_pem, key_pem)) = tls.identity {
                let identity =
                    reqwest::Identity::from_pkcs8_pem(&cert_pem, &key_pem).map_err(|e| {
                        Web3SignerError::Config(format!("invalid client identity: {}", e))
                    })?;
                builder = builder.identity(identity);
                info!("Mutual TLS enabled for remote signer {}", config.base_url);
            }

            if tls.insecure_skip_verify {
                warn!(
                    "TLS certificate verification DISABLED for remote signer {}",
                    config.base_url
                );
                builder = builder.danger_accept_invalid_certs(true);
            }
        }

        let http = builder
            .build()
            .map_err(|e| Web3SignerError::Config(format!("failed to build HTTP client: {}", e)))?;

        let base_url = config.base_url.trim_end_matches('/').to_string();
        let rpc = JsonRpcClient::new(http.clone(), base_url.clone());

        Ok(Self {
            http,
            base_url,
            rpc,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `eth_accounts`: addresses the service can sign for.
    pub async fn eth_accounts(&self) -> Result<Vec<String>, Web3SignerError> {
        Ok(self.rpc.call("eth_accounts", json!([])).await?)
    }

    /// `eth_sign`: sign `data` with `account`, returning the hex signature.
    pub async fn eth_sign(&self, account: &str, data: &[u8]) -> Result<String, Web3SignerError> {
        let params = json!([account, format!("0x{}", hex::encode(data))]);
        Ok(self.rpc.call("eth_sign", params).await?)
    }

    /// `eth_signTransaction`: returns the RLP-encoded signed transaction.
    pub async fn eth_sign_transaction(
        &self,
        tx: &TransactionRequest,
    ) -> Result<String, Web3SignerError> {
        Ok(self.rpc.call("eth_signTransaction", json!([tx])).await?)
    }

    /// `eth_signTypedData`: EIP-712 signing.
    pub async fn eth_sign_typed_data(
        &self,
        account: &str,
        typed_data: &serde_json::Value,
    ) -> Result<String, Web3SignerError> {
        Ok(self
            .rpc
            .call("eth_signTypedData", json!([account, typed_data]))
            .await?)
    }

    /// Raw message signing through the REST API. Returns signature bytes.
    pub async fn sign_raw(
        &self,
        identifier: &str,
        data: &[u8],
    ) -> Result<Vec<u8>, Web3SignerError> {
        let path = raw_sign_path(identifier);
        let url = format!("{}{}", self.base_url, path);
        debug!("Raw sign request for {} ({} bytes)", identifier, data.len());

        let response = self
            .http
            .post(&url)
            .json(&RawSignRequest::message(data))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(Web3SignerError::Http {
                path,
                status: status.as_u16(),
                body,
            });
        }

        let signature = normalize_signature_body(&body);
        hex::decode(signature.trim_start_matches("0x"))
            .map_err(|e| Web3SignerError::InvalidResponse(format!("signature is not hex: {}", e)))
    }

    /// `GET /upcheck` liveness probe.
    pub async fn upcheck(&self) -> Result<(), Web3SignerError> {
        let path = "/upcheck".to_string();
        let response = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Web3SignerError::Http {
                path,
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

impl std::fmt::Debug for Web3SignerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Web3SignerClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}
