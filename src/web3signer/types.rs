//! Wire types for the remote signing service.

use serde::{Deserialize, Serialize};

/// Discriminator for raw message signing.
pub const RAW_SIGN_TYPE_MESSAGE: &str = "MESSAGE";

/// Path of the raw signing endpoint, relative to the base URL.
pub fn raw_sign_path(identifier: &str) -> String {
    format!("/api/v1/eth1/sign/{}", identifier)
}

/// Body of `POST /api/v1/eth1/sign/{identifier}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RawSignRequest {
    #[serde(rename = "type")]
    pub kind: String,
    /// `0x`-prefixed hex payload.
    pub data: String,
}

impl RawSignRequest {
    pub fn message(data: &[u8]) -> Self {
        Self {
            kind: RAW_SIGN_TYPE_MESSAGE.to_string(),
            data: format!("0x{}", hex::encode(data)),
        }
    }
}

/// Transaction accepted by `eth_signTransaction`. Quantities are hex strings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    pub from: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
}

/// Strip whitespace and surrounding quotes from a bare signature body.
pub fn normalize_signature_body(body: &str) -> &str {
    body.trim().trim_matches('"').trim()
}
