//! Types exchanged with chain nodes and the execution manager.

use serde::{Deserialize, Serialize};

use crate::chain::error::ChainError;

/// Operator-set configuration of an AVS as recorded on chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvsConfig {
    /// Lowercase AVS address.
    pub avs_address: String,

    /// Operator set whose members aggregate results.
    pub aggregator_operator_set_id: u32,

    /// Operator sets whose members execute tasks.
    pub executor_operator_set_ids: Vec<u32>,
}

/// Filter for `eth_getLogs`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogFilter {
    pub address: String,
    pub from_block: String,
    pub to_block: String,
}

impl LogFilter {
    pub fn new(address: &str, from_block: u64, to_block: u64) -> Self {
        Self {
            address: address.to_string(),
            from_block: format_quantity(from_block),
            to_block: format_quantity(to_block),
        }
    }
}

/// Log entry as returned by `eth_getLogs`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcLog {
    pub address: String,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub data: String,
    pub block_number: Option<String>,
    pub transaction_hash: Option<String>,
    pub log_index: Option<String>,
    #[serde(default)]
    pub removed: bool,
}

/// Event emitted by a task inbox contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboxEvent {
    pub chain_id: u64,
    pub inbox_address: String,
    pub block_number: u64,
    pub log_index: u64,
    pub transaction_hash: Option<String>,
    pub topics: Vec<String>,
    #[serde(with = "crate::serde_hex")]
    pub data: Vec<u8>,
}

impl InboxEvent {
    /// Decode a mined log. Pending logs (no block number) are rejected.
    pub fn from_log(chain_id: u64, log: RpcLog) -> Result<Self, ChainError> {
        let block_number = log
            .block_number
            .as_deref()
            .ok_or_else(|| ChainError::Decode("log has no block number".to_string()))
            .and_then(parse_quantity)?;
        let log_index = log.log_index.as_deref().map(parse_quantity).transpose()?;
        let data = hex::decode(log.data.trim_start_matches("0x"))
            .map_err(|e| ChainError::Decode(format!("log data: {}", e)))?;

        Ok(Self {
            chain_id,
            inbox_address: log.address.to_ascii_lowercase(),
            block_number,
            log_index: log_index.unwrap_or(0),
            transaction_hash: log.transaction_hash,
            topics: log.topics,
            data,
        })
    }
}

/// Parse an Ethereum hex quantity such as `"0x1b4"`.
pub fn parse_quantity(value: &str) -> Result<u64, ChainError> {
    let digits = value
        .strip_prefix("0x")
        .ok_or_else(|| ChainError::Decode(format!("quantity {:?} lacks 0x prefix", value)))?;
    if digits.is_empty() {
        return Err(ChainError::Decode("empty quantity".to_string()));
    }
    u64::from_str_radix(digits, 16)
        .map_err(|e| ChainError::Decode(format!("quantity {:?}: {}", value, e)))
}

pub fn format_quantity(value: u64) -> String {
    format!("0x{:x}", value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantities() {
        assert_eq!(parse_quantity("0x0").unwrap(), 0);
        assert_eq!(parse_quantity("0x1b4").unwrap(), 436);
        assert!(parse_quantity("1b4").is_err());
        assert!(parse_quantity("0x").is_err());
        assert_eq!(format_quantity(436), "0x1b4");
    }

    #[test]
    fn test_event_from_log() {
        let log: RpcLog = serde_json::from_value(serde_json::json!({
            "address": "0xABCDEF0000000000000000000000000000000001",
            "topics": ["0x01"],
            "data": "0xcafe",
            "blockNumber": "0x10",
            "transactionHash": "0xaa",
            "logIndex": "0x2"
        }))
        .unwrap();

        let event = InboxEvent::from_log(31337, log).unwrap();
        assert_eq!(event.block_number, 16);
        assert_eq!(event.log_index, 2);
        assert_eq!(event.data, vec![0xca, 0xfe]);
        assert_eq!(
            event.inbox_address,
            "0xabcdef0000000000000000000000000000000001"
        );
    }

    #[test]
    fn test_pending_log_rejected() {
        let log: RpcLog = serde_json::from_value(serde_json::json!({
            "address": "0x01",
            "data": "0x"
        }))
        .unwrap();
        assert!(matches!(
            InboxEvent::from_log(1, log),
            Err(ChainError::Decode(_))
        ));
    }

    #[test]
    fn test_log_filter_json() {
        let filter = serde_json::to_value(LogFilter::new("0xabc", 1, 255)).unwrap();
        assert_eq!(filter["fromBlock"], "0x1");
        assert_eq!(filter["toBlock"], "0xff");
    }
}
