//! Chain client for EVM JSON-RPC nodes.

use log::{debug, error, info};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::chain::error::ChainError;
use crate::chain::types::{parse_quantity, LogFilter, RpcLog};
use crate::jsonrpc::JsonRpcClient;

/// Default HTTP timeout for chain RPC calls.
const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(30);

/// Blocks the head may move backwards before it counts as a regression.
const REORG_TOLERANCE: u64 = 2;

/// Chain client bound to a single node.
pub struct ChainClient {
    chain_id: u64,

    rpc: JsonRpcClient,

    /// Highest block seen, for regression checks.
    last_known_block: AtomicU64,
}

impl ChainClient {
    pub fn new(chain_id: u64, rpc_url: &str) -> Result<Self, ChainError> {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_RPC_TIMEOUT)
            .build()
            .map_err(|e| ChainError::ConnectionFailed {
                url: rpc_url.to_string(),
                reason: e.to_string(),
            })?;
        info!("Chain {} RPC at {}", chain_id, rpc_url);

        Ok(Self {
            chain_id,
            rpc: JsonRpcClient::new(http, rpc_url),
            last_known_block: AtomicU64::new(0),
        })
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn rpc_url(&self) -> &str {
        self.rpc.url()
    }

    /// Get the current block number.
    ///
    /// Fails with [`ChainError::BlockRegression`] when the head is more than
    /// a couple of blocks behind the highest block already seen.
    pub async fn block_number(&self) -> Result<u64, ChainError> {
        let raw: String = self.rpc.call("eth_blockNumber", Vec::<()>::new()).await?;
        let current = parse_quantity(&raw)?;
        let last_known = self.last_known_block.load(Ordering::Relaxed);

        if last_known > 0 && current + REORG_TOLERANCE < last_known {
            error!(
                "Chain {} block regression: current {} < last known {}",
                self.chain_id, current, last_known
            );
            return Err(ChainError::BlockRegression {
                current,
                expected: last_known,
            });
        }

        self.last_known_block.fetch_max(current, Ordering::Relaxed);
        debug!("Chain {} head at block {}", self.chain_id, current);
        Ok(current)
    }

    /// Logs emitted by `address` in the inclusive block range.
    pub async fn get_logs(
        &self,
        address: &str,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<RpcLog>, ChainError> {
        let filter = LogFilter::new(address, from_block, to_block);
        Ok(self.rpc.call("eth_getLogs", [filter]).await?)
    }
}

impl std::fmt::Debug for ChainClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainClient")
            .field("chain_id", &self.chain_id)
            .field("rpc_url", &self.rpc.url())
            .field(
                "last_known_block",
                &self.last_known_block.load(Ordering::Relaxed),
            )
            .finish()
    }
}
