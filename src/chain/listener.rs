//! Inbox event listeners.

use async_trait::async_trait;
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::chain::client::ChainClient;
use crate::chain::error::ChainError;
use crate::chain::types::InboxEvent;

/// Default delay between polls of the chain head.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Delivers inbox events from one chain.
///
/// Implementations run until `cancel` fires (returning `Ok`) or the queue's
/// receiver is dropped (returning [`ChainError::QueueClosed`]).
#[async_trait]
pub trait ChainListener: Send + Sync {
    fn chain_id(&self) -> u64;

    async fn listen_for_inbox_events(
        &self,
        cancel: CancellationToken,
        queue: mpsc::Sender<InboxEvent>,
        inbox_address: &str,
    ) -> Result<(), ChainError>;
}

/// Listener that polls `eth_blockNumber` and `eth_getLogs`.
///
/// Only blocks after the head observed at start are scanned. RPC failures
/// and head regressions are logged and retried on the next poll.
#[derive(Debug)]
pub struct JsonRpcChainListener {
    client: Arc<ChainClient>,
    poll_interval: Duration,
}

impl JsonRpcChainListener {
    pub fn new(client: Arc<ChainClient>, poll_interval: Duration) -> Self {
        Self {
            client,
            poll_interval,
        }
    }

    /// Scan `from..=head` and forward every log. Returns the next block to scan.
    async fn poll_once(
        &self,
        cancel: &CancellationToken,
        queue: &mpsc::Sender<InboxEvent>,
        inbox_address: &str,
        from_block: u64,
    ) -> Result<u64, ChainError> {
        let head = self.client.block_number().await?;
        if head < from_block {
            return Ok(from_block);
        }

        let logs = self.client.get_logs(inbox_address, from_block, head).await?;
        debug!(
            "Chain {} blocks {}..={}: {} inbox logs",
            self.client.chain_id(),
            from_block,
            head,
            logs.len()
        );

        for log in logs {
            if log.removed {
                continue;
            }
            let event = match InboxEvent::from_log(self.client.chain_id(), log) {
                Ok(event) => event,
                Err(e) => {
                    warn!("Skipping undecodable inbox log: {}", e);
                    continue;
                }
            };
            tokio::select! {
                _ = cancel.cancelled() => return Ok(head + 1),
                sent = queue.send(event) => sent.map_err(|_| ChainError::QueueClosed)?,
            }
        }

        Ok(head + 1)
    }
}

#[async_trait]
impl ChainListener for JsonRpcChainListener {
    fn chain_id(&self) -> u64 {
        self.client.chain_id()
    }

    async fn listen_for_inbox_events(
        &self,
        cancel: CancellationToken,
        queue: mpsc::Sender<InboxEvent>,
        inbox_address: &str,
    ) -> Result<(), ChainError> {
        let chain_id = self.client.chain_id();
        let mut next_block = tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            head = self.client.block_number() => head? + 1,
        };
        info!(
            "Listening for inbox {} events on chain {} from block {}",
            inbox_address, chain_id, next_block
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.poll_interval) => {}
            }

            match self
                .poll_once(&cancel, &queue, inbox_address, next_block)
                .await
            {
                Ok(next) => next_block = next,
                Err(ChainError::QueueClosed) => return Err(ChainError::QueueClosed),
                Err(ChainError::BlockRegression { current, expected }) => {
                    warn!(
                        "Chain {} head went back to {} (seen {}), waiting",
                        chain_id, current, expected
                    );
                }
                Err(e) => warn!("Chain {} poll failed: {}", chain_id, e),
            }
        }

        info!("Stopped listening on chain {}", chain_id);
        Ok(())
    }
}
