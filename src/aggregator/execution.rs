//! Per-AVS execution managers.
//!
//! An execution manager is built when an AVS registers, initialized outside
//! the registry lock, then run until its cancellation token fires.

use async_trait::async_trait;
use log::{debug, error, info, warn};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::chain::{AvsConfig, ChainError, ChainListener, ContractCaller, InboxEvent};

/// Capacity of the queue between chain listeners and the manager.
pub const DEFAULT_EVENT_QUEUE_CAPACITY: usize = 1024;

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("Chain error: {0}")]
    Chain(#[from] ChainError),

    #[error("AVS {avs_address} requested chain {chain_id}, which is not configured")]
    UnsupportedChain { avs_address: String, chain_id: u64 },

    #[error("AVS {0} must name at least one chain")]
    NoChains(String),

    #[error("Execution manager for AVS {0} was not initialized")]
    NotInitialized(String),
}

/// Long-running task serving one AVS.
#[async_trait]
pub trait AvsExecutionManager: Send + Sync {
    fn avs_address(&self) -> &str;

    fn chain_ids(&self) -> Vec<u64>;

    /// One-time setup. May perform I/O.
    async fn initialize(&self) -> Result<(), ExecutionError>;

    /// Process work until `cancel` fires.
    async fn run(&self, cancel: CancellationToken) -> Result<(), ExecutionError>;
}

/// Builds execution managers for newly registered AVSs.
pub trait ExecutionManagerFactory: Send + Sync {
    fn create(
        &self,
        avs_address: &str,
        chain_ids: &[u64],
    ) -> Result<Arc<dyn AvsExecutionManager>, ExecutionError>;
}

/// A chain the aggregator can listen on.
#[derive(Clone)]
pub struct ChainTarget {
    pub listener: Arc<dyn ChainListener>,
    pub inbox_address: String,
}

impl std::fmt::Debug for ChainTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainTarget")
            .field("chain_id", &self.listener.chain_id())
            .field("inbox_address", &self.inbox_address)
            .finish()
    }
}

/// Execution manager driven by inbox events from the AVS's chains.
pub struct ChainExecutionManager {
    avs_address: String,
    chains: Vec<(u64, ChainTarget)>,
    caller: Arc<dyn ContractCaller>,
    queue_capacity: usize,
    config: OnceLock<AvsConfig>,
    events_processed: AtomicU64,
}

impl ChainExecutionManager {
    pub fn new(
        avs_address: &str,
        chains: Vec<(u64, ChainTarget)>,
        caller: Arc<dyn ContractCaller>,
        queue_capacity: usize,
    ) -> Self {
        Self {
            avs_address: avs_address.to_string(),
            chains,
            caller,
            queue_capacity: queue_capacity.max(1),
            config: OnceLock::new(),
            events_processed: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> Option<&AvsConfig> {
        self.config.get()
    }

    pub fn events_processed(&self) -> u64 {
        self.events_processed.load(Ordering::Relaxed)
    }

    fn handle_event(&self, config: &AvsConfig, event: InboxEvent) {
        self.events_processed.fetch_add(1, Ordering::Relaxed);
        info!(
            "AVS {} task event on chain {} block {} (aggregator set {}, {} bytes)",
            config.avs_address,
            event.chain_id,
            event.block_number,
            config.aggregator_operator_set_id,
            event.data.len()
        );
    }
}

#[async_trait]
impl AvsExecutionManager for ChainExecutionManager {
    fn avs_address(&self) -> &str {
        &self.avs_address
    }

    fn chain_ids(&self) -> Vec<u64> {
        self.chains.iter().map(|(chain_id, _)| *chain_id).collect()
    }

    async fn initialize(&self) -> Result<(), ExecutionError> {
        let config = self.caller.get_avs_config(&self.avs_address).await?;
        debug!(
            "AVS {} aggregator set {}, executor sets {:?}",
            self.avs_address, config.aggregator_operator_set_id, config.executor_operator_set_ids
        );
        // A second initialize keeps the first configuration.
        let _ = self.config.set(config);
        Ok(())
    }

    async fn run(&self, cancel: CancellationToken) -> Result<(), ExecutionError> {
        let config = self
            .config
            .get()
            .ok_or_else(|| ExecutionError::NotInitialized(self.avs_address.clone()))?;

        let (tx, mut rx) = mpsc::channel(self.queue_capacity);
        let listeners_cancel = cancel.child_token();
        let mut listeners = JoinSet::new();
        for (chain_id, target) in &self.chains {
            let chain_id = *chain_id;
            let listener = target.listener.clone();
            let inbox = target.inbox_address.clone();
            let queue = tx.clone();
            let token = listeners_cancel.clone();
            listeners.spawn(async move {
                let result = listener.listen_for_inbox_events(token, queue, &inbox).await;
                (chain_id, result)
            });
        }
        drop(tx);
        info!(
            "AVS {} running on chains {:?}",
            self.avs_address,
            self.chain_ids()
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                event = rx.recv() => match event {
                    Some(event) => self.handle_event(config, event),
                    None => {
                        warn!("All chain listeners for AVS {} stopped", self.avs_address);
                        break;
                    }
                },
            }
        }

        listeners_cancel.cancel();
        drop(rx);
        while let Some(joined) = listeners.join_next().await {
            match joined {
                Ok((_, Ok(()))) => {}
                Ok((chain_id, Err(e))) => {
                    warn!("Listener for chain {} ended with error: {}", chain_id, e)
                }
                Err(e) => error!("Listener task for AVS {} failed: {}", self.avs_address, e),
            }
        }

        info!("AVS {} execution manager stopped", self.avs_address);
        Ok(())
    }
}

/// Factory building [`ChainExecutionManager`]s over a fixed set of chains.
pub struct ChainExecutionManagerFactory {
    chains: HashMap<u64, ChainTarget>,
    caller: Arc<dyn ContractCaller>,
    queue_capacity: usize,
}

impl ChainExecutionManagerFactory {
    pub fn new(chains: Vec<ChainTarget>, caller: Arc<dyn ContractCaller>) -> Self {
        let chains = chains
            .into_iter()
            .map(|target| (target.listener.chain_id(), target))
            .collect();
        Self {
            chains,
            caller,
            queue_capacity: DEFAULT_EVENT_QUEUE_CAPACITY,
        }
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn chain_ids(&self) -> Vec<u64> {
        let mut ids: Vec<u64> = self.chains.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

impl ExecutionManagerFactory for ChainExecutionManagerFactory {
    fn create(
        &self,
        avs_address: &str,
        chain_ids: &[u64],
    ) -> Result<Arc<dyn AvsExecutionManager>, ExecutionError> {
        if chain_ids.is_empty() {
            return Err(ExecutionError::NoChains(avs_address.to_string()));
        }

        let mut selected = Vec::with_capacity(chain_ids.len());
        for chain_id in chain_ids {
            let target = self
                .chains
                .get(chain_id)
                .ok_or_else(|| ExecutionError::UnsupportedChain {
                    avs_address: avs_address.to_string(),
                    chain_id: *chain_id,
                })?;
            if !selected.iter().any(|(id, _)| id == chain_id) {
                selected.push((*chain_id, target.clone()));
            }
        }

        Ok(Arc::new(ChainExecutionManager::new(
            avs_address,
            selected,
            self.caller.clone(),
            self.queue_capacity,
        )))
    }
}
