//! Contract read access used by execution managers.

use async_trait::async_trait;
use log::debug;
use std::collections::HashMap;

use crate::chain::error::ChainError;
use crate::chain::types::AvsConfig;

/// Address-based contract reads.
#[async_trait]
pub trait ContractCaller: Send + Sync {
    /// Operator-set configuration of `avs_address`.
    async fn get_avs_config(&self, avs_address: &str) -> Result<AvsConfig, ChainError>;
}

/// Contract caller serving configuration held in memory.
///
/// Addresses without an explicit entry fall back to the default operator
/// sets, if any.
#[derive(Debug, Clone, Default)]
pub struct StaticContractCaller {
    configs: HashMap<String, AvsConfig>,
    default_sets: Option<(u32, Vec<u32>)>,
}

impl StaticContractCaller {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `aggregator_set` / `executor_sets` for every AVS.
    pub fn with_default(aggregator_set: u32, executor_sets: Vec<u32>) -> Self {
        Self {
            configs: HashMap::new(),
            default_sets: Some((aggregator_set, executor_sets)),
        }
    }

    pub fn insert(&mut self, config: AvsConfig) {
        let key = config.avs_address.to_ascii_lowercase();
        self.configs.insert(key, config);
    }
}

#[async_trait]
impl ContractCaller for StaticContractCaller {
    async fn get_avs_config(&self, avs_address: &str) -> Result<AvsConfig, ChainError> {
        let key = avs_address.to_ascii_lowercase();
        if let Some(config) = self.configs.get(&key) {
            return Ok(config.clone());
        }

        match &self.default_sets {
            Some((aggregator_set, executor_sets)) => {
                debug!("Using default operator sets for AVS {}", key);
                Ok(AvsConfig {
                    avs_address: key,
                    aggregator_operator_set_id: *aggregator_set,
                    executor_operator_set_ids: executor_sets.clone(),
                })
            }
            None => Err(ChainError::AvsNotFound(key)),
        }
    }
}
