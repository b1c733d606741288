//! AVS lifecycle registry.
//!
//! Maps AVS addresses to their running execution managers. Inserts and
//! removals take the write lock, reads take the read lock, and no lock is
//! held across I/O: initialization of a new execution manager happens
//! between two short critical sections.

use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::aggregator::execution::{AvsExecutionManager, ExecutionError, ExecutionManagerFactory};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("AVS address must not be empty")]
    InvalidAddress,

    #[error("AVS {0} is already registered")]
    AlreadyRegistered(String),

    #[error("AVS {0} is not registered")]
    NotRegistered(String),

    #[error("Failed to start execution manager for AVS {address}: {source}")]
    Execution {
        address: String,
        #[source]
        source: ExecutionError,
    },

    #[error("AVS {0} was deregistered before its execution manager started")]
    Aborted(String),

    #[error("Registry is shut down")]
    ShutDown,
}

/// Cancellation that fires at most once.
#[derive(Debug)]
pub struct CancelHandle {
    token: CancellationToken,
    fired: AtomicBool,
}

impl CancelHandle {
    pub fn new(token: CancellationToken) -> Self {
        Self {
            token,
            fired: AtomicBool::new(false),
        }
    }

    /// Cancel the task. Returns `false` if this handle already fired.
    pub fn cancel(&self) -> bool {
        if self.fired.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.token.cancel();
        true
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Registry entry for one AVS.
pub struct AvsExecutionManagerInfo {
    pub address: String,
    pub chain_ids: Vec<u64>,
    pub execution_manager: Arc<dyn AvsExecutionManager>,
    /// `None` while the execution manager is still starting.
    pub cancel: Option<Arc<CancelHandle>>,
    task: Option<JoinHandle<()>>,
    registration: u64,
}

impl std::fmt::Debug for AvsExecutionManagerInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AvsExecutionManagerInfo")
            .field("address", &self.address)
            .field("chain_ids", &self.chain_ids)
            .field("running", &self.cancel.is_some())
            .finish()
    }
}

/// Listing view of a registered AVS.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvsSummary {
    pub address: String,
    pub chain_ids: Vec<u64>,
    pub running: bool,
}

/// Concurrency-safe registry of running AVS execution managers.
///
/// Each execution manager runs under a child of the registry's root token,
/// so [`AvsRegistry::shutdown`] stops everything at once.
#[derive(Clone)]
pub struct AvsRegistry {
    entries: Arc<RwLock<HashMap<String, AvsExecutionManagerInfo>>>,
    factory: Arc<dyn ExecutionManagerFactory>,
    root: CancellationToken,
    next_registration: Arc<AtomicU64>,
}

impl AvsRegistry {
    pub fn new(factory: Arc<dyn ExecutionManagerFactory>) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            factory,
            root: CancellationToken::new(),
            next_registration: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Register `address` and start its execution manager.
    ///
    /// Duplicates are rejected with [`RegistryError::AlreadyRegistered`]
    /// before anything is started.
    pub async fn register(&self, address: &str, chain_ids: &[u64]) -> Result<(), RegistryError> {
        let address = normalize_address(address)?;
        if self.root.is_cancelled() {
            return Err(RegistryError::ShutDown);
        }

        let manager = self
            .factory
            .create(&address, chain_ids)
            .map_err(|source| RegistryError::Execution {
                address: address.clone(),
                source,
            })?;
        let registration = self.next_registration.fetch_add(1, Ordering::Relaxed);

        // Reserve the address.
        {
            let mut entries = self.entries.write().await;
            if self.root.is_cancelled() {
                return Err(RegistryError::ShutDown);
            }
            if entries.contains_key(&address) {
                debug!("Rejecting duplicate registration of AVS {}", address);
                return Err(RegistryError::AlreadyRegistered(address));
            }
            entries.insert(
                address.clone(),
                AvsExecutionManagerInfo {
                    address: address.clone(),
                    chain_ids: manager.chain_ids(),
                    execution_manager: manager.clone(),
                    cancel: None,
                    task: None,
                    registration,
                },
            );
        }

        if let Err(source) = manager.initialize().await {
            warn!("Execution manager for AVS {} failed to initialize: {}", address, source);
            self.release(&address, registration).await;
            return Err(RegistryError::Execution { address, source });
        }

        // Attach the task, unless the address was released or the registry
        // shut down meanwhile.
        let mut entries = self.entries.write().await;
        if self.root.is_cancelled() {
            if entries
                .get(&address)
                .is_some_and(|info| info.registration == registration)
            {
                entries.remove(&address);
            }
            drop(entries);
            warn!("Registry shut down while AVS {} was starting", address);
            return Err(RegistryError::ShutDown);
        }
        match entries.get_mut(&address) {
            Some(info) if info.registration == registration => {
                let token = self.root.child_token();
                info.cancel = Some(Arc::new(CancelHandle::new(token.clone())));
                info.task = Some(tokio::spawn({
                    let manager = manager.clone();
                    let address = address.clone();
                    async move {
                        if let Err(e) = manager.run(token).await {
                            error!("Execution manager for AVS {} failed: {}", address, e);
                        }
                    }
                }));
                drop(entries);
                info!("Registered AVS {} on chains {:?}", address, chain_ids);
                Ok(())
            }
            _ => {
                drop(entries);
                warn!("AVS {} was deregistered during startup", address);
                Err(RegistryError::Aborted(address))
            }
        }
    }

    /// Cancel and remove `address`.
    pub async fn deregister(&self, address: &str) -> Result<(), RegistryError> {
        let address = normalize_address(address)?;

        let mut entries = self.entries.write().await;
        let info = entries
            .remove(&address)
            .ok_or_else(|| RegistryError::NotRegistered(address.clone()))?;
        if let Some(cancel) = &info.cancel {
            cancel.cancel();
        }
        drop(entries);

        info!("Deregistered AVS {}", address);
        Ok(())
    }

    pub async fn contains(&self, address: &str) -> bool {
        let Ok(address) = normalize_address(address) else {
            return false;
        };
        self.entries.read().await.contains_key(&address)
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Registered AVSs, sorted by address.
    pub async fn list(&self) -> Vec<AvsSummary> {
        let entries = self.entries.read().await;
        let mut summaries: Vec<AvsSummary> = entries
            .values()
            .map(|info| AvsSummary {
                address: info.address.clone(),
                chain_ids: info.chain_ids.clone(),
                running: info.cancel.is_some(),
            })
            .collect();
        drop(entries);
        summaries.sort_by(|a, b| a.address.cmp(&b.address));
        summaries
    }

    /// Cancel every execution manager, clear the registry and wait for the
    /// tasks to exit. Later registrations fail with [`RegistryError::ShutDown`].
    pub async fn shutdown(&self) {
        self.root.cancel();

        let drained: Vec<AvsExecutionManagerInfo> = {
            let mut entries = self.entries.write().await;
            entries.drain().map(|(_, info)| info).collect()
        };

        let count = drained.len();
        for info in drained {
            if let Some(cancel) = &info.cancel {
                cancel.cancel();
            }
            if let Some(task) = info.task {
                if let Err(e) = task.await {
                    error!("Execution task for AVS {} failed: {}", info.address, e);
                }
            }
        }
        info!("AVS registry shut down ({} execution managers stopped)", count);
    }

    /// Remove the entry for `address` if it still belongs to `registration`.
    async fn release(&self, address: &str, registration: u64) {
        let mut entries = self.entries.write().await;
        if entries
            .get(address)
            .is_some_and(|info| info.registration == registration)
        {
            entries.remove(address);
        }
    }
}

impl std::fmt::Debug for AvsRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AvsRegistry")
            .field("shut_down", &self.root.is_cancelled())
            .finish_non_exhaustive()
    }
}

fn normalize_address(address: &str) -> Result<String, RegistryError> {
    let address = address.trim().to_ascii_lowercase();
    if address.is_empty() {
        return Err(RegistryError::InvalidAddress);
    }
    Ok(address)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;
    use tokio::sync::Notify;

    /// Manager that records lifecycle calls.
    #[derive(Default)]
    struct Probe {
        started: AtomicUsize,
        stopped: AtomicUsize,
        fail_initialize: bool,
        init_gate: Option<Arc<Notify>>,
        create_delay: Duration,
    }

    struct ProbeManager {
        address: String,
        probe: Arc<Probe>,
    }

    #[async_trait]
    impl AvsExecutionManager for ProbeManager {
        fn avs_address(&self) -> &str {
            &self.address
        }

        fn chain_ids(&self) -> Vec<u64> {
            vec![1]
        }

        async fn initialize(&self) -> Result<(), ExecutionError> {
            if let Some(gate) = &self.probe.init_gate {
                gate.notified().await;
            }
            if self.probe.fail_initialize {
                return Err(ExecutionError::NotInitialized(self.address.clone()));
            }
            Ok(())
        }

        async fn run(&self, cancel: CancellationToken) -> Result<(), ExecutionError> {
            self.probe.started.fetch_add(1, Ordering::SeqCst);
            cancel.cancelled().await;
            self.probe.stopped.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct ProbeFactory(Arc<Probe>);

    impl ExecutionManagerFactory for ProbeFactory {
        fn create(
            &self,
            avs_address: &str,
            _chain_ids: &[u64],
        ) -> Result<Arc<dyn AvsExecutionManager>, ExecutionError> {
            std::thread::sleep(self.0.create_delay);
            Ok(Arc::new(ProbeManager {
                address: avs_address.to_string(),
                probe: self.0.clone(),
            }))
        }
    }

    fn registry(probe: Probe) -> (AvsRegistry, Arc<Probe>) {
        let probe = Arc::new(probe);
        (AvsRegistry::new(Arc::new(ProbeFactory(probe.clone()))), probe)
    }

    async fn wait_for(counter: &AtomicUsize, value: usize) {
        for _ in 0..200 {
            if counter.load(Ordering::SeqCst) >= value {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("counter never reached {}", value);
    }

    #[test]
    fn test_cancel_handle_fires_once() {
        let token = CancellationToken::new();
        let handle = CancelHandle::new(token.clone());
        assert!(handle.cancel());
        assert!(!handle.cancel());
        assert!(token.is_cancelled());
        assert!(handle.is_cancelled());
    }

    #[tokio::test]
    async fn test_register_and_deregister() {
        let (registry, probe) = registry(Probe::default());

        registry.register("0xAVS", &[1]).await.unwrap();
        assert!(registry.contains("0xavs").await);
        wait_for(&probe.started, 1).await;

        let listed = registry.list().await;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].address, "0xavs");
        assert!(listed[0].running);

        registry.deregister("0xAvS").await.unwrap();
        assert!(registry.is_empty().await);
        wait_for(&probe.stopped, 1).await;
    }

    #[tokio::test]
    async fn test_duplicate_is_conflict() {
        let (registry, _) = registry(Probe::default());
        registry.register("0xavs", &[1]).await.unwrap();
        assert!(matches!(
            registry.register("0xAVS", &[1]).await,
            Err(RegistryError::AlreadyRegistered(_))
        ));
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_deregister_unknown() {
        let (registry, _) = registry(Probe::default());
        let err = registry.deregister("0xabc").await.unwrap_err();
        assert_eq!(err.to_string(), "AVS 0xabc is not registered");
    }

    #[tokio::test]
    async fn test_initialize_failure_releases_address() {
        let (registry, probe) = registry(Probe {
            fail_initialize: true,
            ..Probe::default()
        });

        assert!(matches!(
            registry.register("0xavs", &[1]).await,
            Err(RegistryError::Execution { .. })
        ));
        assert!(registry.is_empty().await);
        assert_eq!(probe.started.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_deregister_while_starting() {
        let gate = Arc::new(Notify::new());
        let (registry, probe) = registry(Probe {
            init_gate: Some(gate.clone()),
            ..Probe::default()
        });

        let pending = tokio::spawn({
            let registry = registry.clone();
            async move { registry.register("0xavs", &[1]).await }
        });

        // The entry exists without a cancel handle while initialize waits.
        for _ in 0..200 {
            if registry.contains("0xavs").await {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        let listed = registry.list().await;
        assert_eq!(listed.len(), 1);
        assert!(!listed[0].running);

        registry.deregister("0xavs").await.unwrap();
        gate.notify_one();

        assert!(matches!(
            pending.await.unwrap(),
            Err(RegistryError::Aborted(_))
        ));
        assert!(registry.is_empty().await);
        assert_eq!(probe.started.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_shutdown_stops_everything() {
        let (registry, probe) = registry(Probe::default());
        registry.register("0xa", &[1]).await.unwrap();
        registry.register("0xb", &[1]).await.unwrap();
        wait_for(&probe.started, 2).await;

        registry.shutdown().await;
        assert!(registry.is_empty().await);
        assert_eq!(probe.stopped.load(Ordering::SeqCst), 2);
        assert!(matches!(
            registry.register("0xc", &[1]).await,
            Err(RegistryError::ShutDown)
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_shutdown_during_create_rejects_registration() {
        let (registry, probe) = registry(Probe {
            create_delay: Duration::from_millis(100),
            ..Probe::default()
        });

        let pending = tokio::spawn({
            let registry = registry.clone();
            async move { registry.register("0xavs", &[1]).await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        registry.shutdown().await;

        assert!(matches!(
            pending.await.unwrap(),
            Err(RegistryError::ShutDown)
        ));
        assert!(registry.is_empty().await);
        assert_eq!(probe.started.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_shutdown_during_initialize_rejects_registration() {
        let gate = Arc::new(Notify::new());
        let (registry, probe) = registry(Probe {
            init_gate: Some(gate.clone()),
            ..Probe::default()
        });

        let pending = tokio::spawn({
            let registry = registry.clone();
            async move { registry.register("0xavs", &[1]).await }
        });
        for _ in 0..200 {
            if registry.contains("0xavs").await {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        registry.shutdown().await;
        gate.notify_one();

        assert!(matches!(
            pending.await.unwrap(),
            Err(RegistryError::ShutDown)
        ));
        assert!(registry.is_empty().await);
        assert_eq!(probe.started.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_empty_address_rejected() {
        let (registry, _) = registry(Probe::default());
        assert!(matches!(
            registry.register("  ", &[1]).await,
            Err(RegistryError::InvalidAddress)
        ));
    }
}
