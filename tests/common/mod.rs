#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use hourglass::aggregator::{Aggregator, AvsRegistry, ChainExecutionManagerFactory, ChainTarget};
use hourglass::auth::{ChallengeTokenManager, Verifier};
use hourglass::chain::{ChainError, ChainListener, InboxEvent, StaticContractCaller};
use hourglass::signer::{EcdsaPrivateKey, LocalSigner, Signer};

pub const CHAIN_IDS: [u64; 2] = [1, 31337];

/// Listener that never produces events and returns once cancelled.
pub struct IdleListener {
    pub chain_id: u64,
}

#[async_trait]
impl ChainListener for IdleListener {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    async fn listen_for_inbox_events(
        &self,
        cancel: CancellationToken,
        _queue: mpsc::Sender<InboxEvent>,
        _inbox_address: &str,
    ) -> Result<(), ChainError> {
        cancel.cancelled().await;
        Ok(())
    }
}

pub fn random_signer() -> Arc<dyn Signer> {
    Arc::new(LocalSigner::ecdsa(EcdsaPrivateKey::random()))
}

pub fn registry() -> AvsRegistry {
    let targets = CHAIN_IDS
        .iter()
        .map(|&chain_id| ChainTarget {
            listener: Arc::new(IdleListener { chain_id }),
            inbox_address: format!("0xinbox{}", chain_id),
        })
        .collect();
    let caller = Arc::new(StaticContractCaller::with_default(0, vec![1]));
    AvsRegistry::new(Arc::new(ChainExecutionManagerFactory::new(targets, caller)))
}

pub fn verifier(signer: Arc<dyn Signer>, expiration: Duration) -> Verifier {
    let entity = signer.from_address().unwrap();
    let tokens = ChallengeTokenManager::new(&entity, expiration).unwrap();
    Verifier::new(tokens, signer)
}

pub fn aggregator(verifier: Option<Verifier>) -> Arc<Aggregator> {
    Arc::new(Aggregator::new(registry(), verifier))
}

/// Serve `app` on an ephemeral local port.
pub async fn serve(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

pub fn url(addr: SocketAddr) -> String {
    format!("http://{}", addr)
}
