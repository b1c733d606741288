use log::{error, info};
use std::sync::Arc;
use tokio::net::TcpListener;

use hourglass::aggregator::{Aggregator, AvsRegistry, ChainExecutionManagerFactory, ChainTarget};
use hourglass::auth::{ChallengeTokenManager, Verifier};
use hourglass::chain::{ChainClient, JsonRpcChainListener, StaticContractCaller};
use hourglass::config::AggregatorConfig;
use hourglass::rpc::aggregator_router;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::init();

    let settings = AggregatorConfig::from_env()?;

    // Chains the execution managers listen on
    let mut targets = Vec::with_capacity(settings.chains.len());
    for chain in &settings.chains {
        let client = Arc::new(ChainClient::new(chain.chain_id, &chain.rpc_url)?);
        let listener = Arc::new(JsonRpcChainListener::new(client, settings.poll_interval));
        info!(
            "Chain {} at {} with inbox {}",
            chain.chain_id, chain.rpc_url, chain.inbox_address
        );
        targets.push(ChainTarget {
            listener,
            inbox_address: chain.inbox_address.clone(),
        });
    }

    let caller = Arc::new(StaticContractCaller::with_default(
        settings.aggregator_operator_set_id,
        settings.executor_operator_set_ids.clone(),
    ));
    let factory = Arc::new(ChainExecutionManagerFactory::new(targets, caller));
    let registry = AvsRegistry::new(factory);

    let verifier = match (&settings.signer, settings.auth_enabled) {
        (Some(signer_config), true) => {
            let signer = signer_config.build()?;
            signer.validate().await?;
            let address = settings.address.as_deref().unwrap_or_default();
            let tokens = ChallengeTokenManager::new(address, settings.token_expiration)?;
            Some(Verifier::new(tokens, signer))
        }
        _ => None,
    };

    let aggregator = Arc::new(Aggregator::new(registry, verifier));
    let app = aggregator_router(aggregator.clone());

    // Bind the server
    let listener = TcpListener::bind(format!("0.0.0.0:{}", settings.port)).await?;
    info!("Aggregator listening on 0.0.0.0:{}", settings.port);

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    aggregator.shutdown().await;
    if let Err(e) = served {
        error!("Aggregator server failed: {}", e);
        return Err(e.into());
    }
    info!("Aggregator stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
