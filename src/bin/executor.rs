use log::{error, info};
use std::sync::Arc;
use tokio::net::TcpListener;

use hourglass::auth::{ChallengeTokenManager, Verifier};
use hourglass::config::ExecutorConfig;
use hourglass::executor::{Executor, HttpPerformer};
use hourglass::rpc::executor_router;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::init();

    let settings = ExecutorConfig::from_env()?;

    let signer = settings.signer.build()?;
    signer.validate().await?;
    let operator_address = match &settings.operator_address {
        Some(address) => address.clone(),
        None => signer.from_address()?,
    };

    let verifier = if settings.auth_enabled {
        let tokens = ChallengeTokenManager::new(&operator_address, settings.token_expiration)?;
        Some(Verifier::new(tokens, signer.clone()))
    } else {
        None
    };

    let executor = Arc::new(Executor::new(signer, &operator_address, verifier));
    for (avs_address, url) in &settings.performers {
        executor
            .add_performer(avs_address, Arc::new(HttpPerformer::new(url)?))
            .await;
    }

    // Bind the server
    let listener = TcpListener::bind(format!("0.0.0.0:{}", settings.port)).await?;
    info!("Executor listening on 0.0.0.0:{}", settings.port);

    axum::serve(listener, executor_router(executor))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Executor stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
