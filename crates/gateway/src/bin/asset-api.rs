use std::sync::Arc;

use anyhow::Context;
use asset_gateway::{router, ApiConfig, Identity, InMemoryLedger, LocalGateway};
use clap::Parser;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ApiConfig::parse();
    asset_gateway::logging::init(config.log_format)?;

    let identity = Identity::load(&config.msp_id, config.cert_path.as_deref())
        .context("failed to read cert")?;
    tracing::info!(
        peer_endpoint = %config.peer_endpoint,
        gateway_peer = %config.gateway_peer,
        key_path = ?config.key_path,
        tls_cert_path = ?config.tls_cert_path,
        "Serving contract from the in-process ledger"
    );

    let ledger = Arc::new(InMemoryLedger::new(config.channel.clone()));
    let gateway = Arc::new(LocalGateway::new(
        ledger,
        identity,
        config.contract.clone(),
        config.timeouts,
    ));
    let app = router(gateway);

    let listener = TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "Server running");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("Gateway closed");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
