//! Entry point for the `relay-gateway` HTTP server.

use std::sync::Arc;

use relay_broker::CompletionBroker;
use relay_gateway::{
    config::GatewayConfig,
    pool::TunnelPool,
    routes::{create_router, AppState},
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match GatewayConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration");
            std::process::exit(1);
        }
    };

    let broker = Arc::new(CompletionBroker::new(config.broker));
    let backend = Arc::new(TunnelPool::new(config.provision_delay));
    let app = create_router(AppState::new(broker, backend));

    let listener = match tokio::net::TcpListener::bind(config.listen_addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!(addr = %config.listen_addr, error = %e, "failed to bind");
            std::process::exit(1);
        }
    };

    info!(
        addr = %config.listen_addr,
        wait_budget_ms = config.broker.wait_budget.as_millis(),
        retrieve_limit_ms = config.broker.retrieve_limit.map(|d| d.as_millis()),
        "relay-gateway listening"
    );
    if config.broker.retrieve_limit.is_none() {
        info!("RELAY_RETRIEVE_LIMIT_MS unset: /loading polls wait until their operation finishes");
    }

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!(error = %e, "server error");
        std::process::exit(1);
    }
}
