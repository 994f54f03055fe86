//! Gateway binary: config from the environment, tracing to stdout, serve.

use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use charsiu::config::GatewayConfig;
use charsiu::server::{AppState, router};
use charsiu::store::Store;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("charsiu=info")),
        )
        .init();

    let config = GatewayConfig::from_env();
    let store = Store::open(&config.database_path).with_context(|| {
        format!(
            "failed to open datastore at {}",
            config.database_path.display()
        )
    })?;

    let bind = config.bind;
    let state = Arc::new(AppState::new(config, store));
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    info!(%bind, "charsiu gateway listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutting down");
}
