use std::sync::Arc;

use anyhow::Context;

use castle_api::app::{build_app, build_services};
use castle_api::config::AppConfig;
use castle_infra::RevocationSweeper;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    castle_observability::init();

    let config = AppConfig::from_env()?;
    let services = Arc::new(build_services(&config).await?);

    let sweeper = RevocationSweeper::spawn(services.revocations.clone(), config.sweep_period());
    let app = build_app(services);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!(public_host = %config.public_host, addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown requested");
        })
        .await?;

    sweeper.shutdown().await;
    Ok(())
}
