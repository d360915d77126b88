use anyhow::Context;

use storeadmin_api::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    storeadmin_observability::init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    let app = storeadmin_api::app::build_app(&config)
        .await
        .context("failed to initialise services")?;

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!(
        addr = %listener.local_addr()?,
        environment = %config.environment,
        backend = ?config.backend,
        "listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
