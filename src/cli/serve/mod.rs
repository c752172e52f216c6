//! Serve command - runs the web server

use std::net::SocketAddr;
use std::path::Path;

use tokio::net::TcpListener;
use tracing::info;

use crate::api::create_router;
use crate::config::{ServerConfig, SettingsLoader};
use crate::infrastructure::logging;

/// Load settings from `config_dir` and serve until interrupted
pub async fn run(config_dir: &Path) -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = SettingsLoader::new(config_dir).load()?;
    let _log_guard = logging::init_logging(&settings.settings().logger)?;

    info!(
        env = %settings.env(),
        config_dir = %config_dir.display(),
        "Settings loaded"
    );

    let server = settings.settings().server.clone();
    let base_path = settings.settings().app.normalized_base_path();

    let state = crate::create_app_state(settings).await?;
    let db = state.db.clone();
    let app = create_router(state);

    let addr = build_socket_addr(&server)?;
    info!("Starting server on http://{}{}/", addr, base_path);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await;
    info!("Server stopped");

    Ok(())
}

fn build_socket_addr(config: &ServerConfig) -> anyhow::Result<SocketAddr> {
    Ok(SocketAddr::from((
        config.host.parse::<std::net::IpAddr>()?,
        config.port,
    )))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
