use anyhow::{anyhow, Context, Result};
use clap::Parser;
use log::info;

use slotkeeper_server::config::ServerConfig;
use slotkeeper_server::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServerConfig::parse();
    slotkeeper_core::init_logging(config.log_level(), config.log_dir.as_deref())
        .map_err(|err| anyhow!(err))?;

    let state = AppState::open(&config.db_path)?;
    let app = slotkeeper_server::app(state);

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(
        "event=server_start module=server status=ok addr={} db_path={} version={}",
        addr,
        config.db_path.display(),
        slotkeeper_core::core_version()
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("event=server_stop module=server status=ok");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        // Without a signal handler the server runs until killed.
        std::future::pending::<()>().await;
    }
}
