use std::{net::SocketAddr, sync::Arc};

use tokio::net::TcpListener;
use tracing::{info, instrument, warn};

use practice_workspace::config::HostConfig;
use practice_workspace::routes::build_router;
use practice_workspace::state::AppState;
use practice_workspace::telemetry;

#[instrument(level = "info", skip_all)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  let config = HostConfig::from_env();
  let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));

  // Shared backend client plus the session and theme stores.
  let state = Arc::new(AppState::from_config(config)?);
  let app = build_router(state);

  let listener = TcpListener::bind(addr).await?;
  info!(target: "practice_workspace", %addr, "HTTP server listening");
  axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
  info!(target: "practice_workspace", "Server stopped");
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    warn!(target: "practice_workspace", error = %e, "Could not listen for ctrl-c");
    std::future::pending::<()>().await;
  }
  info!(target: "practice_workspace", "Shutdown requested");
}
