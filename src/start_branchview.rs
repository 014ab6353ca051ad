//! Startup helpers for the branch view server.

use std::process::ExitCode;
use std::sync::Arc;

use crate::server::{self, AppState};
use crate::tree::core::config::BranchviewConfig;

/// Install the global `tracing` subscriber.
///
/// Honors `RUST_LOG`; defaults to `info`. Logs go to stderr so command
/// output on stdout stays machine-readable. Safe to call more than once.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

/// Run the server (used by the `branchview-server` binary).
///
/// # Returns
/// `ExitCode::SUCCESS` on graceful shutdown, `1` on failure.
#[must_use]
pub fn run() -> ExitCode {
    init_tracing();
    tracing::info!("Starting branchview v{}", env!("CARGO_PKG_VERSION"));

    let state = match initialize() {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to create state: {e}");
            return ExitCode::from(1);
        }
    };

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to create runtime: {e}");
            return ExitCode::from(1);
        }
    };

    if let Err(e) = rt.block_on(server::run_server_with_shutdown(state, shutdown_signal())) {
        tracing::error!("Server error: {e}");
        return ExitCode::from(1);
    }

    tracing::info!("Server stopped");
    ExitCode::SUCCESS
}

/// Initialize application state from the environment without starting the server.
///
/// # Errors
/// Returns an error if the configuration is invalid.
pub fn initialize() -> Result<Arc<AppState>, Box<dyn std::error::Error + Send + Sync>> {
    let config = BranchviewConfig::from_env();
    tracing::info!(
        port = config.server.port,
        max_attempts = config.navigation.max_attempts,
        "Configuration loaded"
    );
    AppState::new(config).map_err(|e| format!("Failed to create state: {e}").into())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
