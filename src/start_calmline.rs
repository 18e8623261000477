//! Startup helpers for the Calmline server.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, anyhow};

use crate::config::ChatConfig;
use crate::server::{self, AppState};

/// Run the server (used by the `calmline-server` binary).
///
/// # Returns
/// `ExitCode::SUCCESS` on graceful shutdown, `1` on failure.
#[must_use]
pub fn run() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Starting Calmline v{}", env!("CARGO_PKG_VERSION"));

    match try_run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}

fn try_run() -> anyhow::Result<()> {
    let config = Arc::new(ChatConfig::from_env().context("Failed to load configuration")?);
    tracing::info!(
        model = %config.model,
        endpoint = %config.api_base_url,
        chat_log = %config.chat_log_path.display(),
        error_log = %config.error_log_path.display(),
        "configuration loaded"
    );

    let state = initialize(Arc::clone(&config))?;

    let rt = tokio::runtime::Runtime::new().context("Failed to create runtime")?;
    rt.block_on(server::run_server_with_shutdown(
        state,
        config.port,
        &config.static_dir,
        shutdown_signal(),
    ))
    .context("Server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Initialize application state without starting the server.
///
/// # Errors
/// Returns an error if state creation fails.
pub fn initialize(config: Arc<ChatConfig>) -> anyhow::Result<Arc<AppState>> {
    AppState::from_config(config).map_err(|e| anyhow!("Failed to create state: {e}"))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Ctrl+C handler unavailable: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initialize_builds_state() -> anyhow::Result<()> {
        let state = initialize(Arc::new(ChatConfig::new("key")))?;
        assert_eq!(state.model_name, crate::config::DEFAULT_MODEL);
        Ok(())
    }

    #[test]
    fn test_initialize_rejects_bad_url() {
        let mut config = ChatConfig::new("key");
        config.api_base_url = "not a url".to_string();
        assert!(initialize(Arc::new(config)).is_err());
    }
}
