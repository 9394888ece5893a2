//! # edgewired — edgewire agent daemon
//!
//! ## Responsibilities
//! - Parse configuration (CLI argument, env vars, config file)
//! - Initialise logging
//! - Build connections, router and devices (see [`edgewired::wiring`])
//! - Rebuild everything on SIGHUP
//! - Shut down gracefully on SIGINT/SIGTERM

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal::unix::{SignalKind, signal};
use tracing_subscriber::EnvFilter;

use edgewire_adapter_virtual::VirtualGpio;
use edgewire_app::agent::DEFAULT_GRACE;
use edgewire_app::ports::GpioBackend;
use edgewired::config::{self, Config, GpioBackendKind};
use edgewired::wiring;

enum Signal {
    Reload,
    Stop,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let path = config_path();
    let config = Config::load(&path)
        .with_context(|| format!("loading configuration from {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.logging.filter))
        .init();
    tracing::info!(path = %path.display(), "configuration loaded");

    let gpio: Arc<dyn GpioBackend> = match config.gpio.backend {
        GpioBackendKind::Virtual => Arc::new(VirtualGpio::new()),
    };

    let mut config = config;
    loop {
        let wired = wiring::build(&config, &gpio);
        let received = wait_for_signal().await.context("installing signal handlers")?;
        wired.agent.shutdown(DEFAULT_GRACE).await;

        match received {
            Signal::Stop => break,
            Signal::Reload => {
                tracing::info!("reloading configuration");
                match Config::load(&path) {
                    Ok(reloaded) => config = reloaded,
                    Err(err) => {
                        tracing::error!(%err, "reload failed, keeping previous configuration");
                    }
                }
            }
        }
    }

    tracing::info!("edgewired stopped");
    Ok(())
}

/// First CLI argument, else `EDGEWIRE_CONFIG`, else `edgewire.toml`.
fn config_path() -> PathBuf {
    std::env::args_os()
        .nth(1)
        .or_else(|| std::env::var_os("EDGEWIRE_CONFIG"))
        .map_or_else(|| PathBuf::from(config::DEFAULT_PATH), PathBuf::from)
}

async fn wait_for_signal() -> std::io::Result<Signal> {
    let mut hangup = signal(SignalKind::hangup())?;
    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        _ = hangup.recv() => Ok(Signal::Reload),
        _ = terminate.recv() => Ok(Signal::Stop),
        result = tokio::signal::ctrl_c() => result.map(|()| Signal::Stop),
    }
}
