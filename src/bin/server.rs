//! surfaceserve HTTP server binary.
//!
//! Serves the bundled [`Www`](surfaceserve::surface::Www) capability surface
//! and the static files under `WWWROOT` on one port.
//!
//! # Environment Variables
//!
//! - `HOST` / `PORT` - bind address (default: 0.0.0.0:8080)
//! - `WWWROOT` - static file root (default: ./wwwroot)
//! - `REBUILD_MIN_INTERVAL_MS` - throttle miss-triggered index rebuilds (default: 0, off)
//! - `SHOW_VERBOSE` / `SHOW_DEBUG` - default log verbosity (default: true)
//! - `RUST_LOG` - tracing filter, overrides the above
//!
//! # Usage
//!
//! ```bash
//! WWWROOT=./site cargo run --bin server
//! ```

use anyhow::Context;
use surfaceserve::capabilities::CapabilityRegistry;
use surfaceserve::config::ServerConfig;
use surfaceserve::dispatch::Dispatcher;
use surfaceserve::server::{app_router, AppState};
use surfaceserve::surface::Www;
use surfaceserve::telemetry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::from_env()?;
    telemetry::initialise(&config)?;

    tracing::info!("Initializing...");
    let registry = CapabilityRegistry::load(&Www);
    let dispatcher = Dispatcher::from_config(registry, &config);
    let app = app_router(AppState::new(dispatcher));

    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!(
        "Starting server on {} (wwwroot: {})",
        bind_addr,
        config.wwwroot.display()
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server failed")?;

    tracing::info!("Terminated.");
    Ok(())
}

/// Resolves on Ctrl+C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Terminating...");
}
