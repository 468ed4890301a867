//! WebObs Server: tag-scoped relay between an application and browser sessions.
//!
//! Main entry point that loads configuration, starts the relay engine, binds
//! the configured tags and serves HTTP until a shutdown signal arrives.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{EnvFilter, fmt};

use webobs_core::config::AppConfig;
use webobs_core::error::AppError;
use webobs_relay::listener::{self, Listener};
use webobs_relay::{Message, RelayEngine};

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

/// Load configuration from `config/` and the environment
fn load_configuration() -> Result<AppConfig, AppError> {
    let env = std::env::var("WEBOBS_ENV").unwrap_or_else(|_| "development".to_string());
    AppConfig::load(&env)
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting WebObs v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Relay engine ─────────────────────────────────────
    let engine = RelayEngine::start(&config.relay);

    // ── Step 2: Configured tags ──────────────────────────────────
    for binding in &config.channels.bindings {
        let listener = config.channels.echo.then(|| echo_listener(&engine));
        engine.bind(&binding.tag, listener, &binding.asset_path)?;
        if config.channels.echo {
            tracing::info!(tag = %binding.tag, "Echo listener attached");
        }
    }

    // ── Step 3: HTTP server ──────────────────────────────────────
    let addr = config.server.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {}: {}", addr, e)))?;

    let grace = Duration::from_secs(config.server.shutdown_grace_seconds);
    let stop = CancellationToken::new();
    let state = webobs_api::AppState::new(config, engine.clone());

    let server = tokio::spawn(webobs_api::serve(
        listener,
        state,
        stop.clone().cancelled_owned(),
    ));

    shutdown_signal().await;
    tracing::info!("Shutdown signal received, starting graceful shutdown...");

    // ── Step 4: Drain ────────────────────────────────────────────
    // Sessions must end before axum's graceful shutdown can finish.
    engine.shutdown();
    stop.cancel();

    match tokio::time::timeout(grace, server).await {
        Ok(Ok(result)) => result?,
        Ok(Err(e)) => return Err(AppError::internal(format!("Server task failed: {}", e))),
        Err(_) => tracing::warn!("Graceful shutdown timed out after {:?}", grace),
    }

    tracing::info!("WebObs server shut down gracefully");
    Ok(())
}

/// Listener that re-publishes every inbound payload to all sessions of
/// the same tag.
fn echo_listener(engine: &RelayEngine) -> Arc<dyn Listener> {
    let outbound = engine.outbound();
    listener::from_fn(move |tag, data| {
        let msg = Message::new(tag, Bytes::copy_from_slice(data));
        if outbound.try_send(msg).is_err() {
            tracing::warn!(tag = %tag, "Outbound channel full, echo dropped");
        }
    })
}

/// Wait for Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
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
                tracing::error!("Failed to install SIGTERM handler: {}", e);
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
}
