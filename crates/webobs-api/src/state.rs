//! Application state shared across all handlers.

use std::sync::Arc;

use webobs_core::config::AppConfig;
use webobs_relay::RelayEngine;

/// Application state passed to every Axum handler via `State<AppState>`.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Relay engine (registry, loops, metrics)
    pub relay: RelayEngine,
}

impl AppState {
    /// Creates the state from a configuration and a running engine.
    pub fn new(config: AppConfig, relay: RelayEngine) -> Self {
        Self {
            config: Arc::new(config),
            relay,
        }
    }
}
