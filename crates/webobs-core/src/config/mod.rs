//! Application configuration schemas.
//!
//! All configuration structs are deserialized via the `config` crate from
//! optional TOML files plus `WEBOBS__` environment variables. Every field
//! has a default, so an empty configuration is valid.

pub mod channels;
pub mod logging;
pub mod relay;
pub mod server;

use std::path::Path;

use serde::{Deserialize, Serialize};

use self::channels::ChannelsConfig;
use self::logging::LoggingConfig;
use self::relay::RelayConfig;
use self::server::ServerConfig;

use crate::error::AppError;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Relay engine settings.
    #[serde(default)]
    pub relay: RelayConfig,
    /// Tags bound at start-up.
    #[serde(default)]
    pub channels: ChannelsConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from `config/default.toml`, `config/{env}.toml`
    /// and `WEBOBS__*` environment variables, in increasing precedence.
    pub fn load(env: &str) -> Result<Self, AppError> {
        Self::load_from(Path::new("config"), env)
    }

    /// Same as [`AppConfig::load`] with an explicit configuration directory.
    pub fn load_from(dir: &Path, env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::from(dir.join("default")).required(false))
            .add_source(config::File::from(dir.join(env)).required(false))
            .add_source(
                config::Environment::with_prefix("WEBOBS")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))
    }
}
